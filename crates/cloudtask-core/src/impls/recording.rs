//! RecordingTaskService - 開発・テスト用の TaskService / QueueAdmin
//!
//! 外部サービスに送る代わりに TaskRequest を記録する。
//! キューイングや配送は一切行わない。
//!
//! # 使用例
//! ```ignore
//! let service = Arc::new(RecordingTaskService::new());
//! let submitter = TaskSubmitter::new(config, service.clone());
//! submitter.submit(SubmitOptions::new("/x/")).await?;
//! assert_eq!(service.requests().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{
    CreatedTask, QueueInfo, QueuePath, QueueState, SubmitError, TaskRequest,
};
use crate::ports::{QueueAdmin, TaskService};

#[derive(Default)]
pub struct RecordingTaskService {
    requests: Mutex<Vec<TaskRequest>>,
    /// 失敗したものも含めた create_task の呼び出し回数
    attempts: AtomicUsize,
    queues: Mutex<HashMap<String, QueueInfo>>,
    /// 設定されていれば create_task はこのエラーを返す（status, message）
    failure: Mutex<Option<(u16, String)>>,
}

impl RecordingTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の create_task を Api エラーで失敗させる
    pub fn fail_with(&self, status: u16, message: impl Into<String>) {
        *lock(&self.failure) = Some((status, message.into()));
    }

    /// 記録済みのリクエスト（投入順）
    pub fn requests(&self) -> Vec<TaskRequest> {
        lock(&self.requests).clone()
    }

    /// 受理されたリクエスト数
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// create_task が呼ばれた回数（失敗・重複も数える）
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // poison されても記録内容は読める
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl TaskService for RecordingTaskService {
    async fn create_task(&self, request: &TaskRequest) -> Result<CreatedTask, SubmitError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some((status, message)) = lock(&self.failure).clone() {
            return Err(SubmitError::Api { status, message });
        }

        let mut requests = lock(&self.requests);
        if let Some(resource) = request.resource_name() {
            let duplicate = requests
                .iter()
                .any(|r| r.resource_name().as_deref() == Some(resource.as_str()));
            if duplicate {
                return Err(SubmitError::AlreadyExists(resource));
            }
        }

        let name = request
            .resource_name()
            .unwrap_or_else(|| format!("{}/tasks/{}", request.queue, requests.len() + 1));
        requests.push(request.clone());

        Ok(CreatedTask {
            name,
            schedule_time: request.schedule_time,
            create_time: None,
            dispatch_count: 0,
            response_count: 0,
        })
    }
}

#[async_trait]
impl QueueAdmin for RecordingTaskService {
    async fn create_queue(&self, queue: &QueuePath) -> Result<QueueInfo, SubmitError> {
        let mut queues = lock(&self.queues);
        let key = queue.to_string();
        if queues.contains_key(&key) {
            return Err(SubmitError::AlreadyExists(key));
        }
        let info = QueueInfo {
            name: key.clone(),
            state: QueueState::Running,
            rate_limits: None,
            retry_config: None,
        };
        queues.insert(key, info.clone());
        Ok(info)
    }

    async fn get_queue(&self, queue: &QueuePath) -> Result<QueueInfo, SubmitError> {
        lock(&self.queues)
            .get(&queue.to_string())
            .cloned()
            .ok_or_else(|| SubmitError::Api {
                status: 404,
                message: format!("queue {queue} does not exist"),
            })
    }
}
