//! TaskSubmitter - タスクの組み立てと投入
//!
//! 1. local 環境なら外部呼び出しをしない（LocalMode に従う）
//! 2. 設定から queue path を合成
//! 3. payload をエンコードし TaskRequest を組み立てる
//! 4. schedule offset があれば now + offset を seconds / nanos に分解
//! 5. TaskService::create_task を 1 回だけ呼ぶ
//! 6. 配送の完了は待たずに返る
//!
//! 投入の失敗はリトライせずに呼び出し元へ返す。

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{CloudTasksConfig, LocalMode};
use crate::domain::request::validate_target_path;
use crate::domain::{
    CreatedTask, HttpMethod, Payload, ScheduleOffset, SubmitError, TaskName, TaskRequest,
};
use crate::ports::{Clock, IdGenerator, SystemClock, TaskService, UlidGenerator};
use crate::typed::DeferredTask;

const CONTENT_TYPE: &str = "Content-Type";

/// submit に渡すパラメータ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitOptions {
    pub target_path: String,
    /// 設定の queue 以外に投入する場合のみ指定
    pub queue_name: Option<String>,
    pub http_method: HttpMethod,
    pub payload: Payload,
    pub schedule_offset: Option<ScheduleOffset>,
    pub name: Option<TaskName>,
    /// name が無いとき ULID ベースの名前を生成する
    pub unique_name: bool,
    pub headers: BTreeMap<String, String>,
}

impl SubmitOptions {
    pub fn new(target_path: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            ..Self::default()
        }
    }

    /// 型付き payload から作る（path と method は T に従う）
    pub fn for_task<T: DeferredTask>(task: &T) -> Result<Self, SubmitError> {
        Ok(Self {
            target_path: T::PATH.to_string(),
            http_method: T::METHOD,
            payload: Payload::json(task)?,
            ..Self::default()
        })
    }

    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.http_method = method;
        self
    }

    pub fn queue(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = Some(queue_name.into());
        self
    }

    pub fn delay(mut self, offset: ScheduleOffset) -> Self {
        self.schedule_offset = Some(offset);
        self
    }

    pub fn name(mut self, name: TaskName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn unique_name(mut self) -> Self {
        self.unique_name = true;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// submit の結果
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// 外部サービスが受理した
    Enqueued(CreatedTask),
    /// local 環境: 外部呼び出しはしていない。呼び出し側で実行できるよう組み立て済みの request を返す
    Local(TaskRequest),
}

impl Submission {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, Submission::Enqueued(_))
    }
}

pub struct TaskSubmitter {
    config: CloudTasksConfig,
    service: Arc<dyn TaskService>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskSubmitter {
    pub fn new(config: CloudTasksConfig, service: Arc<dyn TaskService>) -> Self {
        Self::with_clock(config, service, Arc::new(SystemClock))
    }

    /// Clock を差し替える（名前生成も同じ Clock を使う）
    pub fn with_clock(
        config: CloudTasksConfig,
        service: Arc<dyn TaskService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            service,
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        }
    }

    pub fn config(&self) -> &CloudTasksConfig {
        &self.config
    }

    /// 外部呼び出しをせずに TaskRequest を組み立てる
    pub fn build_request(&self, options: SubmitOptions) -> Result<TaskRequest, SubmitError> {
        validate_target_path(&options.target_path)?;

        let queue = match options.queue_name.as_deref() {
            Some(queue_name) => self.config.queue_path_for(queue_name)?,
            None => self.config.queue_path()?,
        };

        if !options.http_method.allows_body() && !options.payload.is_empty() {
            return Err(SubmitError::invalid(format!(
                "{} requests cannot carry a body",
                options.http_method
            )));
        }
        let body = options.payload.encode()?;

        let mut headers = options.headers;
        if let Some(content_type) = options.payload.content_type() {
            let overridden = headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE));
            if !overridden {
                headers.insert(CONTENT_TYPE.to_string(), content_type.to_string());
            }
        }

        let schedule_time = options
            .schedule_offset
            .map(|offset| offset.after(self.clock.now()))
            .transpose()?;

        let name = match (options.name, options.unique_name) {
            (Some(name), _) => Some(name),
            (None, true) => Some(self.ids.generate_task_name()),
            (None, false) => None,
        };

        Ok(TaskRequest {
            queue,
            target_path: options.target_path,
            http_method: options.http_method,
            body,
            headers,
            schedule_time,
            name,
            routing: self.config.routing.clone(),
        })
    }

    pub async fn submit(&self, options: SubmitOptions) -> Result<Submission, SubmitError> {
        if !self.config.is_managed() {
            return match self.config.local_mode {
                LocalMode::Reject => {
                    warn!(target_path = %options.target_path, "not running in managed cloud; task rejected");
                    Err(SubmitError::LocalExecutionUnsupported(options.target_path))
                }
                LocalMode::Defer => {
                    let request = self.build_request(options)?;
                    warn!(
                        target_path = %request.target_path,
                        "not running in managed cloud; task returned to caller instead of enqueued"
                    );
                    Ok(Submission::Local(request))
                }
            };
        }

        let request = self.build_request(options)?;
        debug!(
            queue = %request.queue,
            target_path = %request.target_path,
            method = %request.http_method,
            body_len = request.body.len(),
            scheduled = request.schedule_time.is_some(),
            "submitting task"
        );

        let created = self.service.create_task(&request).await?;
        info!(task = %created.name, target_path = %request.target_path, "task enqueued");
        Ok(Submission::Enqueued(created))
    }

    /// 型付き payload を T::PATH に投入
    pub async fn submit_typed<T: DeferredTask>(&self, task: &T) -> Result<Submission, SubmitError> {
        self.submit(SubmitOptions::for_task(task)?).await
    }
}
