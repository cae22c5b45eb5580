//! TaskRequest - 1 回の投入で作られる一時的な値オブジェクト
//!
//! 呼び出し時に作られ、外部サービスに渡した後は破棄される。
//! このプロセスはタスクの状態を一切保持しない。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::SubmitError;
use super::method::HttpMethod;
use super::queue_path::QueuePath;
use super::schedule::Timestamp;
use super::task_name::TaskName;

/// App Engine 上の配送先（未指定ならデフォルト service / version）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEngineRouting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRequest {
    pub queue: QueuePath,
    /// 後で外部サービスが呼び出す相対 URL
    pub target_path: String,
    pub http_method: HttpMethod,
    /// エンコード済みの body
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub schedule_time: Option<Timestamp>,
    pub name: Option<TaskName>,
    pub routing: Option<AppEngineRouting>,
}

impl TaskRequest {
    /// タスクの完全修飾名（name 指定時のみ）
    pub fn resource_name(&self) -> Option<String> {
        self.name.as_ref().map(|name| self.queue.task_path(name))
    }

    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// 外部サービスが返す作成済みタスク
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTask {
    /// 完全修飾名（`.../tasks/{id}`）
    pub name: String,
    pub schedule_time: Option<Timestamp>,
    pub create_time: Option<Timestamp>,
    pub dispatch_count: u32,
    pub response_count: u32,
}

/// target path は `/` 始まりの相対 URL のみ許可
pub fn validate_target_path(path: &str) -> Result<(), SubmitError> {
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(SubmitError::invalid(format!(
            "target path must be a relative URL starting with '/': {path:?}"
        )));
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(SubmitError::invalid(format!(
            "target path must not contain whitespace: {path:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/secret_url/")]
    #[case("/tasks/send?user=42")]
    #[case("/")]
    fn accepts_relative_paths(#[case] path: &str) {
        assert!(validate_target_path(path).is_ok());
    }

    #[rstest]
    #[case::absolute("https://example.com/x")]
    #[case::protocol_relative("//evil.example/x")]
    #[case::no_leading_slash("secret_url/")]
    #[case::whitespace("/a b")]
    #[case::empty("")]
    fn rejects_non_relative_paths(#[case] path: &str) {
        assert!(matches!(
            validate_target_path(path),
            Err(SubmitError::InvalidRequest(_))
        ));
    }

    #[test]
    fn resource_name_joins_queue_and_name() {
        let request = TaskRequest {
            queue: QueuePath::new("p", "l", "q").unwrap(),
            target_path: "/x/".into(),
            http_method: HttpMethod::Post,
            body: b"{}".to_vec(),
            headers: BTreeMap::new(),
            schedule_time: None,
            name: Some(TaskName::new("dedup-1").unwrap()),
            routing: None,
        };
        assert_eq!(
            request.resource_name().as_deref(),
            Some("projects/p/locations/l/queues/q/tasks/dedup-1")
        );
        assert_eq!(request.body_text(), Some("{}"));
    }
}
