//! CallbackRegistry - callback handler の登録と管理
//!
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{CallbackHandler, DynCallbackHandler, TypedCallback};
use super::task::DeferredTask;
use crate::domain::request::validate_target_path;

/// CallbackRegistry は target path ごとに handler を 1 つ保持する
///
/// # 使用例
/// ```ignore
/// let mut registry = CallbackRegistry::new();
/// registry.register::<SendWelcomeMail, _>(SendWelcomeMailHandler)?;
///
/// let handler = registry.get("/tasks/send-welcome-mail/");
/// ```
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: HashMap<String, Arc<dyn DynCallbackHandler>>,
}

/// RegistryError は CallbackRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a handler for path '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("invalid callback path: {0}")]
    InvalidPath(String),
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: DeferredTask, H: CallbackHandler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let path = T::PATH.to_string();
        validate_target_path(&path).map_err(|e| RegistryError::InvalidPath(e.to_string()))?;
        validate_route(&path)?;
        if self.handlers.contains_key(&path) {
            return Err(RegistryError::AlreadyRegistered(path));
        }
        self.handlers
            .insert(path, Arc::new(TypedCallback::<T, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<Arc<dyn DynCallbackHandler>> {
        self.handlers.get(path).cloned()
    }

    /// 登録済みの path（ソート済み）
    pub fn registered_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.handlers.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn DynCallbackHandler>> {
        self.handlers.values()
    }
}

/// callback path は router にそのまま渡すので、パターン構文を含む path は拒否する
fn validate_route(path: &str) -> Result<(), RegistryError> {
    if let Some(bad) = path.chars().find(|c| matches!(c, '{' | '}' | '?' | '#')) {
        return Err(RegistryError::InvalidPath(format!(
            "{path:?} contains {bad:?}; callback paths are matched literally"
        )));
    }
    if path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(RegistryError::InvalidPath(format!(
            "{path:?} has a segment starting with ':' or '*'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpMethod;
    use rstest::rstest;
    use crate::typed::handler::fixtures::{RecordingSecretHandler, ReportHandler};
    use crate::typed::task::fixtures::{ReportTask, SecretTask};

    #[test]
    fn register_and_get() {
        let mut registry = CallbackRegistry::new();
        registry
            .register::<SecretTask, _>(RecordingSecretHandler::default())
            .unwrap();

        let handler = registry.get(SecretTask::PATH).expect("registered");
        assert_eq!(handler.path(), "/secret_url/");
        assert!(registry.get("/unknown/").is_none());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = CallbackRegistry::new();
        registry
            .register::<SecretTask, _>(RecordingSecretHandler::default())
            .unwrap();
        let result = registry.register::<SecretTask, _>(RecordingSecretHandler::default());
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn registered_paths_are_sorted() {
        let mut registry = CallbackRegistry::new();
        registry
            .register::<SecretTask, _>(RecordingSecretHandler::default())
            .unwrap();
        registry.register::<ReportTask, _>(ReportHandler).unwrap();

        assert_eq!(
            registry.registered_paths(),
            vec!["/secret_url/".to_string(), "/tasks/report/".to_string()]
        );
        let report = registry.get(ReportTask::PATH).unwrap();
        assert_eq!(report.method(), HttpMethod::Put);
    }

    #[rstest]
    #[case::colon_segment("/tasks/:id/")]
    #[case::wildcard_segment("/tasks/*rest")]
    #[case::brace_capture("/tasks/{id}/")]
    #[case::query("/tasks/x?y=1")]
    #[case::fragment("/tasks/x#top")]
    fn route_syntax_is_rejected(#[case] path: &str) {
        assert!(matches!(validate_route(path), Err(RegistryError::InvalidPath(_))));
    }

    #[rstest]
    #[case::plain("/secret_url/")]
    #[case::colon_inside_segment("/tasks/v1:run/")]
    fn literal_paths_are_accepted(#[case] path: &str) {
        assert!(validate_route(path).is_ok());
    }

    #[test]
    fn register_rejects_route_syntax() {
        #[allow(dead_code)]
        #[derive(serde::Serialize, serde::Deserialize)]
        struct ByIdTask {
            id: u64,
        }

        impl DeferredTask for ByIdTask {
            const PATH: &'static str = "/tasks/{id}/";
        }

        struct Noop;

        #[async_trait::async_trait]
        impl CallbackHandler<ByIdTask> for Noop {
            async fn handle(
                &self,
                _task: ByIdTask,
                _ctx: crate::typed::CallbackContext,
            ) -> Result<(), crate::typed::CallbackError> {
                Ok(())
            }
        }

        let mut registry = CallbackRegistry::new();
        let result = registry.register::<ByIdTask, _>(Noop);
        assert!(matches!(result, Err(RegistryError::InvalidPath(_))));
        assert!(registry.registered_paths().is_empty());
    }
}
