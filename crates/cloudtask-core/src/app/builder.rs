//! SubmitterBuilder - TaskSubmitter の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - build() 時に設定を検証
//! - expect_paths() で投入予定の target path を登録
//! - callback registry が渡されていれば「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す

use std::sync::Arc;

use tracing::debug;

use super::submitter::TaskSubmitter;
use crate::config::{CloudTasksConfig, ConfigError};
use crate::domain::SubmitError;
use crate::impls::{CloudTasksClient, RecordingTaskService};
use crate::ports::{Clock, SystemClock, TaskService};
use crate::typed::CallbackRegistry;

/// # 使用例
/// ```ignore
/// let submitter = SubmitterBuilder::new()
///     .config(CloudTasksConfig::from_env()?)
///     .registry(registry.clone())
///     .expect_paths(&["/secret_url/"])
///     .build()?;
/// ```
#[derive(Default)]
pub struct SubmitterBuilder {
    config: Option<CloudTasksConfig>,
    service: Option<Arc<dyn TaskService>>,
    clock: Option<Arc<dyn Clock>>,
    registry: Option<Arc<CallbackRegistry>>,
    expected_paths: Option<Vec<String>>,
}

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no configuration was supplied")]
    MissingConfig,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create Cloud Tasks client: {0}")]
    Client(#[from] SubmitError),

    #[error("Missing callback handlers for paths: {0:?}. These paths were expected but not registered.")]
    MissingHandlers(Vec<String>),
}

impl SubmitterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: CloudTasksConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// TaskService を差し替える（未指定なら環境に応じて自動選択）
    pub fn service(mut self, service: Arc<dyn TaskService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn registry(mut self, registry: Arc<CallbackRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 投入予定の target path を設定
    pub fn expect_paths(mut self, paths: &[&str]) -> Self {
        self.expected_paths = Some(paths.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<TaskSubmitter, BuildError> {
        let config = self.config.ok_or(BuildError::MissingConfig)?;
        config.validate()?;

        if let Some(expected) = &self.expected_paths {
            let registered = self
                .registry
                .as_ref()
                .map(|r| r.registered_paths())
                .unwrap_or_default();
            let missing: Vec<String> = expected
                .iter()
                .filter(|p| !registered.contains(p))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingHandlers(missing));
            }
        }

        let service: Arc<dyn TaskService> = match self.service {
            Some(service) => service,
            None if config.is_managed() => Arc::new(CloudTasksClient::new(&config)?),
            None => {
                debug!("local environment; using recording task service");
                Arc::new(RecordingTaskService::new())
            }
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(TaskSubmitter::with_clock(config, service, clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::typed::DeferredTask;
    use crate::typed::handler::fixtures::RecordingSecretHandler;
    use crate::typed::task::fixtures::{ReportTask, SecretTask};

    fn registry() -> Arc<CallbackRegistry> {
        let mut registry = CallbackRegistry::new();
        registry
            .register::<SecretTask, _>(RecordingSecretHandler::default())
            .unwrap();
        Arc::new(registry)
    }

    fn config() -> CloudTasksConfig {
        CloudTasksConfig::new("p", "us-central1", "default").with_access_token("t")
    }

    #[test]
    fn build_success() {
        let submitter = SubmitterBuilder::new()
            .config(config())
            .registry(registry())
            .expect_paths(&[SecretTask::PATH])
            .build();
        assert!(submitter.is_ok());
    }

    #[test]
    fn build_missing_handlers() {
        let result = SubmitterBuilder::new()
            .config(config())
            .registry(registry())
            .expect_paths(&[SecretTask::PATH, ReportTask::PATH])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingHandlers(missing)) if missing == vec![ReportTask::PATH.to_string()]
        ));
    }

    #[test]
    fn expected_paths_without_registry_are_all_missing() {
        let result = SubmitterBuilder::new()
            .config(config())
            .expect_paths(&[SecretTask::PATH])
            .build();
        assert!(matches!(result, Err(BuildError::MissingHandlers(m)) if m.len() == 1));
    }

    #[test]
    fn build_requires_config() {
        assert!(matches!(
            SubmitterBuilder::new().build(),
            Err(BuildError::MissingConfig)
        ));
    }

    #[test]
    fn build_validates_config() {
        let result = SubmitterBuilder::new()
            .config(CloudTasksConfig::new("p", "l", "bad_queue"))
            .build();
        assert!(matches!(result, Err(BuildError::Config(_))));
    }

    #[test]
    fn local_environment_needs_no_client() {
        let submitter = SubmitterBuilder::new()
            .config(config().with_environment(Environment::Local))
            .build()
            .unwrap();
        assert!(!submitter.config().is_managed());
    }
}
