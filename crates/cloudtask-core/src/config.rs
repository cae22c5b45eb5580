//! Explicit configuration for the submitter.
//!
//! Built once at startup and handed to [`crate::TaskSubmitter`]; nothing here
//! is read from process-wide state after construction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AppEngineRouting, QueuePath, SubmitError};

pub const ENV_PROJECT_ID: &str = "CLOUDTASK_PROJECT_ID";
pub const ENV_GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const ENV_LOCATION: &str = "CLOUDTASK_LOCATION";
pub const ENV_QUEUE: &str = "CLOUDTASK_QUEUE";
pub const ENV_ENVIRONMENT: &str = "CLOUDTASK_ENV";
pub const ENV_LOCAL_MODE: &str = "CLOUDTASK_LOCAL_MODE";
pub const ENV_API_URL: &str = "CLOUDTASK_API_URL";
pub const ENV_ACCESS_TOKEN: &str = "CLOUDTASK_ACCESS_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "CLOUDTASK_TIMEOUT_SECS";
pub const ENV_ROUTING_SERVICE: &str = "CLOUDTASK_ROUTING_SERVICE";
pub const ENV_ROUTING_VERSION: &str = "CLOUDTASK_ROUTING_VERSION";

pub const DEFAULT_API_BASE_URL: &str = "https://cloudtasks.googleapis.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingVar(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Where the application is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Running inside the managed cloud; tasks go to the real service.
    #[default]
    Managed,
    /// Anywhere else (laptop, CI). No task is ever sent to the service.
    Local,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "managed" | "cloud" | "gcp" => Ok(Environment::Managed),
            "local" | "dev" => Ok(Environment::Local),
            other => Err(ConfigError::InvalidValue {
                field: ENV_ENVIRONMENT.to_string(),
                message: format!("expected managed|local, got {other:?}"),
            }),
        }
    }
}

/// What `submit` does when [`Environment::Local`] is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalMode {
    /// Hand the built request back to the caller to run in-process.
    #[default]
    Defer,
    /// Fail with `SubmitError::LocalExecutionUnsupported`.
    Reject,
}

impl FromStr for LocalMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defer" => Ok(LocalMode::Defer),
            "reject" => Ok(LocalMode::Reject),
            other => Err(ConfigError::InvalidValue {
                field: ENV_LOCAL_MODE.to_string(),
                message: format!("expected defer|reject, got {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudTasksConfig {
    pub project_id: String,
    /// Queue region; independent of the region the app itself runs in.
    pub location: String,
    pub queue_name: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub local_mode: LocalMode,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Static bearer token. When absent the metadata server is asked.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub routing: Option<AppEngineRouting>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl CloudTasksConfig {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            queue_name: queue_name.into(),
            environment: Environment::Managed,
            local_mode: LocalMode::Defer,
            api_base_url: default_api_base_url(),
            access_token: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            routing: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_local_mode(mut self, local_mode: LocalMode) -> Self {
        self.local_mode = local_mode;
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`.
    ///
    /// Project, location and queue are required in the managed environment.
    /// A local deployment never talks to the service, so placeholders are
    /// used for whatever is missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get(ENV_ENVIRONMENT)
            .map(|v| v.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();
        let local_mode = get(ENV_LOCAL_MODE)
            .map(|v| v.parse::<LocalMode>())
            .transpose()?
            .unwrap_or_default();

        let required = |key: &str, fallback: Option<String>, placeholder: &str| {
            match (get(key).or(fallback), environment) {
                (Some(value), _) => Ok(value),
                (None, Environment::Local) => Ok(placeholder.to_string()),
                (None, Environment::Managed) => Err(ConfigError::MissingVar(key.to_string())),
            }
        };

        let project_id = required(ENV_PROJECT_ID, get(ENV_GOOGLE_CLOUD_PROJECT), "local-project")?;
        let location = required(ENV_LOCATION, None, "local")?;
        let queue_name = required(ENV_QUEUE, None, "default")?;

        let request_timeout_secs = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: ENV_TIMEOUT_SECS.to_string(),
                message: e.to_string(),
            })?,
            None => default_request_timeout(),
        };

        let service = get(ENV_ROUTING_SERVICE);
        let version = get(ENV_ROUTING_VERSION);
        let routing = (service.is_some() || version.is_some()).then(|| AppEngineRouting {
            service,
            version,
            instance: None,
        });

        let config = Self {
            project_id,
            location,
            queue_name,
            environment,
            local_mode,
            api_base_url: get(ENV_API_URL).unwrap_or_else(default_api_base_url),
            access_token: get(ENV_ACCESS_TOKEN),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs,
            routing,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.queue_path().map_err(|e| ConfigError::InvalidValue {
            field: "queue".to_string(),
            message: e.to_string(),
        })?;
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url".to_string(),
                message: format!("expected an http(s) URL, got {:?}", self.api_base_url),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_managed(&self) -> bool {
        self.environment == Environment::Managed
    }

    /// The configured queue.
    pub fn queue_path(&self) -> Result<QueuePath, SubmitError> {
        QueuePath::new(&self.project_id, &self.location, &self.queue_name)
    }

    /// Another queue in the configured project and location.
    pub fn queue_path_for(&self, queue_name: &str) -> Result<QueuePath, SubmitError> {
        QueuePath::new(&self.project_id, &self.location, queue_name)
    }
}
