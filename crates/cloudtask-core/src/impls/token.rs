//! TokenSource - bearer token の取得
//!
//! - Static: 設定で渡された token（`gcloud auth print-access-token` など）
//! - Metadata: managed 環境の metadata server から取得し、期限までキャッシュ

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::CloudTasksConfig;
use crate::domain::SubmitError;

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

// 期限切れ直前の token は使わない
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub enum TokenSource {
    Static(String),
    Metadata(MetadataTokenProvider),
}

impl TokenSource {
    pub fn from_config(config: &CloudTasksConfig) -> Self {
        match &config.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::Metadata(MetadataTokenProvider::new(METADATA_TOKEN_URL)),
        }
    }

    pub async fn bearer(&self, client: &Client) -> Result<String, SubmitError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata(provider) => provider.token(client).await,
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("TokenSource::Static(<redacted>)"),
            TokenSource::Metadata(provider) => f
                .debug_tuple("TokenSource::Metadata")
                .field(&provider.endpoint)
                .finish(),
        }
    }
}

pub struct MetadataTokenProvider {
    endpoint: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

impl MetadataTokenProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self, client: &Client) -> Result<String, SubmitError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        debug!(endpoint = %self.endpoint, "fetching access token from metadata server");
        let response = client
            .get(&self.endpoint)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SubmitError::Auth(format!("metadata server unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Auth(format!(
                "metadata server returned HTTP {status}"
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| SubmitError::Auth(format!("malformed token response: {e}")))?;

        let ttl = Duration::from_secs(token.expires_in).saturating_sub(REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(token.access_token)
    }
}
