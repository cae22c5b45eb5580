//! Cloud Tasks v2 REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::token::TokenSource;
use super::wire::{CreateQueueBody, CreateTaskBody, ErrorEnvelope, TaskResponse};
use crate::config::CloudTasksConfig;
use crate::domain::{CreatedTask, QueueInfo, QueuePath, SubmitError, TaskRequest};
use crate::ports::{QueueAdmin, TaskService};

/// Cloud Tasks API client.
pub struct CloudTasksClient {
    client: Client,
    base_url: String,
    tokens: TokenSource,
}

impl CloudTasksClient {
    /// Create a client from config; the token comes from the config or the
    /// metadata server.
    pub fn new(config: &CloudTasksConfig) -> Result<Self, SubmitError> {
        Self::with_token_source(config, TokenSource::from_config(config))
    }

    pub fn with_token_source(
        config: &CloudTasksConfig,
        tokens: TokenSource,
    ) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SubmitError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/v2/{}", self.base_url, resource)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SubmitError> {
        let token = self.tokens.bearer(&self.client).await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| SubmitError::Api {
            status: status.as_u16(),
            message: format!("failed to parse response: {e}"),
        })
    }
}

#[async_trait]
impl TaskService for CloudTasksClient {
    async fn create_task(&self, request: &TaskRequest) -> Result<CreatedTask, SubmitError> {
        let body = CreateTaskBody::from_request(request)?;
        let url = self.url(&format!("{}/tasks", request.queue));

        debug!(
            queue = %request.queue,
            target = %request.target_path,
            method = %request.http_method,
            "creating task"
        );

        let response: TaskResponse = self.send(self.client.post(&url).json(&body)).await?;
        let created = response.into_created()?;
        info!(task = %created.name, "task created");
        Ok(created)
    }
}

#[async_trait]
impl QueueAdmin for CloudTasksClient {
    async fn create_queue(&self, queue: &QueuePath) -> Result<QueueInfo, SubmitError> {
        let url = self.url(&format!("{}/queues", queue.location_path()));
        let body = CreateQueueBody {
            name: queue.to_string(),
        };
        debug!(queue = %queue, "creating queue");
        self.send(self.client.post(&url).json(&body)).await
    }

    async fn get_queue(&self, queue: &QueuePath) -> Result<QueueInfo, SubmitError> {
        let url = self.url(&queue.to_string());
        self.send(self.client.get(&url)).await
    }
}

fn error_from_response(status: StatusCode, body: &str) -> SubmitError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{code}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SubmitError::Auth(message),
        StatusCode::CONFLICT => SubmitError::AlreadyExists(message),
        _ => SubmitError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, TaskName, Timestamp};
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUEUE: &str = "projects/p/locations/us-central1/queues/default";

    fn client(server: &MockServer) -> CloudTasksClient {
        let config = CloudTasksConfig::new("p", "us-central1", "default")
            .with_api_base_url(server.uri())
            .with_access_token("test-token");
        CloudTasksClient::new(&config).unwrap()
    }

    fn request() -> TaskRequest {
        TaskRequest {
            queue: QueuePath::parse(QUEUE).unwrap(),
            target_path: "/secret_url/".into(),
            http_method: HttpMethod::Post,
            body: br#"{"a":1}"#.to_vec(),
            headers: BTreeMap::new(),
            schedule_time: None,
            name: None,
            routing: None,
        }
    }

    #[tokio::test]
    async fn create_task_posts_to_queue_tasks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v2/{QUEUE}/tasks")))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "task": {
                    "appEngineHttpRequest": {
                        "httpMethod": "POST",
                        "relativeUri": "/secret_url/",
                        "body": "eyJhIjoxfQ=="
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": format!("{QUEUE}/tasks/123"),
                "scheduleTime": "2024-01-01T12:00:05Z",
                "createTime": "2024-01-01T12:00:00Z",
                "dispatchCount": 0,
                "responseCount": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server).create_task(&request()).await.unwrap();
        assert_eq!(created.name, format!("{QUEUE}/tasks/123"));
        assert_eq!(
            created.schedule_time,
            Some(Timestamp {
                seconds: 1_704_110_405,
                nanos: 0
            })
        );
    }

    #[tokio::test]
    async fn duplicate_name_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {
                    "code": 409,
                    "message": "Requested entity already exists",
                    "status": "ALREADY_EXISTS"
                }
            })))
            .mount(&server)
            .await;

        let mut request = request();
        request.name = Some(TaskName::new("once").unwrap());
        let err = client(&server).create_task(&request).await.unwrap_err();
        assert!(
            matches!(err, SubmitError::AlreadyExists(ref m) if m.contains("ALREADY_EXISTS"))
        );
    }

    #[tokio::test]
    async fn server_errors_surface_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).create_task(&request()).await.unwrap_err();
        match err {
            SubmitError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "backend unavailable");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn permission_denied_is_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "The principal lacks cloudtasks.tasks.create" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).create_task(&request()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Auth(ref m) if m.contains("cloudtasks.tasks.create")));
    }

    #[tokio::test]
    async fn create_queue_posts_to_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/projects/p/locations/us-central1/queues"))
            .and(body_partial_json(json!({ "name": QUEUE })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": QUEUE,
                "state": "RUNNING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let queue = QueuePath::parse(QUEUE).unwrap();
        let info = client(&server).create_queue(&queue).await.unwrap();
        assert_eq!(info.name, QUEUE);
    }

    #[tokio::test]
    async fn get_queue_reads_queue_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v2/{QUEUE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": QUEUE,
                "state": "PAUSED",
                "retryConfig": { "maxAttempts": 5 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let queue = QueuePath::parse(QUEUE).unwrap();
        let info = client(&server).get_queue(&queue).await.unwrap();
        assert_eq!(info.state, crate::domain::QueueState::Paused);
        assert_eq!(info.retry_config.unwrap().max_attempts, Some(5));
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let config = CloudTasksConfig::new("p", "us-central1", "default")
            .with_api_base_url("http://127.0.0.1:9")
            .with_access_token("t");
        let err = CloudTasksClient::new(&config)
            .unwrap()
            .create_task(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
        assert!(err.is_retryable());
    }
}
