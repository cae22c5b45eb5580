//! Cloud Tasks v2 REST の JSON 表現
//!
//! bytes フィールド（body）は base64、Timestamp は RFC 3339 文字列。

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AppEngineRouting, CreatedTask, HttpMethod, SubmitError, TaskRequest, Timestamp,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTaskBody<'a> {
    pub task: TaskResource<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskResource<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<String>,
    pub app_engine_http_request: AppEngineHttpRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppEngineHttpRequest<'a> {
    pub http_method: HttpMethod,
    pub relative_uri: &'a str,
    #[serde(skip_serializing_if = "no_headers")]
    pub headers: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_engine_routing: Option<&'a AppEngineRouting>,
}

fn no_headers(headers: &&BTreeMap<String, String>) -> bool {
    headers.is_empty()
}

impl<'a> CreateTaskBody<'a> {
    pub fn from_request(request: &'a TaskRequest) -> Result<Self, SubmitError> {
        let schedule_time = request
            .schedule_time
            .as_ref()
            .map(Timestamp::to_rfc3339)
            .transpose()?;
        let body = (!request.body.is_empty()).then(|| STANDARD.encode(&request.body));

        Ok(Self {
            task: TaskResource {
                name: request.resource_name(),
                schedule_time,
                app_engine_http_request: AppEngineHttpRequest {
                    http_method: request.http_method,
                    relative_uri: &request.target_path,
                    headers: &request.headers,
                    body,
                    app_engine_routing: request.routing.as_ref(),
                },
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskResponse {
    pub name: String,
    #[serde(default)]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub dispatch_count: u32,
    #[serde(default)]
    pub response_count: u32,
}

impl TaskResponse {
    pub fn into_created(self) -> Result<CreatedTask, SubmitError> {
        let parse = |value: Option<String>| {
            value
                .as_deref()
                .map(Timestamp::parse_rfc3339)
                .transpose()
        };
        Ok(CreatedTask {
            name: self.name,
            schedule_time: parse(self.schedule_time)?,
            create_time: parse(self.create_time)?,
            dispatch_count: self.dispatch_count,
            response_count: self.response_count,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateQueueBody {
    pub name: String,
}

/// Google API のエラー envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
