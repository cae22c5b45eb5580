//! Callback endpoint - 外部サービスからの HTTP 呼び出しを受ける router
//!
//! 登録済みの path ごとに 1 route。body を payload 型にデコードして handler を実行する。
//!
//! - 成功: 200
//! - デコード失敗: 400
//! - handler 失敗: 500
//!
//! 非 2xx を返すとリトライ判断は外部サービスのポリシーに委ねられる。

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{MethodFilter, on};
use tracing::{info, warn};

use crate::domain::HttpMethod;
use crate::typed::{CallbackContext, CallbackError, CallbackRegistry, DynCallbackHandler};

pub const HEADER_QUEUE_NAME: &str = "x-cloudtasks-queuename";
pub const HEADER_TASK_NAME: &str = "x-cloudtasks-taskname";
pub const HEADER_RETRY_COUNT: &str = "x-cloudtasks-taskretrycount";
pub const HEADER_EXECUTION_COUNT: &str = "x-cloudtasks-taskexecutioncount";
pub const HEADER_ETA: &str = "x-cloudtasks-tasketa";

/// registry の全 handler を route にした Router を作る
pub fn router(registry: &CallbackRegistry) -> Router {
    let mut router = Router::new();
    for handler in registry.handlers() {
        let handler = Arc::clone(handler);
        let path = handler.path();
        let filter = method_filter(handler.method());
        router = router.route(
            path,
            on(filter, move |headers: HeaderMap, body: Bytes| {
                let handler = Arc::clone(&handler);
                async move { dispatch(handler, headers, body).await }
            }),
        );
    }
    router
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Head => MethodFilter::HEAD,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Options => MethodFilter::OPTIONS,
    }
}

async fn dispatch(
    handler: Arc<dyn DynCallbackHandler>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let ctx = context_from_headers(&headers);
    info!(
        path = handler.path(),
        queue = ctx.queue_name.as_deref().unwrap_or("-"),
        task = ctx.task_name.as_deref().unwrap_or("-"),
        retry_count = ctx.retry_count.unwrap_or(0),
        "task callback received"
    );

    match handler.handle_dyn(&body, ctx).await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(err @ CallbackError::Decode(_)) => {
            warn!(path = handler.path(), error = %err, "rejecting undecodable task body");
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err) => {
            warn!(path = handler.path(), error = %err, "task handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub fn context_from_headers(headers: &HeaderMap) -> CallbackContext {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let number = |name: &str| text(name).and_then(|v| v.trim().parse::<u32>().ok());

    CallbackContext {
        queue_name: text(HEADER_QUEUE_NAME),
        task_name: text(HEADER_TASK_NAME),
        retry_count: number(HEADER_RETRY_COUNT),
        execution_count: number(HEADER_EXECUTION_COUNT),
        eta: text(HEADER_ETA),
    }
}
