//! CallbackHandler trait - 外部サービスからの callback を処理する Handler
//!
//! - ジェネリック trait (CallbackHandler<T>)
//! - Object-safe trait (DynCallbackHandler)
//! - Type erasure (TypedCallback<T, H> → DynCallbackHandler)

use std::marker::PhantomData;

use async_trait::async_trait;
use thiserror::Error;

use super::task::DeferredTask;
use crate::domain::HttpMethod;

/// managed service が付与するリクエストヘッダ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackContext {
    pub queue_name: Option<String>,
    pub task_name: Option<String>,
    /// これまでのリトライ回数
    pub retry_count: Option<u32>,
    /// handler が実際に応答を返した回数
    pub execution_count: Option<u32>,
    /// 予定配送時刻（epoch 秒の文字列）
    pub eta: Option<String>,
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("failed to decode task body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("handler failed: {0}")]
    Failed(String),
}

impl CallbackError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// CallbackHandler は payload T を受け取って処理する
///
/// # 使用例
/// ```ignore
/// struct SendWelcomeMailHandler;
///
/// #[async_trait]
/// impl CallbackHandler<SendWelcomeMail> for SendWelcomeMailHandler {
///     async fn handle(&self, task: SendWelcomeMail, ctx: CallbackContext) -> Result<(), CallbackError> {
///         mailer.send(task.user_id).await.map_err(|e| CallbackError::failed(e.to_string()))
///     }
/// }
/// ```
///
/// Err を返すと endpoint は非 2xx を返し、リトライは外部サービスに任せる。
#[async_trait]
pub trait CallbackHandler<T: DeferredTask>: Send + Sync {
    async fn handle(&self, task: T, ctx: CallbackContext) -> Result<(), CallbackError>;
}

/// DynCallbackHandler は object-safe な CallbackHandler の抽象化
///
/// HashMap<String, Arc<dyn DynCallbackHandler>> に格納可能にします。
#[async_trait]
pub trait DynCallbackHandler: Send + Sync {
    async fn handle_dyn(&self, body: &[u8], ctx: CallbackContext) -> Result<(), CallbackError>;
    fn path(&self) -> &'static str;
    fn method(&self) -> HttpMethod;
}

pub struct TypedCallback<T: DeferredTask, H: CallbackHandler<T>> {
    handler: H,
    _marker: PhantomData<T>,
}

impl<T: DeferredTask, H: CallbackHandler<T>> TypedCallback<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: DeferredTask, H: CallbackHandler<T>> DynCallbackHandler for TypedCallback<T, H> {
    async fn handle_dyn(&self, body: &[u8], ctx: CallbackContext) -> Result<(), CallbackError> {
        // 空 body は null として扱う（unit struct / Option 用）
        let body: &[u8] = if body.is_empty() { b"null" } else { body };
        let task: T = serde_json::from_slice(body)?;
        self.handler.handle(task, ctx).await
    }

    fn path(&self) -> &'static str {
        T::PATH
    }

    fn method(&self) -> HttpMethod {
        T::METHOD
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Mutex;

    use super::*;
    use crate::typed::task::fixtures::{ReportTask, SecretTask};

    /// 受け取った payload を記録する
    #[derive(Default)]
    pub struct RecordingSecretHandler {
        pub seen: Mutex<Vec<(SecretTask, CallbackContext)>>,
    }

    #[async_trait]
    impl CallbackHandler<SecretTask> for RecordingSecretHandler {
        async fn handle(&self, task: SecretTask, ctx: CallbackContext) -> Result<(), CallbackError> {
            if task.a < 0 {
                return Err(CallbackError::failed("negative input"));
            }
            self.seen.lock().unwrap().push((task, ctx));
            Ok(())
        }
    }

    pub struct ReportHandler;

    #[async_trait]
    impl CallbackHandler<ReportTask> for ReportHandler {
        async fn handle(&self, _task: ReportTask, _ctx: CallbackContext) -> Result<(), CallbackError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::RecordingSecretHandler;
    use super::*;
    use crate::typed::task::fixtures::SecretTask;

    #[tokio::test]
    async fn typed_callback_decodes_body() {
        let typed = TypedCallback::<SecretTask, _>::new(RecordingSecretHandler::default());

        typed
            .handle_dyn(br#"{"a": 1}"#, CallbackContext::default())
            .await
            .unwrap();

        assert_eq!(typed.path(), "/secret_url/");
        assert_eq!(typed.method(), HttpMethod::Post);
        let seen = typed.handler.seen.lock().unwrap();
        assert_eq!(seen[0].0, SecretTask { a: 1 });
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let typed = TypedCallback::<SecretTask, _>::new(RecordingSecretHandler::default());
        let err = typed
            .handle_dyn(b"not json", CallbackContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::Decode(_)));
    }

    #[tokio::test]
    async fn handler_failure_is_propagated() {
        let typed = TypedCallback::<SecretTask, _>::new(RecordingSecretHandler::default());
        let err = typed
            .handle_dyn(br#"{"a": -1}"#, CallbackContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::Failed(ref m) if m == "negative input"));
    }
}
