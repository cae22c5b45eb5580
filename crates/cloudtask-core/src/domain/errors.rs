//! Errors - エラー型と分類
//!
//! 投入の失敗はリトライせずに呼び出し元へそのまま返す。
//! 呼び出し側が判断できるよう ErrorKind で運用分類を提供する。

use thiserror::Error;

/// ErrorKind は投入エラーの分類
///
/// - Transient: 一時的なエラー（呼び出し側でリトライ可能）
/// - Permanent: 恒久的なエラー（同じ入力でのリトライは無意味）
/// - Infrastructure: 認証・環境のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// SubmitError はタスク投入で発生するエラー
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid task request: {0}")]
    InvalidRequest(String),

    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Cloud Tasks API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("local execution is not supported (target {0})")]
    LocalExecutionUnsupported(String),
}

impl SubmitError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transient,
            Self::Api { status, .. } if *status == 429 || *status >= 500 => ErrorKind::Transient,
            Self::Auth(_) | Self::LocalExecutionUnsupported(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
