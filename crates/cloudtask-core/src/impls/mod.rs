//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **CloudTasksClient**: Cloud Tasks REST API（本番用）
//! - **TokenSource**: bearer token の取得（静的 token / metadata server）
//! - **RecordingTaskService**: 投入内容を記録するだけの開発・テスト用実装

pub mod cloud_tasks;
pub mod recording;
pub mod token;
mod wire;

pub use self::cloud_tasks::CloudTasksClient;
pub use self::recording::RecordingTaskService;
pub use self::token::{MetadataTokenProvider, TokenSource};
