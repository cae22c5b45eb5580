//! cloudtask-core
//!
//! Managed task queue（Cloud Tasks）へ遅延実行タスクを投入するためのビルディングブロック。
//!
//! # モジュール構成
//! - **domain**: 値オブジェクト（QueuePath, TaskName, HttpMethod, Payload, Timestamp, TaskRequest, errors）
//! - **ports**: 外部への抽象化レイヤー（Clock, TaskService, QueueAdmin, IdGenerator）
//! - **impls**: ports の実装（CloudTasksClient, TokenSource, RecordingTaskService）
//! - **app**: TaskSubmitter, SubmitterBuilder, callback router
//! - **typed**: 型付き Task API（DeferredTask trait, CallbackHandler trait, CallbackRegistry）
//! - **config**: 明示的な設定（CloudTasksConfig）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{SubmitOptions, Submission, SubmitterBuilder, TaskSubmitter};
pub use config::{CloudTasksConfig, ConfigError, Environment, LocalMode};
pub use domain::{
    CreatedTask, HttpMethod, Payload, QueuePath, ScheduleOffset, SubmitError, TaskName,
    TaskRequest, Timestamp,
};
