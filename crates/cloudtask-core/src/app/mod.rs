//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **TaskSubmitter**: タスクの組み立てと投入
//! - **SubmitterBuilder**: 構築とワイヤリング（Fail-fast 検証）
//! - **callback**: 外部サービスからの呼び出しを受ける axum router

pub mod builder;
pub mod callback;
pub mod submitter;

pub use self::builder::{BuildError, SubmitterBuilder};
pub use self::callback::router as callback_router;
pub use self::submitter::{SubmitOptions, Submission, TaskSubmitter};
