//! TaskService port - managed task queue の「create task」
//!
//! キューイング・リトライ・バックオフ・レート制限・配送はすべて
//! 外部サービスの責務。この trait は 1 回の投入呼び出しだけを表す。

use async_trait::async_trait;

use crate::domain::{CreatedTask, SubmitError, TaskRequest};

#[async_trait]
pub trait TaskService: Send + Sync {
    /// タスクを 1 件作成し、サービスが受理したタスクを返す
    ///
    /// 失敗はリトライせずにそのまま返す。
    async fn create_task(&self, request: &TaskRequest) -> Result<CreatedTask, SubmitError>;
}
