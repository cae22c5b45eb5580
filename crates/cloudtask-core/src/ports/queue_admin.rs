//! QueueAdmin port - queue のプロビジョニング（運用者向け）

use async_trait::async_trait;

use crate::domain::{QueueInfo, QueuePath, SubmitError};

#[async_trait]
pub trait QueueAdmin: Send + Sync {
    /// queue を作成（既に存在する場合は AlreadyExists）
    async fn create_queue(&self, queue: &QueuePath) -> Result<QueueInfo, SubmitError>;

    async fn get_queue(&self, queue: &QueuePath) -> Result<QueueInfo, SubmitError>;
}
