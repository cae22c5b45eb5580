//! TaskName - 重複排除用のタスク名
//!
//! managed service は同じ名前のタスクを一定期間受け付けない。
//! 名前は `[A-Za-z0-9_-]{1,500}`。
//!
//! ULID から生成する場合は `task-` プレフィックスを付ける。
//! ULID は時刻でソート可能なので、生成順に並ぶ名前になる。

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::errors::SubmitError;

const MAX_LEN: usize = 500;
const ULID_PREFIX: &str = "task-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskName(String);

impl TaskName {
    pub fn new(value: impl Into<String>) -> Result<Self, SubmitError> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(format!("{ULID_PREFIX}{ulid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskName {
    type Error = SubmitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskName> for String {
    fn from(name: TaskName) -> Self {
        name.0
    }
}

fn validate(value: &str) -> Result<(), SubmitError> {
    if value.is_empty() || value.len() > MAX_LEN {
        return Err(SubmitError::invalid(format!(
            "task name must be 1..={MAX_LEN} characters, got {}",
            value.len()
        )));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(SubmitError::invalid(format!(
            "task name contains {bad:?}; allowed: letters, digits, '-', '_'"
        )));
    }
    Ok(())
}
