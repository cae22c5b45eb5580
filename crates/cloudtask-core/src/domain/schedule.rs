//! Schedule offset と絶対時刻（seconds + nanos）
//!
//! 「now + offset 以降に配送」を表す。offset は非負の秒数のみ許可する。

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::errors::SubmitError;

/// 投入時刻からの遅延
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScheduleOffset(Duration);

impl ScheduleOffset {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// 小数秒から作る。負数・NaN・無限大は InvalidRequest
    pub fn from_secs_f64(secs: f64) -> Result<Self, SubmitError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(SubmitError::invalid(format!(
                "schedule offset must be a non-negative number of seconds, got {secs}"
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|e| SubmitError::invalid(format!("schedule offset out of range: {e}")))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// now + offset を Timestamp に変換
    pub fn after(&self, now: DateTime<Utc>) -> Result<Timestamp, SubmitError> {
        let delta = chrono::Duration::from_std(self.0)
            .map_err(|e| SubmitError::invalid(format!("schedule offset out of range: {e}")))?;
        let at = now
            .checked_add_signed(delta)
            .ok_or_else(|| SubmitError::invalid("schedule time overflows the calendar"))?;
        Ok(Timestamp::from_datetime(at))
    }
}

impl From<Duration> for ScheduleOffset {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

/// Unix epoch からの seconds と nanosecond の余り
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanos: at.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    /// REST API が受け付ける RFC 3339 表記（例: `2024-01-01T12:00:05.250Z`）
    pub fn to_rfc3339(&self) -> Result<String, SubmitError> {
        self.to_datetime()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            .ok_or_else(|| SubmitError::invalid(format!("timestamp out of range: {self:?}")))
    }

    pub fn parse_rfc3339(value: &str) -> Result<Self, SubmitError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| SubmitError::invalid(format!("bad timestamp {value:?}: {e}")))
    }
}
