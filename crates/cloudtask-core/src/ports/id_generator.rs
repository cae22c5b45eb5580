//! IdGenerator port - 重複排除用タスク名の生成
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::TaskName;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は重複しないタスク名を生成
///
/// # ULID の特性
/// - 時刻でソート可能
/// - 複数インスタンスで調整なしに生成可能
pub trait IdGenerator: Send + Sync {
    fn generate_task_name(&self) -> TaskName;
}

/// UlidGenerator は ULID ベースの名前生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// これにより、テスト時に FixedClock で timestamp 部分を固定できます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_name(&self) -> TaskName {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TaskName::from_ulid(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_names() {
        let id_gen = UlidGenerator::new(SystemClock);

        let n1 = id_gen.generate_task_name();
        let n2 = id_gen.generate_task_name();
        let n3 = id_gen.generate_task_name();

        assert_ne!(n1, n2);
        assert_ne!(n2, n3);
        assert_ne!(n1, n3);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let n1 = id_gen.generate_task_name();
        let n2 = id_gen.generate_task_name();

        // ランダム部分があるので名前は異なる
        assert_ne!(n1, n2);

        let decode = |name: &TaskName| {
            let raw = name.as_str().trim_start_matches("task-");
            Ulid::from_string(raw).unwrap().timestamp_ms()
        };
        assert_eq!(decode(&n1), fixed_time.timestamp_millis() as u64);
        assert_eq!(decode(&n2), fixed_time.timestamp_millis() as u64);
    }
}
