//! Ports - 抽象化レイヤー
//!
//! 外部システム（managed task queue, 時刻, ID 生成）へのインターフェース。
//! TaskSubmitter はこれらの trait にのみ依存する。

pub mod clock;
pub mod id_generator;
pub mod queue_admin;
pub mod task_service;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_admin::QueueAdmin;
pub use self::task_service::TaskService;
