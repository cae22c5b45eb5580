//! Domain model (queue paths, task names, payloads, schedule times, requests).

pub mod errors;
pub mod method;
pub mod payload;
pub mod queue;
pub mod queue_path;
pub mod request;
pub mod schedule;
pub mod task_name;

pub use self::errors::{ErrorKind, SubmitError};
pub use self::method::HttpMethod;
pub use self::payload::{JsonMap, Payload};
pub use self::queue::{QueueInfo, QueueState, RateLimits, RetryConfig};
pub use self::queue_path::QueuePath;
pub use self::request::{AppEngineRouting, CreatedTask, TaskRequest};
pub use self::schedule::{ScheduleOffset, Timestamp};
pub use self::task_name::TaskName;
