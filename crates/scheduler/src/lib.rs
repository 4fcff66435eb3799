//! Two-level ready-task dispatcher (spec §4.2): a lock-protected outer
//! façade over per-device unsynchronized queues, plus the locality policy
//! used to pick an offload target in cluster mode.

mod device;
mod hint;
mod host_queue;
mod locality;
mod scheduler;

pub use device::DeviceKind;
pub use hint::HintKind;
pub use host_queue::{HostQueue, SchedulingPolicy};
pub use locality::{LocalityDecision, LocalityPolicy, DEFAULT_FIRST_TOUCH_DEFICIT_MULTIPLE};
pub use scheduler::{CpuId, Scheduler};
