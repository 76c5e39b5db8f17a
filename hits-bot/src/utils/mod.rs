//! Utility modules

pub mod keyed_lock;
pub mod pool_monitor;
pub mod retry;

pub use keyed_lock::KeyedLocks;
pub use pool_monitor::{begin_monitored, MonitoredTransaction};
pub use retry::{retry_idempotent, Backoff};
