pub mod barrier;
pub mod config;
pub mod copy_task;
pub mod dispatcher;
pub mod errors;
pub mod queue;
pub mod store;
pub mod worker;

use eyre::{bail, Result};

pub use copy_task::{build_name, fan_out_tasks, CopyTask};
pub use dispatcher::{execute, run, CopyOperation, DispatchSummary};
pub use store::BucketStore;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_COPIES: usize = 1000;
/// Largest explicit work queue capacity accepted by [`DispatchConfig::validate`].
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub workers: usize,
    /// Copy attempts per task, first try included.
    pub max_attempts: u32,
    /// Work queue capacity; `None` buffers the whole batch.
    pub queue_capacity: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            queue_capacity: None,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("worker count must be at least 1");
        }
        if self.max_attempts == 0 {
            bail!("max attempts must be at least 1");
        }
        match self.queue_capacity {
            Some(0) => bail!("queue capacity must be at least 1"),
            Some(cap) if cap > MAX_QUEUE_CAPACITY => {
                bail!("queue capacity {cap} exceeds the limit of {MAX_QUEUE_CAPACITY}")
            }
            _ => {}
        }
        Ok(())
    }
}
