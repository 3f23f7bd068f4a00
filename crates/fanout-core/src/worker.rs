//! Worker loop: drain the work queue, retry each copy, report exhausted tasks.

use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicUsize, Ordering::Relaxed},
    Arc,
};

use eyre::{eyre, Report};
use futures::FutureExt;
use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::barrier::ArrivalGuard;
use crate::copy_task::CopyTask;
use crate::dispatcher::CopyOperation;
use crate::queue::{FailureQueue, WorkQueueReceiver};

pub struct WorkerParams {
    pub idx: usize,
    pub max_attempts: u32,
    pub tasks: WorkQueueReceiver,
    pub failures: Arc<FailureQueue>,
    pub op: Arc<dyn CopyOperation>,
    /// Incremented once per copy invocation across the whole pool.
    pub attempts: Arc<AtomicUsize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: usize,
    pub failed: usize,
}

/// Spawns a worker that arrives at the completion barrier when it exits.
pub fn spawn_worker(params: WorkerParams, arrival: ArrivalGuard) -> JoinHandle<WorkerStats> {
    tokio::spawn(async move {
        let _arrival = arrival;
        worker_loop(params).await
    })
}

async fn worker_loop(params: WorkerParams) -> WorkerStats {
    let WorkerParams {
        idx,
        max_attempts,
        tasks,
        failures,
        op,
        attempts,
    } = params;

    let mut stats = WorkerStats::default();

    while let Some(task) = tasks.next().await {
        stats.processed += 1;

        if let Err(err) = copy_with_retry(idx, op.as_ref(), &task, max_attempts, &attempts).await {
            stats.failed += 1;
            warn!(
                "[w{idx}] giving up on {} after {max_attempts} attempt(s): {err}",
                task.destination()
            );
            if let Err(closed) = failures.push(task.destination()) {
                log::error!("[w{idx}] {closed}");
            }
        }
    }

    debug!(
        "[w{idx}] exiting after {} task(s), {} failed",
        stats.processed, stats.failed
    );
    stats
}

/// Attempts `task` up to `max_attempts` times, stopping on the first success.
///
/// No delay between attempts and every error is treated the same. A panic
/// inside the copy counts as a failed attempt.
async fn copy_with_retry(
    idx: usize,
    op: &dyn CopyOperation,
    task: &CopyTask,
    max_attempts: u32,
    attempts: &AtomicUsize,
) -> Result<(), Report> {
    let max_attempts = max_attempts.max(1);
    let mut last_error: Option<Report> = None;

    for attempt in 1..=max_attempts {
        attempts.fetch_add(1, Relaxed);
        let outcome = AssertUnwindSafe(op.copy(task))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(eyre!("copy operation panicked")));

        match outcome {
            Ok(()) => {
                if attempt > 1 {
                    debug!(
                        "[w{idx}] {} succeeded on attempt {attempt}/{max_attempts}",
                        task.destination()
                    );
                }
                return Ok(());
            }
            Err(err) => {
                debug!("[w{idx}] attempt {attempt}/{max_attempts} for {task} failed: {err}");
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| eyre!("no copy attempt was made")))
}
