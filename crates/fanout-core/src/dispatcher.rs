use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use eyre::Result;

use crate::barrier::CompletionBarrier;
use crate::copy_task::CopyTask;
use crate::queue::{create_work_queue, FailureQueue};
use crate::worker::{spawn_worker, WorkerParams, WorkerStats};
use crate::DispatchConfig;

/// One remote "copy object" call. Must be safe to invoke concurrently and to
/// repeat for the same task.
#[async_trait]
pub trait CopyOperation: Send + Sync {
    async fn copy(&self, task: &CopyTask) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct DispatchSummary {
    /// Tasks handed to the work queue.
    pub tasks: usize,
    /// Copy invocations across all workers, retries included.
    pub attempts: usize,
    /// Destinations whose every attempt failed, in no particular order.
    pub failed: Vec<String>,
    pub elapsed: Duration,
}

impl DispatchSummary {
    pub fn succeeded(&self) -> usize {
        self.tasks.saturating_sub(self.failed.len())
    }

    pub fn into_failures(self) -> Vec<String> {
        self.failed
    }
}

/// Runs every task through the worker pool and returns the failed destinations.
pub async fn run(
    tasks: impl IntoIterator<Item = CopyTask>,
    config: &DispatchConfig,
    op: Arc<dyn CopyOperation>,
) -> Vec<String> {
    execute(tasks, config, op).await.into_failures()
}

/// Like [`run`], but also reports attempt counts and timing.
///
/// Never fails as a whole: per-task errors end up, at worst, as one entry in
/// `failed`.
pub async fn execute(
    tasks: impl IntoIterator<Item = CopyTask>,
    config: &DispatchConfig,
    op: Arc<dyn CopyOperation>,
) -> DispatchSummary {
    let started = Instant::now();
    let tasks: Vec<CopyTask> = tasks.into_iter().collect();

    if tasks.is_empty() {
        log::debug!("no copy tasks to dispatch");
        return DispatchSummary {
            elapsed: started.elapsed(),
            ..DispatchSummary::default()
        };
    }

    let workers = config.workers.max(1);
    let max_attempts = config.max_attempts.max(1);
    // never more slots than tasks
    let capacity = config
        .queue_capacity
        .unwrap_or(tasks.len())
        .clamp(1, tasks.len());

    let (task_tx, task_rx) = create_work_queue(capacity);
    let (failures, failure_rx) = FailureQueue::new();
    let failures = Arc::new(failures);
    let barrier = Arc::new(CompletionBarrier::new(workers));
    let attempts = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(workers);
    for idx in 0..workers {
        let params = WorkerParams {
            idx,
            max_attempts,
            tasks: task_rx.clone(),
            failures: Arc::clone(&failures),
            op: Arc::clone(&op),
            attempts: Arc::clone(&attempts),
        };
        handles.push(spawn_worker(params, barrier.guard()));
    }
    drop(task_rx);

    let supervisor = {
        let barrier = Arc::clone(&barrier);
        let failures = Arc::clone(&failures);
        tokio::spawn(async move {
            barrier.wait().await;
            failures.close();
        })
    };

    let total = tasks.len();
    let mut stranded = Vec::new();
    let mut pending = tasks.into_iter();
    while let Some(task) = pending.next() {
        if let Err(err) = task_tx.send(task.clone()).await {
            // every worker is gone; whatever is left can no longer be attempted
            log::error!("{err}; reporting {} unsent task(s) as failed", 1 + pending.len());
            stranded.push(task.dest_object);
            stranded.extend(pending.by_ref().map(|t| t.dest_object));
            break;
        }
    }
    let enqueued = task_tx.close();

    let mut failed = failure_rx.drain().await;
    failed.extend(stranded);

    let mut totals = WorkerStats::default();
    for handle in handles {
        match handle.await {
            Ok(stats) => {
                totals.processed += stats.processed;
                totals.failed += stats.failed;
            }
            Err(err) => log::error!("copy worker aborted: {err}"),
        }
    }
    if let Err(err) = supervisor.await {
        log::error!("failure queue supervisor aborted: {err}");
    }

    let summary = DispatchSummary {
        tasks: total,
        attempts: attempts.load(Ordering::Relaxed),
        failed,
        elapsed: started.elapsed(),
    };

    log::info!(
        "dispatched {enqueued}/{total} task(s) across {workers} worker(s): {} copied, {} failed, {} attempt(s) in {:?}",
        summary.succeeded(),
        summary.failed.len(),
        summary.attempts,
        summary.elapsed
    );
    log::debug!(
        "workers processed {} task(s), {} exhausted their attempts",
        totals.processed,
        totals.failed
    );

    summary
}
