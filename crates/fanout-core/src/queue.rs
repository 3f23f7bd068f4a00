//! Work and failure channels shared by the worker pool.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use eyre::{eyre, Result};
use tokio::sync::{mpsc, Mutex, Semaphore};

use crate::copy_task::CopyTask;

/// Producer end of the work queue. Dropping or closing it ends the stream.
pub struct WorkQueueSender {
    tx: mpsc::Sender<CopyTask>,
    enqueued: AtomicUsize,
}

impl WorkQueueSender {
    pub async fn send(&self, task: CopyTask) -> Result<()> {
        self.tx
            .send(task)
            .await
            .map_err(|_| eyre!("work queue receiver dropped"))?;
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Signals "no more work". Returns the number of tasks enqueued.
    pub fn close(self) -> usize {
        self.enqueued.load(Ordering::Relaxed)
    }
}

/// Shared consumer end of the work queue; clones hand out tasks from the same
/// stream, each task to exactly one caller.
#[derive(Clone)]
pub struct WorkQueueReceiver {
    rx: Arc<Mutex<mpsc::Receiver<CopyTask>>>,
}

impl WorkQueueReceiver {
    /// Next pending task, or `None` once the sender is closed and the queue drained.
    pub async fn next(&self) -> Option<CopyTask> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

/// Capacity is clamped to what a tokio bounded channel can hold.
pub fn create_work_queue(capacity: usize) -> (WorkQueueSender, WorkQueueReceiver) {
    let (tx, rx) = mpsc::channel::<CopyTask>(capacity.clamp(1, Semaphore::MAX_PERMITS));
    (
        WorkQueueSender {
            tx,
            enqueued: AtomicUsize::new(0),
        },
        WorkQueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Returned when a failure is pushed after the queue was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureQueueClosed(pub String);

impl std::fmt::Display for FailureQueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failure queue closed; dropped report for {}", self.0)
    }
}

impl std::error::Error for FailureQueueClosed {}

/// Write side of the failure queue, closed explicitly exactly once.
#[derive(Debug)]
pub struct FailureQueue {
    tx: parking_lot::Mutex<Option<mpsc::UnboundedSender<String>>>,
}

pub struct FailureReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl FailureQueue {
    pub fn new() -> (Self, FailureReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: parking_lot::Mutex::new(Some(tx)),
            },
            FailureReceiver { rx },
        )
    }

    pub fn push(&self, destination: impl Into<String>) -> Result<(), FailureQueueClosed> {
        let destination = destination.into();
        match self.tx.lock().as_ref() {
            Some(tx) => tx.send(destination).map_err(|err| FailureQueueClosed(err.0)),
            None => Err(FailureQueueClosed(destination)),
        }
    }

    /// Closes the queue. Only the first call returns `true`.
    pub fn close(&self) -> bool {
        self.tx.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl FailureReceiver {
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Collects every report until the queue is closed.
    pub async fn drain(mut self) -> Vec<String> {
        let mut failed = Vec::new();
        while let Some(destination) = self.rx.recv().await {
            failed.push(destination);
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(dest: &str) -> CopyTask {
        CopyTask::new("b", "0-src", "b", dest)
    }

    #[tokio::test]
    async fn work_queue_preserves_order_and_ends_on_close() {
        let (tx, rx) = create_work_queue(4);
        tx.send(task("1")).await.unwrap();
        tx.send(task("2")).await.unwrap();
        assert_eq!(tx.close(), 2);

        assert_eq!(rx.next().await.unwrap().dest_object, "1");
        assert_eq!(rx.next().await.unwrap().dest_object, "2");
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn work_queue_accepts_any_capacity() {
        for capacity in [0, usize::MAX] {
            let (tx, rx) = create_work_queue(capacity);
            tx.send(task("only")).await.unwrap();
            assert_eq!(tx.close(), 1);
            assert_eq!(rx.next().await.unwrap().dest_object, "only");
            assert!(rx.next().await.is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cloned_receivers_split_tasks_without_duplicates() {
        let (tx, rx) = create_work_queue(8);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let rx = rx.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(t) = rx.next().await {
                    seen.push(t.dest_object);
                }
                seen
            }));
        }
        for i in 0..100 {
            tx.send(task(&i.to_string())).await.unwrap();
        }
        drop(tx);

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_by_key(|s| s.parse::<u32>().unwrap());
        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn failure_queue_closes_once() {
        let (queue, rx) = FailureQueue::new();
        queue.push("a").unwrap();
        queue.push("b").unwrap();
        assert!(!queue.is_closed());
        assert!(queue.close());
        assert!(!queue.close());
        assert!(queue.is_closed());

        let err = queue.push("late").unwrap_err();
        assert_eq!(err, FailureQueueClosed("late".to_string()));
        assert!(err.to_string().contains("late"));

        assert_eq!(rx.drain().await, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn failure_receiver_yields_none_after_close() {
        let (queue, mut rx) = FailureQueue::new();
        queue.push("x").unwrap();
        queue.close();
        assert_eq!(rx.recv().await.as_deref(), Some("x"));
        assert!(rx.recv().await.is_none());
    }
}
