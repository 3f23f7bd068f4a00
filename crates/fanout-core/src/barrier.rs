//! Countdown barrier signalled once by every worker on exit.
//!
//! The supervisor waits on it before closing the failure queue, so the close
//! always happens after the last worker has stopped writing.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::Notify;

#[derive(Debug)]
pub struct CompletionBarrier {
    outstanding: AtomicUsize,
    done: Notify,
}

impl CompletionBarrier {
    pub fn new(participants: usize) -> Self {
        Self {
            outstanding: AtomicUsize::new(participants),
            done: Notify::new(),
        }
    }

    /// Number of participants that have not arrived yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Records one arrival. Arrivals past zero are ignored.
    ///
    /// Returns `true` for the arrival that released the barrier.
    pub fn arrive(&self) -> bool {
        let prev = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| cur.checked_sub(1));
        match prev {
            Ok(1) => {
                self.done.notify_waiters();
                true
            }
            _ => false,
        }
    }

    /// Resolves once every participant has arrived.
    pub async fn wait(&self) {
        loop {
            let notified = self.done.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent final arrive is not missed
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Handle that arrives when dropped, including during a panic unwind.
    pub fn guard(self: &Arc<Self>) -> ArrivalGuard {
        ArrivalGuard {
            barrier: Arc::clone(self),
        }
    }
}

pub struct ArrivalGuard {
    barrier: Arc<CompletionBarrier>,
}

impl Drop for ArrivalGuard {
    fn drop(&mut self) {
        self.barrier.arrive();
    }
}
