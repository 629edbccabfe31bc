//! Single-slot coalescing queue for remote pushes.
//!
//! Each mutation submits a full snapshot. While a push is in flight, further
//! submissions overwrite one pending slot instead of queueing behind it, so
//! the remote receives at most one push at a time and always the newest
//! snapshot. Callers whose snapshot was replaced get the outcome of the push
//! that superseded it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio_util::sync::CancellationToken;

use super::coordinator::SyncCoordinator;
use crate::error::{Result, SyncError};
use crate::types::Collection;

struct PendingPush {
    snapshot: Collection,
    waiters: Vec<oneshot::Sender<Result<()>>>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Option<PendingPush>>,
    wake: Notify,
    closed: AtomicBool,
    /// Set by the worker, under the slot lock, once it stops taking the slot.
    stopped: AtomicBool,
    submitted: AtomicU64,
    coalesced: AtomicU64,
    pushed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted: u64,
    /// Submissions that replaced a snapshot still waiting in the slot.
    pub coalesced: u64,
    pub pushed: u64,
}

/// Outcome of a save the caller may await, or drop.
#[must_use = "drop the PendingSave explicitly if the remote outcome is not needed"]
pub struct PendingSave {
    inner: PendingInner,
}

enum PendingInner {
    Ready(Result<()>),
    Waiting(oneshot::Receiver<Result<()>>),
}

impl PendingSave {
    pub(crate) fn ready(result: Result<()>) -> Self {
        Self {
            inner: PendingInner::Ready(result),
        }
    }

    /// Wait for the remote push covering this save.
    pub async fn wait(self) -> Result<()> {
        match self.inner {
            PendingInner::Ready(result) => result,
            PendingInner::Waiting(rx) => rx.await.unwrap_or(Err(SyncError::QueueClosed)),
        }
    }
}

#[derive(Clone)]
pub struct SaveQueue {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

pub fn create_save_queue(
    coordinator: Arc<SyncCoordinator>,
    cancel: CancellationToken,
) -> (SaveQueue, tokio::task::JoinHandle<()>) {
    let shared = Arc::new(Shared::default());

    let worker_shared = Arc::clone(&shared);
    let worker_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        process_saves(coordinator, worker_shared, worker_cancel).await;
    });

    (SaveQueue { shared, cancel }, handle)
}

impl SaveQueue {
    /// Queue `snapshot` for pushing, replacing any snapshot not yet started.
    pub async fn submit(&self, snapshot: Collection) -> PendingSave {
        if self.shared.closed.load(Ordering::SeqCst) || self.cancel.is_cancelled() {
            return PendingSave::ready(Err(SyncError::QueueClosed));
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut slot = self.shared.slot.lock().await;
            // Close or cancel may have landed while waiting for the lock.
            if self.shared.stopped.load(Ordering::SeqCst)
                || self.shared.closed.load(Ordering::SeqCst)
                || self.cancel.is_cancelled()
            {
                return PendingSave::ready(Err(SyncError::QueueClosed));
            }
            match slot.as_mut() {
                Some(pending) => {
                    pending.snapshot = snapshot;
                    pending.waiters.push(tx);
                    self.shared.coalesced.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    *slot = Some(PendingPush {
                        snapshot,
                        waiters: vec![tx],
                    });
                }
            }
        }
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.wake.notify_one();

        PendingSave {
            inner: PendingInner::Waiting(rx),
        }
    }

    /// Stop accepting snapshots. The worker pushes what is pending, then exits.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            coalesced: self.shared.coalesced.load(Ordering::Relaxed),
            pushed: self.shared.pushed.load(Ordering::Relaxed),
        }
    }
}

async fn process_saves(
    coordinator: Arc<SyncCoordinator>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    tracing::debug!("[QUEUE] save queue started");

    loop {
        let next = shared.slot.lock().await.take();
        if let Some(pending) = next {
            tracing::debug!(
                "[QUEUE] pushing snapshot of {} records for {} waiter(s)",
                pending.snapshot.len(),
                pending.waiters.len()
            );
            let result = coordinator
                .push_remote(&pending.snapshot, Some(&cancel))
                .await;
            shared.pushed.fetch_add(1, Ordering::Relaxed);
            for waiter in pending.waiters {
                // The caller may have dropped its PendingSave.
                let _ = waiter.send(result.clone());
            }
            continue;
        }

        if shared.closed.load(Ordering::SeqCst) || cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = shared.wake.notified() => {}
            _ = cancel.cancelled() => {}
        }
    }

    let mut slot = shared.slot.lock().await;
    shared.stopped.store(true, Ordering::SeqCst);
    if let Some(pending) = slot.take() {
        for waiter in pending.waiters {
            let _ = waiter.send(Err(SyncError::QueueClosed));
        }
    }
    drop(slot);
    tracing::debug!("[QUEUE] save queue stopped");
}
