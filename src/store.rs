use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::snapshot::CollectionExport;
use crate::sync::{create_save_queue, LoadSource, PendingSave, SaveQueue, SyncCoordinator};
use crate::types::{CardVariant, Collection, CollectionStats};

/// In-memory working copy of the collection.
///
/// Mutations apply immediately and are never rolled back. Each one writes
/// the local cache before returning and hands the snapshot to the save
/// queue; the returned [`PendingSave`] resolves once the remote push covering
/// it finishes.
pub struct CollectionStore {
    collection: RwLock<Collection>,
    coordinator: Arc<SyncCoordinator>,
    saves: SaveQueue,
    worker: Mutex<Option<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl CollectionStore {
    /// Must be called within a tokio runtime: spawns the save queue worker.
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Arc<Self> {
        Self::with_cancel(coordinator, CancellationToken::new())
    }

    /// Store whose pending and in-flight pushes are abandoned when `cancel`
    /// fires.
    pub fn with_cancel(coordinator: Arc<SyncCoordinator>, cancel: CancellationToken) -> Arc<Self> {
        let (saves, worker) = create_save_queue(Arc::clone(&coordinator), cancel);
        Arc::new(Self {
            collection: RwLock::new(Collection::new()),
            coordinator,
            saves,
            worker: Mutex::new(Some(worker)),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn save_queue(&self) -> &SaveQueue {
        &self.saves
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Replace the working copy with whatever the coordinator loads.
    pub async fn initialize(&self) -> LoadSource {
        let outcome = self.coordinator.load_detailed().await;
        let mut collection = self.collection.write().await;
        *collection = outcome.collection;
        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!(
            "[STORE] initialized with {} records ({:?})",
            collection.len(),
            outcome.source
        );
        outcome.source
    }

    pub async fn get_quantity(&self, item_id: &str, is_foil: bool) -> u32 {
        self.collection
            .read()
            .await
            .quantity(item_id, CardVariant::from_foil(is_foil))
    }

    pub async fn add_card(&self, item_id: &str, is_foil: bool) -> PendingSave {
        let mut collection = self.collection.write().await;
        let count = collection.increment(item_id, CardVariant::from_foil(is_foil));
        tracing::debug!("[STORE] add {} foil={} -> {}", item_id, is_foil, count);
        self.persist(&collection).await
    }

    pub async fn remove_card(&self, item_id: &str, is_foil: bool) -> PendingSave {
        let mut collection = self.collection.write().await;
        match collection.decrement(item_id, CardVariant::from_foil(is_foil)) {
            Some(count) => {
                tracing::debug!("[STORE] remove {} foil={} -> {}", item_id, is_foil, count);
                self.persist(&collection).await
            }
            None => PendingSave::ready(Ok(())),
        }
    }

    /// Called with the write lock held so cache writes land in mutation order.
    async fn persist(&self, collection: &Collection) -> PendingSave {
        let snapshot = collection.clone();
        self.coordinator.write_local(&snapshot).await;
        self.saves.submit(snapshot).await
    }

    pub async fn snapshot(&self) -> Collection {
        self.collection.read().await.clone()
    }

    pub async fn stats(&self) -> CollectionStats {
        self.collection.read().await.stats()
    }

    pub async fn export_json(&self) -> Result<String> {
        CollectionExport::new(self.snapshot().await).to_json_pretty()
    }

    /// Replace the whole collection with an exported one and persist it.
    /// An invalid document leaves the current collection untouched.
    pub async fn import_json(&self, data: &str) -> Result<PendingSave> {
        let export = CollectionExport::parse(data)?;
        let mut collection = self.collection.write().await;
        *collection = export.collection;
        tracing::info!(
            "[STORE] imported {} records (export from {})",
            collection.len(),
            export.export_date
        );
        Ok(self.persist(&collection).await)
    }

    /// Flush the pending push and stop the save queue worker.
    pub async fn shutdown(&self) {
        self.saves.close();
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                tracing::error!("[STORE] save queue worker failed: {}", e);
            }
        }
    }
}
