use std::sync::Arc;

use tokio::sync::{watch, RwLock, RwLockReadGuard};

use crate::model::{Confirmation, Driver, OptimisticPatch, PatchMap, Vehicle};
use crate::store::ReconciliationStore;

/// Change counters published to subscribers after every mutation.
///
/// `patches` only moves when the optimistic map changes, so a watcher can
/// react to new actions without waking on every position update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreRevision {
    pub data: u64,
    pub patches: u64,
}

/// Cloneable handle to the process-wide store.
///
/// All writers go through the named operations below; each one runs under
/// a single write lock, so readers never observe a half-applied merge.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<ReconciliationStore>>,
    revision: Arc<watch::Sender<StoreRevision>>,
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(StoreRevision::default());
        Self {
            inner: Arc::new(RwLock::new(ReconciliationStore::new())),
            revision: Arc::new(revision),
        }
    }

    /// Subscribe to store changes.
    pub fn subscribe(&self) -> watch::Receiver<StoreRevision> {
        self.revision.subscribe()
    }

    /// Read access for callers that need several fields consistently.
    pub async fn read(&self) -> RwLockReadGuard<'_, ReconciliationStore> {
        self.inner.read().await
    }

    pub async fn snapshot(&self) -> ReconciliationStore {
        self.inner.read().await.clone()
    }

    pub async fn has_pending(&self) -> bool {
        self.inner.read().await.has_pending()
    }

    pub async fn optimistic(&self) -> PatchMap {
        self.inner.read().await.optimistic().clone()
    }

    pub async fn patch(&self, driver_id: &str) -> Option<OptimisticPatch> {
        self.inner.read().await.patch(driver_id).cloned()
    }

    pub async fn merged_drivers(&self) -> Vec<Driver> {
        self.inner.read().await.merged_drivers()
    }

    pub async fn merged_vehicles(&self) -> Vec<Vehicle> {
        self.inner.read().await.merged_vehicles()
    }

    pub async fn set_drivers(&self, drivers: Vec<Driver>) {
        self.inner.write().await.set_drivers(drivers);
        self.bump(false);
    }

    pub async fn set_vehicles(&self, vehicles: Vec<Vehicle>) {
        self.inner.write().await.set_vehicles(vehicles);
        self.bump(false);
    }

    pub async fn apply_feed_vehicles(&self, vehicles: Vec<Vehicle>) -> bool {
        let applied = self.inner.write().await.apply_feed_vehicles(vehicles);
        self.bump(false);
        applied
    }

    pub async fn set_optimistic(&self, driver_id: &str, update: OptimisticPatch) {
        self.inner.write().await.set_optimistic(driver_id, update);
        self.bump(true);
    }

    pub async fn clear_optimistic(&self, driver_id: &str) -> bool {
        let removed = self.inner.write().await.clear_optimistic(driver_id);
        if removed {
            self.bump(true);
        }
        removed
    }

    pub async fn clear_all_optimistic(&self) -> usize {
        let removed = self.inner.write().await.clear_all_optimistic();
        if removed > 0 {
            self.bump(true);
        }
        removed
    }

    pub async fn clear_confirmed_optimistic(&self, confirmations: &[Confirmation]) -> usize {
        let removed = self
            .inner
            .write()
            .await
            .clear_confirmed_optimistic(confirmations);
        if removed > 0 {
            tracing::debug!(removed, "Confirmed optimistic patches retired");
            self.bump(true);
        }
        removed
    }

    fn bump(&self, patches_changed: bool) {
        self.revision.send_modify(|rev| {
            rev.data += 1;
            if patches_changed {
                rev.patches += 1;
            }
        });
    }
}
