//! Retires optimistic patches once authoritative data agrees with them.
//!
//! Two triggers feed the same check:
//!
//! - every feed snapshot records vehicle positions and then pulls the
//!   authoritative driver list;
//! - a debounce timer, armed whenever the patch map changes while non-empty,
//!   forces a driver fetch once per batch of new patches.
//!
//! The check compares each patched field against the fetched driver row and
//! is idempotent, so running it redundantly or out of order is harmless.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::DispatchApi;
use crate::feed::{ConnectionState, FeedEvent};
use crate::model::{Confirmation, Driver, PatchMap, Vehicle};
use crate::store::SharedStore;

/// Build confirmation records for every patch the driver rows fully agree
/// with. Patches with any disagreeing field produce nothing.
pub fn compute_confirmations(drivers: &[Driver], optimistic: &PatchMap) -> Vec<Confirmation> {
    drivers
        .iter()
        .filter_map(|driver| {
            let patch = optimistic.get(&driver.id)?;

            if let Some(job) = &patch.job {
                if !job.matches(driver.current_job.as_deref()) {
                    return None;
                }
            }
            if let Some(status) = patch.status {
                if driver.status != status {
                    return None;
                }
            }

            Some(Confirmation {
                driver_id: driver.id.clone(),
                job: patch.job.clone(),
                status: patch.status,
            })
        })
        .collect()
}

pub struct ConfirmationLoop {
    store: SharedStore,
    api: Arc<dyn DispatchApi>,
    debounce: Duration,
    connection: watch::Sender<ConnectionState>,
}

impl ConfirmationLoop {
    pub fn new(store: SharedStore, api: Arc<dyn DispatchApi>, debounce: Duration) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Connecting);
        Self {
            store,
            api,
            debounce,
            connection,
        }
    }

    /// Feed connection state as last reported by the consumer.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Handle one feed snapshot. Returns the number of patches retired.
    pub async fn handle_snapshot(&self, vehicles: Vec<Vehicle>) -> usize {
        let applied = self.store.apply_feed_vehicles(vehicles).await;
        if !applied {
            tracing::debug!("Optimistic updates in flight, feed vehicles not applied");
        }
        self.refresh_and_confirm().await
    }

    /// Fetch authoritative drivers, store them, and retire agreeing patches.
    /// Fetch failures are logged and leave the store untouched.
    pub async fn refresh_and_confirm(&self) -> usize {
        let drivers = match self.api.fetch_drivers().await {
            Ok(drivers) => drivers,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch drivers for confirmation");
                return 0;
            }
        };

        self.store.set_drivers(drivers.clone()).await;
        if drivers.is_empty() {
            return 0;
        }

        let confirmations = compute_confirmations(&drivers, &self.store.optimistic().await);
        if confirmations.is_empty() {
            return 0;
        }
        let removed = self.store.clear_confirmed_optimistic(&confirmations).await;
        if removed > 0 {
            tracing::info!(removed, "Optimistic updates confirmed by backend");
        }
        removed
    }

    /// Debounce-driven check. Same as [`refresh_and_confirm`], plus a vehicle
    /// fetch once the patch map drains, so the merged view moves to
    /// confirmed rows even while the feed is silent.
    ///
    /// [`refresh_and_confirm`]: ConfirmationLoop::refresh_and_confirm
    pub async fn confirm_pending(&self) -> usize {
        let removed = self.refresh_and_confirm().await;
        if removed == 0 || self.store.has_pending().await {
            return removed;
        }

        match self.api.fetch_vehicles().await {
            Ok(vehicles) => {
                if !self.store.apply_feed_vehicles(vehicles).await {
                    tracing::debug!("New optimistic updates arrived, vehicle refresh deferred");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to refresh vehicles after confirmation"),
        }
        removed
    }

    fn set_connection_state(&self, state: ConnectionState) {
        let previous = self.connection.send_replace(state);
        if previous != state {
            tracing::info!(from = %previous, to = %state, "Feed connection state changed");
        }
    }

    /// Drive both triggers until `cancel` fires.
    ///
    /// The loop keeps running after the feed channel closes so the debounce
    /// poll still confirms patches.
    pub async fn run(self, mut feed_rx: mpsc::Receiver<FeedEvent>, cancel: CancellationToken) {
        let mut revisions = self.store.subscribe();
        let mut seen_patches = revisions.borrow_and_update().patches;
        let mut deadline: Option<Instant> = if self.store.has_pending().await {
            Some(Instant::now() + self.debounce)
        } else {
            None
        };
        let mut feed_open = true;

        loop {
            let armed = deadline;
            let debounce = async move {
                match armed {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,

                event = feed_rx.recv(), if feed_open => match event {
                    Some(FeedEvent::State(state)) => self.set_connection_state(state),
                    Some(FeedEvent::Snapshot(vehicles)) => {
                        self.handle_snapshot(vehicles).await;
                    }
                    None => {
                        tracing::debug!("Feed channel closed");
                        feed_open = false;
                    }
                },

                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let revision = *revisions.borrow_and_update();
                    if revision.patches != seen_patches {
                        seen_patches = revision.patches;
                        deadline = if self.store.has_pending().await {
                            Some(Instant::now() + self.debounce)
                        } else {
                            None
                        };
                    }
                }

                _ = debounce => {
                    deadline = None;
                    tracing::debug!("Forcing driver refresh for pending optimistic updates");
                    self.confirm_pending().await;
                }
            }
        }

        tracing::info!("Confirmation loop stopped");
    }
}
