use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::DispatchApi;
use crate::config::DashboardConfig;
use crate::confirmation::ConfirmationLoop;
use crate::coordinator::ActionCoordinator;
use crate::error::{DispatchError, Result};
use crate::feed::{ConnectionState, FeedClient, FeedEvent};
use crate::model::{Driver, Vehicle};
use crate::store::SharedStore;

const FEED_CHANNEL_CAPACITY: usize = 32;

/// One dashboard session: the store, the action coordinator, and the
/// background tasks that keep the store in step with the backend.
pub struct Dashboard {
    config: DashboardConfig,
    store: SharedStore,
    api: Arc<dyn DispatchApi>,
    coordinator: ActionCoordinator,
    connection: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    loop_started: bool,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, api: Arc<dyn DispatchApi>) -> Self {
        let store = SharedStore::new();
        let coordinator = ActionCoordinator::new(store.clone(), api.clone());
        let (_, connection) = watch::channel(ConnectionState::Closed);

        Self {
            config,
            store,
            api,
            coordinator,
            connection,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            loop_started: false,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn coordinator(&self) -> &ActionCoordinator {
        &self.coordinator
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Initial authoritative load of drivers and vehicles.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error; the store keeps whatever loaded.
    pub async fn load_initial(&self) -> Result<()> {
        let drivers = self.api.fetch_drivers().await?;
        tracing::info!(count = drivers.len(), "Drivers loaded");
        self.store.set_drivers(drivers).await;

        let vehicles = self.api.fetch_vehicles().await?;
        tracing::info!(count = vehicles.len(), "Vehicles loaded");
        self.store.set_vehicles(vehicles).await;
        Ok(())
    }

    /// Start the websocket feed consumer and the confirmation loop.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlreadyStarted`] if background tasks are
    /// already running.
    pub fn start(&mut self) -> Result<()> {
        if self.loop_started {
            return Err(DispatchError::AlreadyStarted);
        }
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let client = FeedClient::new(self.config.feed_url.clone(), self.config.reconnect_delay());
        self.tasks.push(client.spawn(tx, self.cancel.child_token()));
        self.start_with_feed(rx)
    }

    /// Start the confirmation loop against an externally driven feed.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlreadyStarted`] if a confirmation loop is
    /// already running.
    pub fn start_with_feed(&mut self, feed_rx: mpsc::Receiver<FeedEvent>) -> Result<()> {
        if self.loop_started {
            return Err(DispatchError::AlreadyStarted);
        }
        let confirmation = ConfirmationLoop::new(
            self.store.clone(),
            self.api.clone(),
            self.config.confirm_debounce(),
        );
        self.connection = confirmation.connection_state();

        let cancel = self.cancel.child_token();
        self.tasks.push(tokio::spawn(async move {
            confirmation.run(feed_rx, cancel).await;
        }));
        self.loop_started = true;
        Ok(())
    }

    pub async fn effective_drivers(&self) -> Vec<Driver> {
        self.store.merged_drivers().await
    }

    pub async fn effective_vehicles(&self) -> Vec<Vehicle> {
        self.store.merged_vehicles().await
    }

    /// Stop polling and the feed, then drop any leftover patches.
    ///
    /// Requests already in flight are not cancelled; their handlers only
    /// touch the store and stay safe to run.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Dashboard task join error during shutdown");
            }
        }
        let dropped = self.store.clear_all_optimistic().await;
        tracing::info!(dropped, "Dashboard shut down");
    }
}
