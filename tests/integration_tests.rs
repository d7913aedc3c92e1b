//! End-to-end tests against the reference backend.
//!
//! Each test binds the REST API and the position feed on ephemeral ports,
//! points a dashboard at them, and drives actions through the real HTTP and
//! websocket clients.

mod test_harness;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fleet_dispatch::api::{DispatchApi, HttpDispatchApi};
use fleet_dispatch::backend::{Backend, SharedBackend};
use fleet_dispatch::config::{BackendConfig, DashboardConfig};
use fleet_dispatch::dashboard::Dashboard;
use fleet_dispatch::error::DispatchError;
use fleet_dispatch::feed::ConnectionState;
use fleet_dispatch::model::DriverStatus;
use test_harness::assert_eventually;

struct TestBackend {
    config: DashboardConfig,
    state: SharedBackend,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestBackend {
    async fn start(feed_interval_ms: u64) -> Self {
        let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = BackendConfig::new(any, any).with_feed_interval_ms(feed_interval_ms);
        let backend = Backend::bind(config).await.unwrap();

        let rest = backend.rest_addr().unwrap();
        let feed = backend.feed_addr().unwrap();
        let state = backend.state();
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { backend.run(cancel).await.unwrap() })
        };

        let config = DashboardConfig::new(format!("http://{rest}"), format!("ws://{feed}"))
            .with_confirm_debounce_ms(100)
            .with_reconnect_delay_ms(50);

        Self {
            config,
            state,
            cancel,
            handle,
        }
    }

    fn api(&self) -> Arc<HttpDispatchApi> {
        Arc::new(HttpDispatchApi::new(&self.config).unwrap())
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("backend stops within timeout")
            .unwrap();
    }
}

/// Test 1: The HTTP client reads and writes through the REST API
#[tokio::test]
async fn test_http_client_round_trip() {
    let backend = TestBackend::start(1000).await;
    let api = backend.api();

    let drivers = api.fetch_drivers().await.unwrap();
    assert_eq!(drivers.len(), 3);
    assert_eq!(api.fetch_vehicles().await.unwrap().len(), 3);
    assert_eq!(api.fetch_jobs().await.unwrap().len(), 2);

    api.assign_job("3", "Pickup").await.unwrap();
    let drivers = api.fetch_drivers().await.unwrap();
    assert_eq!(drivers[2].current_job.as_deref(), Some("Pickup"));
    assert_eq!(drivers[2].status, DriverStatus::Active);

    let err = api.pause_driver("99").await.unwrap_err();
    assert!(matches!(err, DispatchError::DriverNotFound(id) if id == "99"));

    backend.shutdown().await;
}

/// Test 2: The dashboard loads, connects to the feed, and confirms an assignment
#[tokio::test]
async fn test_dashboard_confirms_assignment() {
    let backend = TestBackend::start(100).await;
    let mut dashboard = Dashboard::new(backend.config.clone(), backend.api());
    dashboard.load_initial().await.unwrap();
    dashboard.start().unwrap();

    assert_eventually(
        || async { dashboard.connection_state() == ConnectionState::Open },
        Duration::from_secs(5),
        "Feed should connect",
    )
    .await;

    assert!(dashboard.coordinator().assign_job("3", "Pickup").await);

    let drivers = dashboard.effective_drivers().await;
    assert_eq!(drivers[2].current_job.as_deref(), Some("Pickup"));

    assert_eventually(
        || async { !dashboard.store().has_pending().await },
        Duration::from_secs(5),
        "Assignment should be confirmed by the backend",
    )
    .await;

    // Confirmed view matches the backend without the patch
    let drivers = dashboard.effective_drivers().await;
    assert_eq!(drivers[2].current_job.as_deref(), Some("Pickup"));
    assert_eq!(drivers[2].status, DriverStatus::Active);
    assert_eq!(
        backend.state.read().await.drivers()[2].current_job.as_deref(),
        Some("Pickup")
    );

    dashboard.shutdown().await;
    backend.shutdown().await;
}

/// Test 3: An action for an unknown driver is rolled back
#[tokio::test]
async fn test_dashboard_rolls_back_unknown_driver() {
    let backend = TestBackend::start(1000).await;
    let dashboard = Dashboard::new(backend.config.clone(), backend.api());
    dashboard.load_initial().await.unwrap();
    let mut notifications = dashboard.coordinator().subscribe_notifications();

    assert!(!dashboard.coordinator().complete_job("99").await);
    assert!(!dashboard.store().has_pending().await);

    let note = notifications.recv().await.unwrap();
    assert_eq!(note.message, "Failed to complete job. Please try again.");

    dashboard.shutdown().await;
    backend.shutdown().await;
}

/// Test 4: Feed updates reach the dashboard's vehicle view
#[tokio::test]
async fn test_feed_updates_vehicle_positions() {
    let backend = TestBackend::start(50).await;
    let mut dashboard = Dashboard::new(backend.config.clone(), backend.api());
    dashboard.load_initial().await.unwrap();
    let initial = dashboard.effective_vehicles().await;
    dashboard.start().unwrap();

    assert_eventually(
        || async {
            let vehicles = dashboard.effective_vehicles().await;
            vehicles[0].lat != initial[0].lat || vehicles[0].lng != initial[0].lng
        },
        Duration::from_secs(5),
        "Active vehicles should move",
    )
    .await;

    dashboard.shutdown().await;
    backend.shutdown().await;
}

/// Test 5: The dashboard reconnects after the feed goes away
#[tokio::test]
async fn test_dashboard_reports_feed_loss() {
    let backend = TestBackend::start(1000).await;
    let mut dashboard = Dashboard::new(backend.config.clone(), backend.api());
    dashboard.start().unwrap();

    assert_eventually(
        || async { dashboard.connection_state() == ConnectionState::Open },
        Duration::from_secs(5),
        "Feed should connect",
    )
    .await;

    backend.shutdown().await;

    assert_eventually(
        || async { dashboard.connection_state() != ConnectionState::Open },
        Duration::from_secs(5),
        "Feed loss should be reported",
    )
    .await;

    dashboard.shutdown().await;
}
