//! Shared helpers for dispatch integration tests.
//!
//! [`FakeApi`] runs the real [`BackendState`] in memory and lets a test
//! fail individual endpoints or hold writes back from reads, which is how
//! the backend looks while a write has not yet become visible.

#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use fleet_dispatch::api::DispatchApi;
use fleet_dispatch::backend::BackendState;
use fleet_dispatch::error::{DispatchError, Result};
use fleet_dispatch::model::{Driver, DriverStatus, Job, Vehicle};

/// Endpoints a test can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    FetchDrivers,
    AssignJob,
    PauseDriver,
    ResumeDriver,
    CompleteJob,
}

#[derive(Default)]
pub struct FakeApi {
    /// What reads return.
    visible: Mutex<BackendState>,
    /// Where writes land. Copied into `visible` unless writes are held.
    written: Mutex<BackendState>,
    failing: Mutex<HashSet<Endpoint>>,
    hold_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    driver_fetches: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn seeded() -> Self {
        Self::with_state(BackendState::seeded())
    }

    pub fn with_state(state: BackendState) -> Self {
        Self {
            visible: Mutex::new(state.clone()),
            written: Mutex::new(state),
            ..Default::default()
        }
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.failing.lock().unwrap().insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.failing.lock().unwrap().remove(&endpoint);
    }

    /// Accept writes without making them visible to reads.
    pub fn hold_writes(&self) {
        self.hold_writes.store(true, Ordering::SeqCst);
    }

    /// Make every accepted write visible.
    pub fn release_writes(&self) {
        self.hold_writes.store(false, Ordering::SeqCst);
        let written = self.written.lock().unwrap().clone();
        *self.visible.lock().unwrap() = written;
    }

    /// Delay every write request, to observe actions while in flight.
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Overwrite what driver reads return, bypassing the write path.
    pub fn set_visible_drivers(&self, drivers: Vec<Driver>) {
        let mut visible = self.visible.lock().unwrap();
        let vehicles = visible.vehicles().to_vec();
        let jobs = visible.jobs().to_vec();
        *visible = BackendState::new(drivers, vehicles, jobs);
    }

    pub fn driver_fetches(&self) -> usize {
        self.driver_fetches.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, endpoint: Endpoint) -> Result<()> {
        if self.failing.lock().unwrap().contains(&endpoint) {
            return Err(DispatchError::RequestFailed {
                status: 500,
                body: format!("{endpoint:?} failed"),
            });
        }
        Ok(())
    }

    async fn write<F>(&self, name: &str, endpoint: Endpoint, f: F) -> Result<()>
    where
        F: FnOnce(&mut BackendState) -> Result<()> + Send,
    {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(name.to_string());
        self.check(endpoint)?;
        let mut written = self.written.lock().unwrap();
        f(&mut written)?;
        if !self.hold_writes.load(Ordering::SeqCst) {
            *self.visible.lock().unwrap() = written.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl DispatchApi for FakeApi {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>> {
        self.driver_fetches.fetch_add(1, Ordering::SeqCst);
        self.check(Endpoint::FetchDrivers)?;
        Ok(self.visible.lock().unwrap().drivers().to_vec())
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self.visible.lock().unwrap().vehicles().to_vec())
    }

    async fn fetch_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.visible.lock().unwrap().jobs().to_vec())
    }

    async fn assign_job(&self, driver_id: &str, job: &str) -> Result<()> {
        self.write("assign-job", Endpoint::AssignJob, |s| {
            s.assign_job(driver_id, job)
        })
        .await
    }

    async fn pause_driver(&self, driver_id: &str) -> Result<()> {
        self.write("pause-driver", Endpoint::PauseDriver, |s| {
            s.pause_driver(driver_id)
        })
        .await
    }

    async fn resume_driver(&self, driver_id: &str) -> Result<()> {
        self.write("resume-driver", Endpoint::ResumeDriver, |s| {
            s.resume_driver(driver_id)
        })
        .await
    }

    async fn complete_job(&self, driver_id: &str) -> Result<()> {
        self.write("complete-job", Endpoint::CompleteJob, |s| {
            s.complete_job(driver_id)
        })
        .await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn alice() -> Driver {
    Driver::new("1", "Alice", DriverStatus::Active)
        .with_vehicle("1")
        .with_job("Delivery")
}

pub fn alice_vehicle() -> Vehicle {
    Vehicle::new("1", "Truck 1", "Alice", "Active")
        .at(37.7749, -122.4194)
        .on_route("A")
        .with_job("Delivery")
}

pub fn seeded_drivers() -> Vec<Driver> {
    BackendState::seeded().drivers().to_vec()
}

pub fn seeded_vehicles() -> Vec<Vehicle> {
    BackendState::seeded().vehicles().to_vec()
}

// =============================================================================
// Waiting
// =============================================================================

/// Wait for a condition to become true with timeout
pub async fn wait_for<F, Fut>(
    condition: F,
    timeout_duration: Duration,
    poll_interval: Duration,
) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout_duration {
        if condition().await {
            return true;
        }
        tokio::time::sleep(poll_interval).await;
    }
    false
}

/// Assert a condition eventually becomes true
pub async fn assert_eventually<F, Fut>(condition: F, timeout_duration: Duration, message: &str)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = wait_for(condition, timeout_duration, Duration::from_millis(50)).await;
    assert!(result, "{}", message);
}
