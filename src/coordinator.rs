//! User actions against a driver.
//!
//! Every action follows the same three phases:
//!
//! 1. **Apply**: the optimistic patch lands in the store before any I/O, so
//!    the effective view changes immediately.
//! 2. **Request**: the write goes to the backend.
//! 3. **Settle**: on failure the patch is rolled back. On success, terminal
//!    actions (complete, pause, resume) clear the patch; assignments leave it
//!    for the confirmation loop, because the next authoritative read may
//!    still predate the write.
//!
//! Calls for the same driver are not serialized. Overlapping actions merge
//! into one patch field by field, last write wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::api::DispatchApi;
use crate::error::Result;
use crate::model::{DriverStatus, OptimisticPatch};
use crate::store::SharedStore;

const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationLevel::Success => write!(f, "success"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}

/// User-visible outcome of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    Assign { job: String },
    Reassign { job: String },
    Complete,
    Pause,
    Resume,
}

impl DispatchAction {
    pub fn name(&self) -> &'static str {
        match self {
            DispatchAction::Assign { .. } => "assign",
            DispatchAction::Reassign { .. } => "reassign",
            DispatchAction::Complete => "complete",
            DispatchAction::Pause => "pause",
            DispatchAction::Resume => "resume",
        }
    }

    pub fn optimistic_patch(&self) -> OptimisticPatch {
        match self {
            DispatchAction::Assign { job } | DispatchAction::Reassign { job } => {
                OptimisticPatch::assignment(job.clone())
            }
            DispatchAction::Complete => OptimisticPatch::completion(),
            DispatchAction::Pause => OptimisticPatch::status(DriverStatus::Offline),
            DispatchAction::Resume => OptimisticPatch::status(DriverStatus::Active),
        }
    }

    /// Terminal actions have nothing left to converge toward once the
    /// backend accepts them.
    pub fn clears_on_success(&self) -> bool {
        !matches!(
            self,
            DispatchAction::Assign { .. } | DispatchAction::Reassign { .. }
        )
    }

    fn success_message(&self) -> String {
        match self {
            DispatchAction::Assign { job } => format!("Job '{job}' assigned to driver."),
            DispatchAction::Reassign { job } => format!("Job '{job}' reassigned to driver."),
            DispatchAction::Complete => "Job marked as completed.".to_string(),
            DispatchAction::Pause => "Driver paused.".to_string(),
            DispatchAction::Resume => "Driver resumed.".to_string(),
        }
    }

    fn failure_message(&self) -> String {
        match self {
            DispatchAction::Assign { .. } => "Failed to assign job. Please try again.".to_string(),
            DispatchAction::Reassign { .. } => {
                "Failed to reassign job. Please try again.".to_string()
            }
            DispatchAction::Complete => "Failed to complete job. Please try again.".to_string(),
            DispatchAction::Pause => "Failed to pause driver. Please try again.".to_string(),
            DispatchAction::Resume => "Failed to resume driver. Please try again.".to_string(),
        }
    }
}

/// Decrements the in-flight counter when an action settles, however it exits.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct ActionCoordinator {
    store: SharedStore,
    api: Arc<dyn DispatchApi>,
    notifications: broadcast::Sender<Notification>,
    in_flight: Arc<AtomicUsize>,
}

impl ActionCoordinator {
    pub fn new(store: SharedStore, api: Arc<dyn DispatchApi>) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            store,
            api,
            notifications,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// True while any action is waiting on its request.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn assign_job(&self, driver_id: &str, job: &str) -> bool {
        self.dispatch(
            driver_id,
            DispatchAction::Assign {
                job: job.to_string(),
            },
        )
        .await
    }

    pub async fn reassign_job(&self, driver_id: &str, job: &str) -> bool {
        self.dispatch(
            driver_id,
            DispatchAction::Reassign {
                job: job.to_string(),
            },
        )
        .await
    }

    pub async fn complete_job(&self, driver_id: &str) -> bool {
        self.dispatch(driver_id, DispatchAction::Complete).await
    }

    pub async fn pause_resume_driver(&self, driver_id: &str, pause: bool) -> bool {
        let action = if pause {
            DispatchAction::Pause
        } else {
            DispatchAction::Resume
        };
        self.dispatch(driver_id, action).await
    }

    /// Run one action through apply, request and settle. Returns whether the
    /// backend accepted it; failures are reported, never propagated.
    pub async fn dispatch(&self, driver_id: &str, action: DispatchAction) -> bool {
        let action_id = Uuid::new_v4();
        let _in_flight = InFlight::enter(&self.in_flight);

        self.store
            .set_optimistic(driver_id, action.optimistic_patch())
            .await;
        tracing::debug!(
            driver_id,
            action = action.name(),
            action_id = %action_id,
            "Optimistic patch applied"
        );

        match self.send(driver_id, &action).await {
            Ok(()) => {
                if action.clears_on_success() {
                    self.store.clear_optimistic(driver_id).await;
                }
                tracing::info!(
                    driver_id,
                    action = action.name(),
                    action_id = %action_id,
                    "Action accepted"
                );
                self.notify(NotificationLevel::Success, action.success_message());
                true
            }
            Err(e) => {
                self.store.clear_optimistic(driver_id).await;
                tracing::warn!(
                    driver_id,
                    action = action.name(),
                    action_id = %action_id,
                    error = %e,
                    "Action failed, optimistic patch rolled back"
                );
                self.notify(NotificationLevel::Error, action.failure_message());
                false
            }
        }
    }

    async fn send(&self, driver_id: &str, action: &DispatchAction) -> Result<()> {
        match action {
            DispatchAction::Assign { job } | DispatchAction::Reassign { job } => {
                self.api.assign_job(driver_id, job).await
            }
            DispatchAction::Complete => self.api.complete_job(driver_id).await,
            DispatchAction::Pause => self.api.pause_driver(driver_id).await,
            DispatchAction::Resume => self.api.resume_driver(driver_id).await,
        }
    }

    fn notify(&self, level: NotificationLevel, message: String) {
        // No subscribers is fine; the outcome is already logged.
        let _ = self.notifications.send(Notification {
            level,
            message,
            at: Utc::now(),
        });
    }
}
