//! Request/response contract with the authoritative backend.
//!
//! [`DispatchApi`] is the seam the coordinator and the confirmation loop
//! depend on; [`HttpDispatchApi`] is the JSON-over-HTTP implementation.
//! Write operations return `Ok(())` only on a success response; an unknown
//! driver surfaces as [`DispatchError::DriverNotFound`](crate::error::DispatchError).

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Driver, Job, Vehicle};

pub use client::HttpDispatchApi;
pub use types::{ActionResponse, AssignJobRequest, DriverRequest};

#[async_trait]
pub trait DispatchApi: Send + Sync {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>>;

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>>;

    async fn fetch_jobs(&self) -> Result<Vec<Job>>;

    async fn assign_job(&self, driver_id: &str, job: &str) -> Result<()>;

    async fn pause_driver(&self, driver_id: &str) -> Result<()>;

    async fn resume_driver(&self, driver_id: &str) -> Result<()>;

    async fn complete_job(&self, driver_id: &str) -> Result<()>;
}
