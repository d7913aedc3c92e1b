//! Entity shapes shared by the store, the API client and the backend.

pub mod driver;
pub mod job;
pub mod patch;
pub mod vehicle;

pub use driver::{Driver, DriverStatus};
pub use job::{Job, JobStatus};
pub use patch::{Confirmation, JobOverride, OptimisticPatch, PatchMap};
pub use vehicle::Vehicle;
