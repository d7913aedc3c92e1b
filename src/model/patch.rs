use std::collections::HashMap;

use super::DriverStatus;

/// Optimistic patches keyed by driver id.
pub type PatchMap = HashMap<String, OptimisticPatch>;

/// Tentative value for a driver's job.
///
/// `Cleared` is distinct from "no override": it forces the effective job to
/// none while a completion is in flight, instead of falling through to the
/// authoritative job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOverride {
    Assigned(String),
    Cleared,
}

impl JobOverride {
    pub fn as_job(&self) -> Option<&str> {
        match self {
            JobOverride::Assigned(job) => Some(job),
            JobOverride::Cleared => None,
        }
    }

    /// True when an authoritative `currentJob` agrees with this override.
    pub fn matches(&self, current_job: Option<&str>) -> bool {
        self.as_job() == current_job
    }
}

/// Per-field tentative overrides for one driver. Absent fields fall through
/// to authoritative data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimisticPatch {
    pub job: Option<JobOverride>,
    pub status: Option<DriverStatus>,
}

impl OptimisticPatch {
    pub fn status(status: DriverStatus) -> Self {
        Self {
            job: None,
            status: Some(status),
        }
    }

    pub fn job(job: impl Into<String>) -> Self {
        Self {
            job: Some(JobOverride::Assigned(job.into())),
            status: None,
        }
    }

    /// Patch applied by an assignment: the job plus `Active`.
    pub fn assignment(job: impl Into<String>) -> Self {
        Self {
            job: Some(JobOverride::Assigned(job.into())),
            status: Some(DriverStatus::Active),
        }
    }

    /// Patch applied by a completion: no job, `Idle`.
    pub fn completion() -> Self {
        Self {
            job: Some(JobOverride::Cleared),
            status: Some(DriverStatus::Idle),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.job.is_none() && self.status.is_none()
    }

    /// Returns a new patch with `update`'s fields written over this one's.
    pub fn merged(&self, update: &OptimisticPatch) -> OptimisticPatch {
        OptimisticPatch {
            job: update.job.clone().or_else(|| self.job.clone()),
            status: update.status.or(self.status),
        }
    }

    /// A confirmation retires this patch only if it covers every field the
    /// patch sets and agrees on each of them.
    pub fn is_confirmed_by(&self, confirmation: &Confirmation) -> bool {
        let job_ok = match (&self.job, &confirmation.job) {
            (None, _) => true,
            (Some(ours), Some(theirs)) => ours == theirs,
            (Some(_), None) => false,
        };
        let status_ok = match (self.status, confirmation.status) {
            (None, _) => true,
            (Some(ours), Some(theirs)) => ours == theirs,
            (Some(_), None) => false,
        };
        job_ok && status_ok
    }
}

/// Authoritative agreement with some of a driver's patched fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub driver_id: String,
    pub job: Option<JobOverride>,
    pub status: Option<DriverStatus>,
}

impl Confirmation {
    pub fn new(driver_id: impl Into<String>) -> Self {
        Self {
            driver_id: driver_id.into(),
            job: None,
            status: None,
        }
    }

    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(JobOverride::Assigned(job.into()));
        self
    }

    pub fn with_cleared_job(mut self) -> Self {
        self.job = Some(JobOverride::Cleared);
        self
    }

    pub fn with_status(mut self, status: DriverStatus) -> Self {
        self.status = Some(status);
        self
    }
}
