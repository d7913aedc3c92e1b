use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Completed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Active => write!(f, "active"),
            JobStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A job row owned by the backend. The dashboard only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub assigned_to: String,
    pub status: JobStatus,
}

impl Job {
    pub fn active(
        id: impl Into<String>,
        job_type: impl Into<String>,
        assigned_to: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            assigned_to: assigned_to.into(),
            status: JobStatus::Active,
        }
    }
}
