use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverStatus {
    Active,
    Idle,
    Offline,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Active => "Active",
            DriverStatus::Idle => "Idle",
            DriverStatus::Offline => "Offline",
        }
    }
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A driver as reported by the authoritative API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub status: DriverStatus,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub current_job: Option<String>,
}

impl Driver {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: DriverStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            vehicle_id: None,
            current_job: None,
        }
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }

    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.current_job = Some(job.into());
        self
    }
}
