//! Pure projections of authoritative plus optimistic state into the view
//! the dashboard renders. Nothing here mutates its inputs.

use crate::model::{Driver, DriverStatus, JobOverride, PatchMap, Vehicle};

/// Normalizes a free-form vehicle status into a driver status.
pub fn map_vehicle_status(status: &str) -> DriverStatus {
    match status.to_lowercase().as_str() {
        "en route" | "active" => DriverStatus::Active,
        "idle" => DriverStatus::Idle,
        _ => DriverStatus::Offline,
    }
}

/// Effective drivers: patch fields win, then the vehicle joined by name,
/// then the driver's own row.
pub fn merge_drivers(drivers: &[Driver], vehicles: &[Vehicle], optimistic: &PatchMap) -> Vec<Driver> {
    drivers
        .iter()
        .map(|driver| {
            let vehicle = vehicles.iter().find(|v| v.driver_name == driver.name);
            let patch = optimistic.get(&driver.id);

            let status = patch
                .and_then(|p| p.status)
                .or_else(|| vehicle.map(|v| map_vehicle_status(&v.status)))
                .unwrap_or(driver.status);

            let current_job = match patch.and_then(|p| p.job.as_ref()) {
                Some(JobOverride::Assigned(job)) => Some(job.clone()),
                Some(JobOverride::Cleared) => None,
                None => match vehicle {
                    Some(v) => v.job.clone(),
                    None => driver.current_job.clone(),
                },
            };

            Driver {
                status,
                current_job,
                ..driver.clone()
            }
        })
        .collect()
}

/// Effective vehicles: a copy of each vehicle with its driver's patch applied.
pub fn merge_vehicles(vehicles: &[Vehicle], drivers: &[Driver], optimistic: &PatchMap) -> Vec<Vehicle> {
    vehicles
        .iter()
        .map(|vehicle| {
            let patch = drivers
                .iter()
                .find(|d| d.name == vehicle.driver_name)
                .and_then(|d| optimistic.get(&d.id));

            let mut updated = vehicle.clone();
            if let Some(patch) = patch {
                if let Some(job) = &patch.job {
                    updated.job = job.as_job().map(str::to_string);
                }
                if let Some(status) = patch.status {
                    updated.status = status.to_string();
                }
            }
            updated
        })
        .collect()
}
