use rand::Rng;

use crate::error::{DispatchError, Result};
use crate::model::{Driver, DriverStatus, Job, JobStatus, Vehicle};

/// In-memory job store behind the reference REST API and feed.
///
/// Every driver mutation is mirrored onto the vehicle whose `driver_name`
/// matches the driver's name.
#[derive(Debug, Clone, Default)]
pub struct BackendState {
    drivers: Vec<Driver>,
    vehicles: Vec<Vehicle>,
    jobs: Vec<Job>,
}

impl BackendState {
    pub fn new(drivers: Vec<Driver>, vehicles: Vec<Vehicle>, jobs: Vec<Job>) -> Self {
        Self {
            drivers,
            vehicles,
            jobs,
        }
    }

    /// Three drivers, three vehicles, two active jobs.
    pub fn seeded() -> Self {
        let drivers = vec![
            Driver::new("1", "Alice", DriverStatus::Active)
                .with_vehicle("1")
                .with_job("Delivery"),
            Driver::new("2", "Bob", DriverStatus::Idle)
                .with_vehicle("2")
                .with_job("Pickup"),
            Driver::new("3", "Charlie", DriverStatus::Offline),
        ];
        let vehicles = vec![
            Vehicle::new("1", "Truck 1", "Alice", "Active")
                .at(37.7749, -122.4194)
                .on_route("A")
                .with_job("Delivery"),
            Vehicle::new("2", "Van 2", "Bob", "Idle")
                .at(37.7849, -122.4094)
                .on_route("B")
                .with_job("Pickup"),
            Vehicle::new("3", "Car 3", "Charlie", "Offline")
                .at(37.7649, -122.4294)
                .on_route("C"),
        ];
        let jobs = vec![
            Job::active("j1", "Delivery", "1"),
            Job::active("j2", "Pickup", "2"),
        ];
        Self::new(drivers, vehicles, jobs)
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn assign_job(&mut self, driver_id: &str, job: &str) -> Result<()> {
        self.update_driver(driver_id, Some(Some(job)), DriverStatus::Active)?;
        let id = format!("j{}", self.jobs.len() + 1);
        self.jobs.push(Job::active(id, job, driver_id));
        Ok(())
    }

    pub fn pause_driver(&mut self, driver_id: &str) -> Result<()> {
        self.update_driver(driver_id, None, DriverStatus::Offline)
    }

    pub fn resume_driver(&mut self, driver_id: &str) -> Result<()> {
        self.update_driver(driver_id, None, DriverStatus::Active)
    }

    pub fn complete_job(&mut self, driver_id: &str) -> Result<()> {
        self.update_driver(driver_id, Some(None), DriverStatus::Idle)?;
        for job in self.jobs.iter_mut().filter(|j| j.assigned_to == driver_id) {
            job.status = JobStatus::Completed;
        }
        Ok(())
    }

    /// Nudge every vehicle that is not `Offline` by up to `magnitude / 2`
    /// in each axis.
    pub fn jitter_positions<R: Rng>(&mut self, rng: &mut R, magnitude: f64) {
        for vehicle in self.vehicles.iter_mut() {
            if vehicle.status == DriverStatus::Offline.as_str() {
                continue;
            }
            vehicle.lat += (rng.gen::<f64>() - 0.5) * magnitude;
            vehicle.lng += (rng.gen::<f64>() - 0.5) * magnitude;
        }
    }

    /// `job`: `None` leaves the job alone, `Some(None)` clears it.
    fn update_driver(
        &mut self,
        driver_id: &str,
        job: Option<Option<&str>>,
        status: DriverStatus,
    ) -> Result<()> {
        let driver = self
            .drivers
            .iter_mut()
            .find(|d| d.id == driver_id)
            .ok_or_else(|| DispatchError::DriverNotFound(driver_id.to_string()))?;

        driver.status = status;
        if let Some(job) = job {
            driver.current_job = job.map(str::to_string);
        }

        if let Some(vehicle) = self
            .vehicles
            .iter_mut()
            .find(|v| v.driver_name == driver.name)
        {
            vehicle.status = status.to_string();
            if let Some(job) = job {
                vehicle.job = job.map(str::to_string);
            }
        }
        Ok(())
    }
}
