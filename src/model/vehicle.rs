use serde::{Deserialize, Serialize};

/// A vehicle position row. `driver_name` joins to [`Driver::name`](super::Driver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub driver_name: String,
    /// Free-form status string ("Active", "en route", "Idle", ...).
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub job: Option<String>,
}

impl Vehicle {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        driver_name: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat: 0.0,
            lng: 0.0,
            driver_name: driver_name.into(),
            status: status.into(),
            route: String::new(),
            job: None,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.lat = lat;
        self.lng = lng;
        self
    }

    pub fn on_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }
}
