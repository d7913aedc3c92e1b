use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::types::{ActionResponse, AssignJobRequest, DriverRequest};
use crate::api::DispatchApi;
use crate::config::DashboardConfig;
use crate::error::{DispatchError, Result};
use crate::model::{Driver, Job, Vehicle};

/// JSON-over-HTTP client for the dispatch backend.
#[derive(Debug, Clone)]
pub struct HttpDispatchApi {
    client: Client,
    base_url: String,
}

impl HttpDispatchApi {
    /// Creates a client from dashboard configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(DispatchError::RequestFailed { status, body })
        }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, driver_id: &str, body: &B) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DispatchError::DriverNotFound(driver_id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let ack: ActionResponse = response.json().await?;
        if ack.success {
            Ok(())
        } else {
            Err(DispatchError::RequestFailed {
                status: status.as_u16(),
                body: "backend reported success=false".to_string(),
            })
        }
    }

    fn driver_body(driver_id: &str) -> DriverRequest {
        DriverRequest {
            driver_id: driver_id.to_string(),
        }
    }
}

#[async_trait]
impl DispatchApi for HttpDispatchApi {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>> {
        self.get("/drivers").await
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>> {
        self.get("/vehicles").await
    }

    async fn fetch_jobs(&self) -> Result<Vec<Job>> {
        self.get("/jobs").await
    }

    async fn assign_job(&self, driver_id: &str, job: &str) -> Result<()> {
        let body = AssignJobRequest {
            driver_id: driver_id.to_string(),
            job: job.to_string(),
        };
        self.post("/assign-job", driver_id, &body).await
    }

    async fn pause_driver(&self, driver_id: &str) -> Result<()> {
        self.post("/pause-driver", driver_id, &Self::driver_body(driver_id))
            .await
    }

    async fn resume_driver(&self, driver_id: &str) -> Result<()> {
        self.post("/resume-driver", driver_id, &Self::driver_body(driver_id))
            .await
    }

    async fn complete_job(&self, driver_id: &str) -> Result<()> {
        self.post("/complete-job", driver_id, &Self::driver_body(driver_id))
            .await
    }
}
