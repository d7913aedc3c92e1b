use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{ActionResponse, AssignJobRequest, DriverRequest};
use crate::backend::SharedBackend;
use crate::error::{DispatchError, Result};

pub fn router(state: SharedBackend) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/drivers", get(list_drivers_handler))
        .route("/vehicles", get(list_vehicles_handler))
        .route("/jobs", get(list_jobs_handler))
        .route("/assign-job", post(assign_job_handler))
        .route("/pause-driver", post(pause_driver_handler))
        .route("/resume-driver", post(resume_driver_handler))
        .route("/complete-job", post(complete_job_handler))
        .layer(cors)
        .with_state(state)
}

async fn list_drivers_handler(State(state): State<SharedBackend>) -> impl IntoResponse {
    Json(state.read().await.drivers().to_vec())
}

async fn list_vehicles_handler(State(state): State<SharedBackend>) -> impl IntoResponse {
    Json(state.read().await.vehicles().to_vec())
}

async fn list_jobs_handler(State(state): State<SharedBackend>) -> impl IntoResponse {
    Json(state.read().await.jobs().to_vec())
}

async fn assign_job_handler(
    State(state): State<SharedBackend>,
    Json(payload): Json<AssignJobRequest>,
) -> impl IntoResponse {
    let result = state
        .write()
        .await
        .assign_job(&payload.driver_id, &payload.job);
    if result.is_ok() {
        tracing::info!(driver_id = %payload.driver_id, job = %payload.job, "Job assigned");
    }
    action_response(result)
}

async fn pause_driver_handler(
    State(state): State<SharedBackend>,
    Json(payload): Json<DriverRequest>,
) -> impl IntoResponse {
    let result = state.write().await.pause_driver(&payload.driver_id);
    if result.is_ok() {
        tracing::info!(driver_id = %payload.driver_id, "Driver paused");
    }
    action_response(result)
}

async fn resume_driver_handler(
    State(state): State<SharedBackend>,
    Json(payload): Json<DriverRequest>,
) -> impl IntoResponse {
    let result = state.write().await.resume_driver(&payload.driver_id);
    if result.is_ok() {
        tracing::info!(driver_id = %payload.driver_id, "Driver resumed");
    }
    action_response(result)
}

async fn complete_job_handler(
    State(state): State<SharedBackend>,
    Json(payload): Json<DriverRequest>,
) -> impl IntoResponse {
    let result = state.write().await.complete_job(&payload.driver_id);
    if result.is_ok() {
        tracing::info!(driver_id = %payload.driver_id, "Job completed");
    }
    action_response(result)
}

fn action_response(result: Result<()>) -> (StatusCode, Json<ActionResponse>) {
    match result {
        Ok(()) => (StatusCode::OK, Json(ActionResponse { success: true })),
        Err(DispatchError::DriverNotFound(driver_id)) => {
            tracing::warn!(driver_id = %driver_id, "Action for unknown driver");
            (StatusCode::NOT_FOUND, Json(ActionResponse { success: false }))
        }
        Err(e) => {
            tracing::error!(error = %e, "Action failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse { success: false }),
            )
        }
    }
}
