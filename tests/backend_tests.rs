use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower::ServiceExt;

use fleet_dispatch::backend::{rest, BackendState, SharedBackend};

fn create_test_app() -> (Router, SharedBackend) {
    let state: SharedBackend = Arc::new(RwLock::new(BackendState::seeded()));
    (rest::router(state.clone()), state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_list_drivers() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app, "/drivers").await;

    assert_eq!(status, StatusCode::OK);
    let drivers = json.as_array().unwrap();
    assert_eq!(drivers.len(), 3);
    assert_eq!(drivers[0]["name"], "Alice");
    assert_eq!(drivers[0]["vehicleId"], "1");
    assert_eq!(drivers[0]["currentJob"], "Delivery");
    assert_eq!(drivers[2]["status"], "Offline");
    assert!(drivers[2]["currentJob"].is_null());
}

#[tokio::test]
async fn test_list_vehicles_and_jobs() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app.clone(), "/vehicles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[1]["driverName"], "Bob");
    assert_eq!(json[1]["route"], "B");

    let (status, json) = get_json(app, "/jobs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["id"], "j1");
    assert_eq!(json[0]["type"], "Delivery");
    assert_eq!(json[0]["assignedTo"], "1");
    assert_eq!(json[0]["status"], "active");
}

#[tokio::test]
async fn test_assign_job() {
    let (app, state) = create_test_app();
    let (status, json) = post_json(
        app,
        "/assign-job",
        json!({"driverId": "3", "job": "Pickup"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));

    let state = state.read().await;
    assert_eq!(state.drivers()[2].current_job.as_deref(), Some("Pickup"));
    assert_eq!(state.vehicles()[2].job.as_deref(), Some("Pickup"));
    assert_eq!(state.jobs().len(), 3);
}

#[tokio::test]
async fn test_unknown_driver_returns_not_found() {
    let (app, state) = create_test_app();
    let (status, json) = post_json(
        app.clone(),
        "/assign-job",
        json!({"driverId": "99", "job": "Pickup"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, json!({"success": false}));

    let (status, _) = post_json(app, "/pause-driver", json!({"driverId": "99"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.read().await.jobs().len(), 2);
}

#[tokio::test]
async fn test_pause_resume_complete() {
    let (app, state) = create_test_app();

    let (status, _) = post_json(app.clone(), "/pause-driver", json!({"driverId": "1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.read().await.vehicles()[0].status, "Offline");

    let (status, _) = post_json(app.clone(), "/resume-driver", json!({"driverId": "1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.read().await.vehicles()[0].status, "Active");

    let (status, _) = post_json(app, "/complete-job", json!({"driverId": "1"})).await;
    assert_eq!(status, StatusCode::OK);
    let state = state.read().await;
    assert!(state.drivers()[0].current_job.is_none());
    assert_eq!(state.jobs()[0].status.to_string(), "completed");
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let (app, _) = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/assign-job")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"driverId":"1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
