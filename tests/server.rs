//! Router tests driven through `tower::ServiceExt::oneshot`

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use gce_agents::dispatch::FanOutController;
use gce_agents::image::ImageDescriptor;
use gce_agents::resource::{HandlerRegistry, ResourceHandler, ResourceRequest};
use gce_agents::server::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Echoes the zone parameter back, fails without one
struct ZoneEcho;

#[async_trait]
impl ResourceHandler for ZoneEcho {
    async fn handle(&self, params: &ResourceRequest) -> Result<Value> {
        Ok(json!([{ "id": params.require("zone")? }]))
    }
}

struct Failing(&'static str);

#[async_trait]
impl ResourceHandler for Failing {
    async fn handle(&self, _params: &ResourceRequest) -> Result<Value> {
        Err(anyhow::anyhow!(self.0))
    }
}

fn app() -> axum::Router {
    let mut registry = HandlerRegistry::new();
    registry
        .register("machineTypes", Arc::new(ZoneEcho))
        .register("networks", Arc::new(Failing("quota exceeded")))
        .register("images", Arc::new(Failing("quota exceeded")));

    let image = ImageDescriptor {
        source_id: "linux".to_string(),
        source_image: "agent-image".to_string(),
        zone: "us-central1-a".to_string(),
        network: None,
        machine_type: "n1-standard-2".to_string(),
        max_instances: 2,
        agent_pool_id: Some(1),
        profile_id: None,
        preemptible: false,
    };

    router(AppState::new(FanOutController::new(registry), vec![image]))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn test_query_dispatch() {
    let response = app()
        .oneshot(
            Request::get("/settings/resources?resource=machinetypes&resource=bogus&prop:zone=us-east1-b")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"resources": [{"resource": "machineTypes", "items": [{"id": "us-east1-b"}]}]})
    );
}

#[tokio::test]
async fn test_form_dispatch_with_errors_is_still_ok() {
    let response = app()
        .oneshot(
            Request::post("/settings/resources")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("resource=networks,images&resource=machineTypes&zone=eu"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "resources": [{"resource": "machineTypes", "items": [{"id": "eu"}]}],
            "errors": [{"resource": "networks", "message": "quota exceeded"}]
        })
    );
}

#[tokio::test]
async fn test_images_listing() {
    let response = app()
        .oneshot(Request::get("/settings/images").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["sourceId"], "linux");
    assert_eq!(body[0]["agent_pool_id"], 1);
    assert_eq!(body[0]["preemptible"], false);
}

#[tokio::test]
async fn test_settings_page_and_health() {
    let response = app()
        .oneshot(Request::get("/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}
