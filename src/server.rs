//! Web server implementation

use crate::dispatch::{AggregatedResponse, FanOutController};
use crate::image::ImageDescriptor;
use crate::resource::ResourceRequest;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Form key naming one requested resource
const RESOURCE_KEY: &str = "resource";

const SETTINGS_PAGE: &str = include_str!("../assets/settings.html");

/// Shared state behind every route
#[derive(Clone)]
pub struct AppState {
    controller: FanOutController,
    images: Arc<Vec<ImageDescriptor>>,
}

impl AppState {
    pub fn new(controller: FanOutController, images: Vec<ImageDescriptor>) -> Self {
        Self {
            controller,
            images: Arc::new(images),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/settings", get(settings_page_handler))
        .route(
            "/settings/resources",
            get(resources_query_handler).post(resources_form_handler),
        )
        .route("/settings/images", get(images_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Settings service listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Settings service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Split submitted pairs into requested resource names and lookup parameters.
///
/// Each `resource` value may itself be a comma-separated list.
pub fn split_form_pairs(pairs: Vec<(String, String)>) -> (Vec<String>, ResourceRequest) {
    let mut names = Vec::new();
    let mut params = Vec::new();

    for (key, value) in pairs {
        if key == RESOURCE_KEY {
            names.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        } else {
            params.push((key, value));
        }
    }

    (names, ResourceRequest::from_form_pairs(params))
}

async fn dispatch_pairs(state: &AppState, pairs: Vec<(String, String)>) -> AggregatedResponse {
    let (names, params) = split_form_pairs(pairs);
    state.controller.dispatch(names.as_slice(), params).await
}

async fn resources_query_handler(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AggregatedResponse {
    dispatch_pairs(&state, pairs).await
}

async fn resources_form_handler(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AggregatedResponse {
    dispatch_pairs(&state, pairs).await
}

async fn settings_page_handler() -> Html<&'static str> {
    Html(SETTINGS_PAGE)
}

async fn images_handler(State(state): State<AppState>) -> Json<Vec<ImageDescriptor>> {
    Json(state.images.as_ref().clone())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

impl IntoResponse for AggregatedResponse {
    fn into_response(self) -> Response {
        match self.to_json() {
            Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
            Err(e) => {
                error!("{:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to write response").into_response()
            },
        }
    }
}
