use std::sync::Arc;
use std::time::SystemTime;

use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod pixel;
pub mod stats;
pub mod store;
pub mod web;

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::store::{StoreError, TrackingStore};

const SERVICE_NAME: &str = "campaign-tracker";
const HEADER_X_FORWARDED_FOR: &str = "x-forwarded-for";
const HEADER_X_REAL_IP: &str = "x-real-ip";
const PIXEL_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate";

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: TrackingStore,
    started_at: SystemTime,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ClickQuery {
    #[serde(default)]
    redirect: Option<String>,
}

/// Builds the full HTTP surface, opening the tracking store at the
/// configured path.
pub fn build_router(config: Config) -> Result<Router, StoreError> {
    let store = TrackingStore::open(config.store_path.clone())?;
    Ok(build_router_with_store(config, store))
}

pub fn build_router_with_store(config: Config, store: TrackingStore) -> Router {
    let state = AppState {
        config: Arc::new(config),
        store,
        started_at: SystemTime::now(),
    };

    Router::new()
        .route("/", get(home))
        .route("/healthz", get(health))
        .route("/track/open/:tracking_id", get(track_open))
        .route("/track/click/:tracking_id/:action_name", get(track_click))
        .route("/unsubscribe/:tracking_id", get(unsubscribe))
        .route("/stats", get(stats_page))
        .route("/api/stats", get(api_stats))
        .route("/api/sent", post(record_sent))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

async fn home() -> Html<String> {
    Html(web::render_home())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = match state.started_at.elapsed() {
        Ok(duration) => duration.as_secs(),
        Err(_) => 0,
    };

    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
    })
}

async fn track_open(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    // Pixel URLs end in ".png" so mail clients treat them as images.
    let tracking_id = tracking_id
        .strip_suffix(".png")
        .unwrap_or(tracking_id.as_str());

    state
        .store
        .record_open(tracking_id, client_ip(&headers), user_agent(&headers))
        .await
        .map_err(|error| store_failure(&state, &error))?;

    Ok((
        [
            (CONTENT_TYPE, "image/png"),
            (CACHE_CONTROL, PIXEL_CACHE_CONTROL),
            (CONTENT_DISPOSITION, "inline"),
        ],
        pixel::TRANSPARENT_PIXEL_PNG,
    )
        .into_response())
}

async fn track_click(
    State(state): State<AppState>,
    Path((tracking_id, action_name)): Path<(String, String)>,
    Query(query): Query<ClickQuery>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .record_click(
            &tracking_id,
            &action_name,
            client_ip(&headers),
            user_agent(&headers),
        )
        .await
        .map_err(|error| store_failure(&state, &error))?;

    // The target is taken verbatim from the query string; campaign links
    // carry their own destination.
    let target = query
        .redirect
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| state.config.fallback_redirect_url.clone());

    Ok(Redirect::temporary(&target).into_response())
}

async fn unsubscribe(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .record_unsubscribe(&tracking_id)
        .await
        .map_err(|error| store_failure(&state, &error))?;

    Ok(Html(web::render_unsubscribe()).into_response())
}

async fn stats_page(State(state): State<AppState>) -> Html<String> {
    let document = state.store.snapshot().await;
    Html(web::render_stats(&stats::compute(&document)))
}

async fn api_stats(State(state): State<AppState>) -> Json<stats::StatsResponse> {
    let document = state.store.snapshot().await;
    Json(stats::compute(&document).to_response())
}

async fn record_sent(
    State(state): State<AppState>,
    Json(record): Json<Value>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .record_sent(record)
        .await
        .map_err(|error| store_failure(&state, &error))?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"status": "recorded"}))).into_response())
}

fn store_failure(state: &AppState, error: &StoreError) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(target: "tracker.http", error = %error, "tracking store failure");

    let message = if state.config.production {
        "internal error".to_string()
    } else {
        error.to_string()
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: message }),
    )
}

fn client_ip(headers: &HeaderMap) -> String {
    if let Some(value) = header_string(headers, HEADER_X_FORWARDED_FOR) {
        let first_ip = value.split(',').next().unwrap_or_default().trim();
        if !first_ip.is_empty() {
            return first_ip.to_string();
        }
    }

    header_string(headers, HEADER_X_REAL_IP).unwrap_or_default()
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
