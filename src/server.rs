//! Diagnostic echo server: shows callers what their client sends.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
};
use chrono::{DateTime, Local};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::record::UserAgentRecord;
use crate::template::{PageData, TemplateRenderer};

/// Application state shared across all requests
#[derive(Clone)]
struct AppState {
    renderer: Arc<TemplateRenderer>,
}

/// Build the Axum application with routes and middleware.
///
/// Handlers read the caller's address from `ConnectInfo`, so serve the
/// router with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_app(renderer: TemplateRenderer) -> Router {
    let state = AppState {
        renderer: Arc::new(renderer),
    };

    Router::new()
        .route("/", get(index))
        .route("/api/ua", get(api_ua))
        .route("/headers", get(header_dump))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn log_request(record: &UserAgentRecord) {
    tracing::info!(target: "uachecker::request", "{record}");
}

/// HTML page describing the request
async fn index(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let record = UserAgentRecord::from_request(&method, &uri, &headers, remote_addr);

    match state.renderer.render(&PageData::from(&record)) {
        Ok(page) => {
            log_request(&record);
            Html(page).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to render template");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

#[derive(Serialize)]
struct UserAgentSummary {
    user_agent: String,
    timestamp: DateTime<Local>,
}

/// User-Agent and timestamp only
async fn api_ua(
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<UserAgentSummary> {
    let record = UserAgentRecord::from_request(&method, &uri, &headers, remote_addr);
    log_request(&record);

    Json(UserAgentSummary {
        user_agent: record.user_agent,
        timestamp: record.timestamp,
    })
}

/// The full record
async fn header_dump(
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<UserAgentRecord> {
    let record = UserAgentRecord::from_request(&method, &uri, &headers, remote_addr);
    log_request(&record);
    Json(record)
}
