// Copyright 2026 Rankscope Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for Rankscope.
//!
//! Every handler works on the same [`SharedState`] as the scheduler, so a
//! settings change takes effect for the next check and the next cron run.
//! Errors are returned as `{"error": "<message>"}`.

use crate::config::{parse_recipients, Settings};
use crate::csv_io;
use crate::notify::email::EmailConfig;
use crate::notify::NotifyError;
use crate::server::SharedState;
use crate::store::ResultQuery;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rankscope::{normalize_domain, DomainResult, MetricsProvider};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Domain looked up when testing a paid-metrics API key.
pub const KEY_CHECK_DOMAIN: &str = "example.com";

pub const EXPORT_FILE_NAME: &str = "domain-results.csv";

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<SharedState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/check-domain", post(check_domain))
        .route("/api/upload-csv", post(upload_csv))
        .route("/api/results", get(list_results).delete(clear_results))
        .route("/api/export-csv", get(export_csv))
        .route("/api/settings", get(get_settings).post(update_settings))
        .route("/api/test-seranking", post(test_seranking))
        .route("/api/test-email", post(test_email))
        .route(
            "/api/tracked-domains",
            get(list_tracked).post(add_tracked),
        )
        .route("/api/tracked-domains/:domain", delete(remove_tracked))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API on `listener` until `shutdown` resolves.
pub async fn start<F>(
    listener: tokio::net::TcpListener,
    state: Arc<SharedState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("REST API listening on http://{addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ── Errors ──────────────────────────────────────────────────────

/// An error response with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{e:#}"),
        }
    }
}

impl From<NotifyError> for ApiError {
    fn from(e: NotifyError) -> Self {
        let status = if e.is_config_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Request bodies ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DomainRequest {
    #[serde(default)]
    domain: Option<String>,
}

impl DomainRequest {
    fn domain(&self) -> ApiResult<&str> {
        self.domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ApiError::bad_request("Domain is required"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyRequest {
    #[serde(default)]
    api_key: Option<String>,
}

/// Ad-hoc email credentials plus the comma-separated `testEmail` list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestEmailRequest {
    #[serde(default)]
    test_email: Option<String>,
    #[serde(flatten)]
    config: EmailConfig,
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<SharedState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    }))
}

async fn check_domain(
    State(state): State<Arc<SharedState>>,
    req: Result<Json<DomainRequest>, JsonRejection>,
) -> ApiResult<Json<DomainResult>> {
    let Json(req) = req?;
    let domain = req.domain()?;
    let result = state
        .ctx
        .check_and_save(&[domain])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("check returned no result"))?;
    Ok(Json(result))
}

/// Accepts the CSV file as the raw request body.
async fn upload_csv(
    State(state): State<Arc<SharedState>>,
    body: String,
) -> ApiResult<Json<Vec<DomainResult>>> {
    let domains =
        csv_io::read_domains(body.as_bytes()).map_err(|e| ApiError::bad_request(e.to_string()))?;
    info!(domains = domains.len(), "CSV upload received");
    Ok(Json(state.ctx.check_and_save(&domains).await?))
}

async fn list_results(
    State(state): State<Arc<SharedState>>,
    query: Result<Query<ResultQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DomainResult>>> {
    let Query(query) = query?;
    Ok(Json(state.ctx.store.query_results(&query)?))
}

async fn clear_results(State(state): State<Arc<SharedState>>) -> ApiResult<Json<Value>> {
    let deleted = state.ctx.store.clear_results()?;
    info!(deleted, "results cleared");
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

async fn export_csv(State(state): State<Arc<SharedState>>) -> ApiResult<Response> {
    let results = state.ctx.store.all_results()?;
    let body = csv_io::results_to_string(&results)?;
    let disposition = format!("attachment; filename=\"{EXPORT_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn get_settings(State(state): State<Arc<SharedState>>) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(state.ctx.store.settings_map()?))
}

/// Merge the posted keys into stored settings, then reschedule automation.
/// Nothing is saved when a posted value has the wrong type.
async fn update_settings(
    State(state): State<Arc<SharedState>>,
    updates: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(updates) = updates?;
    Settings::check_update(&updates).map_err(ApiError::bad_request)?;

    let mut merged = state.ctx.store.settings_map()?;
    merged.extend(updates.clone());
    let settings =
        Settings::from_map(merged).map_err(|e| ApiError::bad_request(format!("{e:#}")))?;

    state.ctx.store.update_settings(&updates)?;
    state
        .automation
        .apply(&settings)
        .await
        .map_err(|e| ApiError::bad_request(format!("{e:#}")))?;
    Ok(Json(json!({ "success": true })))
}

async fn test_seranking(
    State(state): State<Arc<SharedState>>,
    req: Result<Json<ApiKeyRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = req?;
    let Some(key) = req.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
        return Err(ApiError::bad_request("API key is required"));
    };

    let provider = state.ctx.metrics_provider(key);
    let response = match provider.fetch_metrics(KEY_CHECK_DOMAIN).await {
        Ok(metrics) if metrics.is_usable() => Json(json!({
            "success": true,
            "message": "API key is working!",
            "sample": metrics,
        }))
        .into_response(),
        Ok(_) => Json(json!({
            "success": false,
            "message": "API key may be invalid or domain not found in SE Ranking database",
        }))
        .into_response(),
        Err(e) => {
            warn!("API key test failed: {e}");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    };
    Ok(response)
}

async fn test_email(
    State(state): State<Arc<SharedState>>,
    req: Result<Json<TestEmailRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = req?;
    let recipients = parse_recipients(req.test_email.as_deref().unwrap_or_default());
    let message = state
        .ctx
        .notifier
        .send_test_email(&req.config, recipients)
        .await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn list_tracked(State(state): State<Arc<SharedState>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.ctx.store.tracked_domains()?))
}

async fn add_tracked(
    State(state): State<Arc<SharedState>>,
    req: Result<Json<DomainRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = req?;
    let domain = normalize_domain(req.domain()?).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let added = state.ctx.store.add_tracked_domain(&domain)?;
    Ok(Json(json!({ "success": true, "added": added, "domain": domain })))
}

async fn remove_tracked(
    State(state): State<Arc<SharedState>>,
    Path(domain): Path<String>,
) -> ApiResult<Json<Value>> {
    let domain = normalize_domain(&domain).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !state.ctx.store.remove_tracked_domain(&domain)? {
        return Err(ApiError::not_found(format!("{domain} is not tracked")));
    }
    Ok(Json(json!({ "success": true })))
}
