use crate::ApiError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRef, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use kestrel_core::analysis::Orchestrator;
use kestrel_core::model::{AnalysisRequest, AnalysisResult};
use kestrel_core::session::SessionRegistry;
use serde::Deserialize;
use serde_json::{Value, json};
use std::any::Any;

/// Shared state behind every route
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub registry: SessionRegistry,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, registry: SessionRegistry) -> Self {
        Self {
            orchestrator,
            registry,
        }
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

/// Query string of `POST /analyse`
#[derive(Debug, Default, Deserialize)]
pub struct AnalyseParams {
    #[serde(rename = "performanceRequired")]
    performance_required: Option<String>,
    /// Older name for the same switch
    #[serde(rename = "lightHouseRequired")]
    light_house_required: Option<String>,
}

impl AnalyseParams {
    /// Only the literal `true` enables the audit, under either name
    pub fn performance_required(&self) -> bool {
        [&self.performance_required, &self.light_house_required]
            .iter()
            .any(|flag| flag.as_deref() == Some("true"))
    }
}

/// Analyse the submitted HTML or URL
pub async fn analyse(
    State(state): State<AppState>,
    params: Result<Query<AnalyseParams>, QueryRejection>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Json(mut request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;
    request.performance_required = params.performance_required();

    tracing::info!(
        "Analysis requested (html: {}, url: {}, performance: {})",
        request.html.as_ref().is_some_and(|h| !h.is_empty()),
        request.url.as_deref().unwrap_or("-"),
        request.performance_required
    );

    let result = state.orchestrator.analyse(&request).await?;
    Ok(Json(result))
}

/// Serve HTML published for an in-flight audit
pub async fn session_exposure(
    State(registry): State<SessionRegistry>,
    Path(session_id): Path<String>,
) -> Response {
    match registry.resolve(&session_id) {
        Ok(html) => (
            [(header::CONTENT_TYPE, mime::TEXT_HTML_UTF_8.as_ref())],
            html.to_string(),
        )
            .into_response(),
        Err(_) => {
            tracing::debug!("Unknown session requested: {}", session_id);
            (StatusCode::NOT_FOUND, "Session not found").into_response()
        }
    }
}

pub async fn health(State(registry): State<SessionRegistry>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeSessions": registry.len(),
    }))
}

/// Converts a handler panic into a JSON 500
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Request handler panicked: {}", detail);
    ApiError::Internal("Analysis failed: internal error".to_string()).into_response()
}
