use crate::config::Config;
use crate::controller::{ReportController, TriggerRejected};
use crate::errors::{AppError, ResultExt};
use crate::models::{AssessmentSnapshot, DownloadState};
use crate::navigation::{NavigationGuard, ResultsView};
use crate::projection::{DownloadControl, REPORT_CONTENTS};
use crate::store::AssessmentStore;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Assessment payloads are small; 1MB is plenty.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The session's assessment.
    pub store: AssessmentStore,
    /// Report download state machine.
    pub controller: Arc<ReportController>,
    /// Empty-state policy for the Results surface.
    pub guard: NavigationGuard,
}

impl AppState {
    pub fn new(config: Config, store: AssessmentStore, controller: ReportController) -> Self {
        let guard = NavigationGuard::new(config.assessment_entry_point.clone());
        Self {
            config,
            store,
            controller: Arc::new(controller),
            guard,
        }
    }
}

/// Routes of the results surface, without middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/assessment",
            get(get_assessment).put(replace_assessment),
        )
        .route("/api/v1/results", get(get_results))
        .route("/api/v1/report", get(get_report_state).post(trigger_report))
        .route("/api/v1/report/error", delete(dismiss_report_error))
        .with_state(state)
}

/// Routes plus the serving middleware.
///
/// The body limit wraps the routes on its own; tracing and CORS sit outside it.
pub fn app(state: Arc<AppState>) -> Router {
    router(state)
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "ayursutra-results",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Download state plus the button/banner derived from it.
#[derive(Debug, Serialize)]
pub struct ReportStatus {
    pub download: DownloadState,
    pub control: DownloadControl,
}

impl From<DownloadState> for ReportStatus {
    fn from(download: DownloadState) -> Self {
        let control = DownloadControl::from(&download);
        Self { download, control }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    #[serde(flatten)]
    pub view: ResultsView,
    pub report: ReportStatus,
    pub report_contents: [&'static str; 6],
}

/// GET /api/v1/assessment
///
/// Current snapshot as accepted from the producer.
pub async fn get_assessment(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.store.read();
    Json(json!({
        "assessment": snapshot.assessment,
        "user_data": snapshot.user_data,
        "updated_at": snapshot.updated_at,
    }))
}

/// PUT /api/v1/assessment
///
/// The producer's only write path. Replaces the whole snapshot and returns the
/// Results view it produces.
pub async fn replace_assessment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AssessmentSnapshot>, JsonRejection>,
) -> Result<Json<ResultsView>, AppError> {
    tracing::info!("PUT /assessment");

    let Json(assessment) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let snapshot = state
        .store
        .replace(assessment)
        .context("replacing assessment snapshot")?;

    Ok(Json(state.guard.enter(&snapshot)))
}

/// GET /api/v1/results
///
/// Results page, or the call-to-action when no assessment has been completed.
pub async fn get_results(State(state): State<Arc<AppState>>) -> Json<ResultsResponse> {
    let snapshot = state.store.read();
    Json(ResultsResponse {
        view: state.guard.enter(&snapshot),
        report: state.controller.state().into(),
        report_contents: REPORT_CONTENTS,
    })
}

/// GET /api/v1/report
pub async fn get_report_state(State(state): State<Arc<AppState>>) -> Json<ReportStatus> {
    Json(state.controller.state().into())
}

/// POST /api/v1/report
///
/// Starts a report download in the background. A trigger while another attempt is
/// in flight is a no-op.
pub async fn trigger_report(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.controller.begin() {
        Ok(attempt) => {
            let attempt_id = attempt.id;
            let controller = state.controller.clone();
            tokio::spawn(async move {
                controller.run(attempt).await;
            });
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "accepted": true,
                    "attempt_id": attempt_id,
                    "report": ReportStatus::from(state.controller.state()),
                })),
            )
        }
        Err(TriggerRejected::InFlight) => (
            StatusCode::OK,
            Json(json!({
                "accepted": false,
                "reason": "in_flight",
                "report": ReportStatus::from(state.controller.state()),
            })),
        ),
        Err(TriggerRejected::NoAssessment) => (
            StatusCode::CONFLICT,
            Json(json!({
                "accepted": false,
                "reason": "no_assessment",
                "call_to_action": state.guard.call_to_action(),
            })),
        ),
    }
}

/// DELETE /api/v1/report/error
///
/// Dismisses the error banner of a failed attempt.
pub async fn dismiss_report_error(State(state): State<Arc<AppState>>) -> Json<ReportStatus> {
    if state.controller.dismiss() {
        tracing::info!("Report error dismissed");
    }
    Json(state.controller.state().into())
}
