//! HTTP API handlers for cescout.
//!
//! Caller mistakes (bad dates, inverted ranges, malformed country codes or
//! ASNs, unknown sources) are answered with `400` and a JSON `{"error": ...}`
//! body. Upstream failures never change the status code: they are reported
//! inside the report, per source.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::aggregation::{Aggregator, AnySourceOutcome};
use crate::dates::date_today;
use crate::error::ValidationError;
use crate::model::{Report, ReportQuery, SourceName};
use crate::storage::{MeasurementStore, MetadbStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState<S = MetadbStore> {
    pub aggregator: Aggregator<S>,
}

/// A rejected request, rendered as `400 {"error": message}`.
#[derive(Debug)]
pub struct ApiError(ValidationError);

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.0.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

/// Build the router with all endpoints.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: MeasurementStore + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/report", get(get_report::<S>))
        .route("/report/:source", get(get_source_report::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /report - Combined report from all sources.
///
/// # Query Parameters
///
/// - `country` (required): ISO 3166-1 alpha-2 code, e.g. `IQ`
/// - `since` (optional): window start, defaults to one day before `until`
/// - `until` (optional): window end, defaults to now
/// - `asns` (optional): comma-separated ASNs; RIPEstat is skipped without it
///
/// # Response
///
/// ```json
/// {
///     "country": "IQ",
///     "country_name": "Iraq",
///     "since": "2020-02-01T10:00:00",
///     "until": "2020-02-02T10:00:00",
///     "generated_at": "2020-02-02T10:00:03+00:00",
///     "ioda": {"status": "success", "data": {"is_outage": true, "evidence": ["..."], "url": "..."}},
///     "ooni": {"status": "failure", "kind": "configuration", "message": "..."},
///     "ripe": {"status": "skipped", "reason": "no ASNs specified"}
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_report<S: MeasurementStore + Sync>(
    State(state): State<AppState<S>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Report>, ApiError> {
    let request = query.into_request(date_today()).map_err(|e| {
        warn!(error = %e, "Rejected report request");
        e
    })?;

    let report = state.aggregator.report(&request).await;
    info!(
        country = %report.country,
        successful_sources = report.successful_sources(),
        "Report served"
    );
    Ok(Json(report))
}

/// GET /report/:source - Outcome of a single source (`ioda`, `ooni` or `ripe`).
///
/// Takes the same query parameters as `/report`.
#[instrument(skip(state))]
pub async fn get_source_report<S: MeasurementStore + Sync>(
    State(state): State<AppState<S>>,
    Path(source): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AnySourceOutcome>, ApiError> {
    let parsed = source
        .parse::<SourceName>()
        .and_then(|name| Ok((name, query.into_request(date_today())?)));

    let (name, request) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(source = %source, error = %e, "Rejected source request");
            return Err(e.into());
        }
    };

    let outcome = state.aggregator.source(name, &request).await;
    info!(source = %name, country = %request.country, "Source report served");
    Ok(Json(outcome))
}
