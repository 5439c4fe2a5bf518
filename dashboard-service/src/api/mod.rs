//! JSON query API over the frozen snapshot.
//!
//! Every query route names its view in the path (`table`, `usage`,
//! `emission`, `totals`, `intensity`, `recent`). Invalid queries answer
//! `400` with `{"error": "..."}`.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use energy_client::{
    domain::{Category, Period, Value},
    query::{
        category_values, resolve_metrics, rollup_by_category, source_breakdown, summarize, trend,
        Aggregation, BreakdownPoint, CategoryFilter, CategoryGroup, Summary, TrendPoint,
    },
    QueryError, TablePage, TableRequest, View, ViewKind,
};
use serde::{Deserialize, Serialize};

use crate::sinks::{Snapshot, SnapshotInfo};

/// Shared, read-only state behind every handler.
pub struct ApiState {
    pub snapshot: Arc<Snapshot>,
    pub heading: String,
    pub max_page_size: usize,
}

impl ApiState {
    fn view(&self, name: &str) -> Result<&View, QueryError> {
        let kind: ViewKind = name.parse()?;
        Ok(self.snapshot.dataset().view(kind))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("invalid JSON body: {0}")]
    Body(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.to_string() };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::Body(e.body_text()))
}

/// Count, time and log one query.
fn observe<T>(
    route: &'static str,
    query: impl FnOnce() -> Result<T, ApiError>,
) -> Result<Json<T>, ApiError> {
    metrics::counter!("api_requests_total", "route" => route).increment(1);
    let started = Instant::now();
    let res = query();
    metrics::histogram!("api_query_latency_seconds").record(started.elapsed().as_secs_f64());

    match res {
        Ok(v) => Ok(Json(v)),
        Err(e) => {
            metrics::counter!("api_query_errors_total").increment(1);
            tracing::warn!(route, error = %e, "query rejected");
            Err(e)
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/views/:view/table", post(table))
        .route("/views/:view/categories/:dimension", get(categories))
        .route("/views/:view/summary", post(summary))
        .route("/views/:view/rollup", post(rollup))
        .route("/views/:view/trend", post(trend_points))
        .with_state(state)
}

async fn health(State(state): State<Arc<ApiState>>) -> Json<SnapshotInfo> {
    metrics::counter!("api_requests_total", "route" => "health").increment(1);
    Json(state.snapshot.info())
}

async fn table(
    State(state): State<Arc<ApiState>>,
    Path(view): Path<String>,
    payload: Result<Json<TableRequest>, JsonRejection>,
) -> Result<Json<TablePage>, ApiError> {
    observe("table", || {
        let request = body(payload)?;
        if request.page_size > state.max_page_size {
            return Err(QueryError::InvalidRequest(format!(
                "page_size {} exceeds the limit of {}",
                request.page_size, state.max_page_size
            ))
            .into());
        }
        let view = state.view(&view)?;
        Ok(request.execute(view, &state.heading)?)
    })
}

async fn categories(
    State(state): State<Arc<ApiState>>,
    Path((view, dimension)): Path<(String, String)>,
) -> Result<Json<Vec<Value>>, ApiError> {
    observe("categories", || {
        let view = state.view(&view)?;
        let dimension = Category::from_name(&dimension)
            .ok_or_else(|| QueryError::InvalidRequest(format!("unknown category '{dimension}'")))?;
        Ok(category_values(view, dimension))
    })
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(default = "Period::all")]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub category: Option<CategoryFilter>,
}

async fn summary(
    State(state): State<Arc<ApiState>>,
    Path(view): Path<String>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<Summary>, ApiError> {
    observe("summary", || {
        let request = body(payload)?;
        let view = state.view(&view)?;
        Ok(summarize(view, &request.periods, request.category.as_ref()))
    })
}

fn default_aggregation() -> Aggregation {
    Aggregation::Sum
}

#[derive(Debug, Deserialize)]
pub struct RollupRequest {
    #[serde(default = "Period::all")]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub category: Option<CategoryFilter>,
    pub dimension: Category,
    pub metrics: Vec<String>,
    #[serde(default = "default_aggregation")]
    pub aggregation: Aggregation,
}

async fn rollup(
    State(state): State<Arc<ApiState>>,
    Path(view): Path<String>,
    payload: Result<Json<RollupRequest>, JsonRejection>,
) -> Result<Json<Vec<CategoryGroup>>, ApiError> {
    observe("rollup", || {
        let request = body(payload)?;
        let view = state.view(&view)?;
        let metrics = resolve_metrics(view, &request.metrics)?;
        Ok(rollup_by_category(
            view,
            &request.periods,
            request.category.as_ref(),
            request.dimension,
            &metrics,
            request.aggregation,
        ))
    })
}

#[derive(Debug, Deserialize)]
pub struct TrendRequest {
    #[serde(default)]
    pub category: Option<CategoryFilter>,
    #[serde(default)]
    pub split: Option<Category>,
    pub metrics: Vec<String>,
    #[serde(default = "default_aggregation")]
    pub aggregation: Aggregation,
    /// Melt the result into one point per (year, metric).
    #[serde(default)]
    pub breakdown: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TrendResponse {
    Points(Vec<TrendPoint>),
    Breakdown(Vec<BreakdownPoint>),
}

async fn trend_points(
    State(state): State<Arc<ApiState>>,
    Path(view): Path<String>,
    payload: Result<Json<TrendRequest>, JsonRejection>,
) -> Result<Json<TrendResponse>, ApiError> {
    observe("trend", || {
        let request = body(payload)?;
        let view = state.view(&view)?;
        let metrics = resolve_metrics(view, &request.metrics)?;
        let points = trend(
            view,
            request.category.as_ref(),
            request.split,
            &metrics,
            request.aggregation,
        );
        Ok(if request.breakdown {
            TrendResponse::Breakdown(source_breakdown(&points, &metrics))
        } else {
            TrendResponse::Points(points)
        })
    })
}
