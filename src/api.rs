//! JSON API served to the map frontend.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::feed::LiveFeed;
use crate::fetch::FetchError;
use crate::reconcile::{ReconcileError, VehicleReport, reconcile};
use crate::static_data::{RouteIndex, RouteSummary};

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<RouteIndex>,
    pub feed: Arc<LiveFeed>,
}

impl AppState {
    pub fn new(index: RouteIndex, feed: LiveFeed) -> Self {
        Self {
            index: Arc::new(index),
            feed: Arc::new(feed),
        }
    }
}

/// Per-request failure. Rendered as a bare 500; details only go to the log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Query(#[from] QueryRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct VehiclesResponse {
    pub vehicles: Vec<VehicleReport>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/getRoutes", get(get_routes))
        .route("/getVehicles", get(get_vehicles))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

async fn get_routes(State(state): State<AppState>) -> Json<Vec<RouteSummary>> {
    Json(state.index.summaries())
}

async fn get_vehicles(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<VehiclesResponse>, ApiError> {
    vehicles(&state, query)
        .await
        .map(Json)
        .inspect_err(|e| error!(path = uri.path(), error = %e, "Error handling request"))
}

async fn vehicles(
    state: &AppState,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<VehiclesResponse, ApiError> {
    let Query(params) = query?;
    let filter = route_filter(&params);

    let snapshot = state.feed.fetch_snapshot().await?;
    let vehicles = reconcile(&snapshot, &state.index, filter)?;

    Ok(VehiclesResponse { vehicles })
}

/// First `route` parameter, if non-empty. Repeated parameters are not an
/// error; later values are ignored.
fn route_filter(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(name, _)| name == "route")
        .map(|(_, value)| value.as_str())
        .filter(|route| !route.is_empty())
}

async fn health() -> &'static str {
    "OK"
}
