//! API Routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::bin_registry::{CreateBinRequest, SetFillLevelRequest, SetStatusRequest};
use crate::collection::ApplyCollectionRequest;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Bins
        .route("/api/bins", get(list_bins))
        .route("/api/bins", post(create_bin))
        .route("/api/bins/:id", get(get_bin))
        .route("/api/bins/:id/fill-level", patch(set_fill_level))
        .route("/api/bins/:id/status", put(set_status))
        // Scan resolution (percent-encoded payload or bare code)
        .route("/api/bins/qr/:code", get(resolve_scan))
        // Collections
        .route("/api/bins/collect", post(apply_collection))
        .route("/api/bins/:id/collections", get(list_collections))
        .with_state(state)
}

async fn list_bins(State(state): State<AppState>) -> impl IntoResponse {
    match state.bin_registry.list_bins().await {
        Ok(bins) => Json(ApiResponse::success(bins)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn create_bin(
    State(state): State<AppState>,
    Json(req): Json<CreateBinRequest>,
) -> impl IntoResponse {
    match state.bin_registry.create_bin(req).await {
        Ok(bin) => Json(ApiResponse::success(bin)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_bin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.bin_registry.get_bin(&id).await {
        Ok(bin) => Json(ApiResponse::success(bin)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn set_fill_level(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetFillLevelRequest>,
) -> impl IntoResponse {
    match state.bin_registry.set_fill_level(&id, req.fill_level).await {
        Ok(bin) => Json(ApiResponse::success(bin)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> impl IntoResponse {
    match state.bin_registry.set_status(&id, req.status).await {
        Ok(bin) => Json(ApiResponse::success(bin)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Resolve a scanned or typed string to its bin
///
/// Accepts the full QR payload (percent-encoded) or a bare human code.
async fn resolve_scan(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let scan = state.resolver.resolve(&code).await;
    match scan.into_result(&code) {
        Ok(bin) => Json(ApiResponse::success(bin)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn apply_collection(
    State(state): State<AppState>,
    Json(req): Json<ApplyCollectionRequest>,
) -> impl IntoResponse {
    match state.collection.apply_collection(req).await {
        Ok(record) => Json(ApiResponse::success(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// History query parameters
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn list_collections(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).min(500);
    match state.collection.history(&id, limit).await {
        Ok(records) => Json(ApiResponse::success(records)).into_response(),
        Err(e) => e.into_response(),
    }
}
