use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::{actor_from_headers, AppState};
use crate::services::inventory::AdjustStockCommand;
use crate::ApiResponse;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdjustmentListParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub product_id: Uuid,
    pub quantity_on_hand: i64,
}

/// Create the inventory router
pub fn inventory_router() -> Router<AppState> {
    Router::new()
        .route("/adjust", post(adjust_stock))
        .route("/:product_id", get(stock_snapshot))
        .route("/:product_id/adjustments", get(list_adjustments))
}

/// Manually adjust a product's stock by a signed amount of base units
#[utoipa::path(
    post,
    path = "/api/v1/inventory/adjust",
    request_body = AdjustStockCommand,
    responses(
        (status = 200, description = "Stock adjusted; adjustment row and updated product returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Adjustment would drive stock negative", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(command): Json<AdjustStockCommand>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let (adjustment, product) = state
        .services
        .inventory
        .adjust_stock(command, &actor)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "adjustment": adjustment,
        "product": product,
    }))))
}

/// Read-only stock snapshot for a product
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}",
    responses(
        (status = 200, description = "Snapshot returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn stock_snapshot(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let quantity_on_hand = state.services.inventory.snapshot(product_id).await?;
    Ok(Json(ApiResponse::success(SnapshotResponse {
        product_id,
        quantity_on_hand,
    })))
}

/// Adjustment history for a product, newest first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}/adjustments",
    params(AdjustmentListParams),
    responses(
        (status = 200, description = "Adjustment history returned")
    ),
    tag = "inventory"
)]
pub async fn list_adjustments(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<AdjustmentListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let adjustments = state
        .services
        .inventory
        .list_adjustments(
            product_id,
            params.limit.unwrap_or(50),
            params.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(ApiResponse::success(adjustments)))
}
