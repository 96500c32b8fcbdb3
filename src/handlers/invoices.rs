use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::entities::invoice::InvoiceStatus;
use crate::errors::ServiceError;
use crate::handlers::{actor_from_headers, AppState};
use crate::services::invoices::{
    AddInvoiceItemRequest, CancelInvoiceRequest, CreateInvoiceRequest,
};
use crate::ApiResponse;

#[derive(Debug, Deserialize, IntoParams)]
pub struct InvoiceFilters {
    /// Filter by lifecycle status
    pub status: Option<InvoiceStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Create the invoice router
pub fn invoice_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/:id", get(get_invoice))
        .route("/:id/items", post(add_invoice_item))
        .route("/:id/finalize", post(finalize_invoice))
        .route("/:id/cancel", post(cancel_invoice))
}

/// Create a new draft invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created in DRAFT"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let invoice = state.services.invoices.create_invoice(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(invoice))))
}

/// Add an item to a draft invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/items",
    request_body = AddInvoiceItemRequest,
    responses(
        (status = 200, description = "Item added, invoice returned with recomputed total"),
        (status = 400, description = "Invoice not editable, unit mismatch, or invalid price", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice, product, or unit not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn add_invoice_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<AddInvoiceItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let invoice = state.services.invoices.add_item(id, request, &actor).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

/// Finalize a draft invoice, deducting stock for every item
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/finalize",
    responses(
        (status = 200, description = "Invoice finalized, stock deducted"),
        (status = 400, description = "Invoice not a draft or has no items", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn finalize_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let invoice = state.services.invoices.finalize_invoice(id, &actor).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

/// Cancel an invoice, restoring stock when it was finalized
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/cancel",
    request_body = CancelInvoiceRequest,
    responses(
        (status = 200, description = "Invoice cancelled"),
        (status = 400, description = "Invoice already cancelled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    request: Option<Json<CancelInvoiceRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let request = request
        .map(|Json(request)| request)
        .unwrap_or(CancelInvoiceRequest { reason: None });
    let invoice = state
        .services
        .invoices
        .cancel_invoice(id, request, &actor)
        .await?;
    Ok(Json(ApiResponse::success(invoice)))
}

/// Get an invoice with its items and computed total
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    responses(
        (status = 200, description = "Invoice returned"),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state
        .services
        .invoices
        .get_invoice(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", id)))?;
    Ok(Json(ApiResponse::success(invoice)))
}

/// List invoices, newest first
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(InvoiceFilters),
    responses(
        (status = 200, description = "Invoice list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(filters): Query<InvoiceFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let list = state
        .services
        .invoices
        .list_invoices(
            filters.status,
            filters.limit.unwrap_or(50),
            filters.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(ApiResponse::success(list)))
}
