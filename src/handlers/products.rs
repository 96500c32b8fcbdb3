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

use crate::errors::ServiceError;
use crate::handlers::{actor_from_headers, AppState};
use crate::services::products::{
    CreateProductRequest, CreateProductUnitRequest, ProductFilters, UpdateProductRequest,
};
use crate::ApiResponse;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListParams {
    /// Substring match on the product name
    pub name: Option<String>,
    /// Only products with at least this much stock
    pub min_stock: Option<i64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Create the product router
pub fn product_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/low-stock", get(low_stock_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/units", post(add_product_unit).get(list_product_units))
}

/// Create a product, optionally seeding initial stock through the ledger
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let product = state.services.products.create_product(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// List products ordered by name
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "Product list returned")
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let filters = ProductFilters {
        name: params.name,
        min_stock: params.min_stock,
    };
    let list = state
        .services
        .products
        .list_products(filters, params.limit.unwrap_or(50), params.offset.unwrap_or(0))
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

/// Products at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses(
        (status = 200, description = "Low-stock products returned, lowest first")
    ),
    tag = "products"
)]
pub async fn low_stock_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.products.low_stock_products().await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    responses(
        (status = 200, description = "Product returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .products
        .get_product(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
    Ok(Json(ApiResponse::success(product)))
}

/// Update a product's descriptive fields (never its stock snapshot)
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let product = state
        .services
        .products
        .update_product(id, request, &actor)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Delete a product without invoice history
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product has invoice history", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    state.services.products.delete_product(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a sale unit to a product
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/units",
    request_body = CreateProductUnitRequest,
    responses(
        (status = 201, description = "Unit created"),
        (status = 400, description = "Invalid multiplier or price", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn add_product_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CreateProductUnitRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    let unit = state.services.products.add_unit(id, request, &actor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(unit))))
}

/// List the sale units of a product, default first
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/units",
    responses(
        (status = 200, description = "Units returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_product_units(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let units = state.services.products.list_units(id).await?;
    Ok(Json(ApiResponse::success(units)))
}
