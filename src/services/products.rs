use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        invoice_item::{self, Entity as InvoiceItemEntity},
        product::{self, Entity as ProductEntity, ProductStatus, ProductType},
        product_unit::{self, Entity as ProductUnitEntity},
        stock_adjustment::StockAdjustmentReason,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit::AuditService,
    services::inventory::apply_adjustment,
};

/// Request/response types for the product catalog

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "SKU must be between 1 and 100 characters"))]
    pub sku: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,
    pub brand_name: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub markup_percent: Option<Decimal>,
    #[serde(default)]
    pub reorder_level: i64,
    pub product_type: ProductType,
    pub dispense_without_prescription: Option<bool>,
    pub return_policy: Option<String>,
    /// Starting stock in base units, recorded through the stock ledger as
    /// an initial-import adjustment.
    pub initial_quantity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    pub brand_name: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub markup_percent: Option<Decimal>,
    pub reorder_level: Option<i64>,
    pub product_type: Option<ProductType>,
    pub dispense_without_prescription: Option<bool>,
    pub return_policy: Option<String>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductUnitRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Unit name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[validate(range(min = 1, message = "Unit multiplier must be at least 1"))]
    pub multiplier_to_base: i32,
    pub price_per_unit: Decimal,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub brand_name: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub markup_percent: Option<Decimal>,
    pub quantity_on_hand: i64,
    pub reorder_level: i64,
    pub product_type: ProductType,
    pub dispense_without_prescription: bool,
    pub return_policy: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            brand_name: model.brand_name,
            supplier_name: model.supplier_name,
            barcode: model.barcode,
            markup_percent: model.markup_percent,
            quantity_on_hand: model.quantity_on_hand,
            reorder_level: model.reorder_level,
            product_type: model.product_type,
            dispense_without_prescription: model.dispense_without_prescription,
            return_policy: model.return_policy,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductUnitResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub multiplier_to_base: i32,
    pub price_per_unit: Decimal,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<product_unit::Model> for ProductUnitResponse {
    fn from(model: product_unit::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            multiplier_to_base: model.multiplier_to_base,
            price_per_unit: model.price_per_unit,
            is_default: model.is_default,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Filters for listing products.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductFilters {
    /// Substring match on the product name.
    pub name: Option<String>,
    /// Only products with at least this much stock.
    pub min_stock: Option<i64>,
}

/// Product catalog service: product CRUD and sale-unit management.
///
/// `quantity_on_hand` is never written here directly; initial stock goes
/// through the stock ledger like every other change.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
        actor: &str,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        if let Some(initial) = request.initial_quantity {
            if initial < 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Initial quantity cannot be negative (got {})",
                    initial
                )));
            }
        }

        let db = &*self.db_pool;
        let product_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for product creation");
            ServiceError::DatabaseError(e)
        })?;

        let existing = ProductEntity::find()
            .filter(product::Column::Sku.eq(request.sku.clone()))
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A product with SKU '{}' already exists",
                request.sku
            )));
        }

        let product = product::ActiveModel {
            id: Set(product_id),
            sku: Set(request.sku.clone()),
            name: Set(request.name.clone()),
            brand_name: Set(request.brand_name.clone()),
            supplier_name: Set(request.supplier_name.clone()),
            barcode: Set(request.barcode.clone()),
            markup_percent: Set(request.markup_percent),
            quantity_on_hand: Set(0),
            reorder_level: Set(request.reorder_level),
            product_type: Set(request.product_type),
            dispense_without_prescription: Set(request
                .dispense_without_prescription
                .unwrap_or(true)),
            return_policy: Set(request.return_policy.clone()),
            status: Set(ProductStatus::Active),
            ..Default::default()
        };
        let mut product = product.insert(&txn).await.map_err(|e| {
            error!(error = %e, product_id = %product_id, "Failed to insert product");
            ServiceError::DatabaseError(e)
        })?;

        // Seed starting stock through the ledger so the snapshot stays a
        // projection of the adjustment history from the very first unit.
        if let Some(initial) = request.initial_quantity {
            if initial > 0 {
                let (_, updated) = apply_adjustment(
                    &txn,
                    product,
                    initial,
                    StockAdjustmentReason::InitialImport,
                    None,
                    Some("initial stock import".to_string()),
                    actor,
                )
                .await?;
                product = updated;
            }
        }

        AuditService::record(
            &txn,
            actor,
            "CREATE",
            "PRODUCT",
            Some(product_id),
            Some(json!({
                "sku": request.sku,
                "name": request.name,
                "initial_quantity": request.initial_quantity,
            })),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(product_id = %product_id, sku = %product.sku, "Product created");
        self.send_event(Event::ProductCreated(product_id)).await;

        Ok(product.into())
    }

    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
        actor: &str,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let old_name = product.name.clone();
        let mut changed: Vec<&str> = Vec::new();

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = request.name {
            active.name = Set(name);
            changed.push("name");
        }
        if let Some(brand_name) = request.brand_name {
            active.brand_name = Set(Some(brand_name));
            changed.push("brand_name");
        }
        if let Some(supplier_name) = request.supplier_name {
            active.supplier_name = Set(Some(supplier_name));
            changed.push("supplier_name");
        }
        if let Some(barcode) = request.barcode {
            active.barcode = Set(Some(barcode));
            changed.push("barcode");
        }
        if let Some(markup_percent) = request.markup_percent {
            active.markup_percent = Set(Some(markup_percent));
            changed.push("markup_percent");
        }
        if let Some(reorder_level) = request.reorder_level {
            active.reorder_level = Set(reorder_level);
            changed.push("reorder_level");
        }
        if let Some(product_type) = request.product_type {
            active.product_type = Set(product_type);
            changed.push("product_type");
        }
        if let Some(dispense) = request.dispense_without_prescription {
            active.dispense_without_prescription = Set(dispense);
            changed.push("dispense_without_prescription");
        }
        if let Some(return_policy) = request.return_policy {
            active.return_policy = Set(Some(return_policy));
            changed.push("return_policy");
        }
        if let Some(status) = request.status {
            active.status = Set(status);
            changed.push("status");
        }

        let product = active.update(&txn).await.map_err(ServiceError::DatabaseError)?;

        if !changed.is_empty() {
            AuditService::record(
                &txn,
                actor,
                "UPDATE",
                "PRODUCT",
                Some(product_id),
                Some(json!({
                    "old_name": old_name,
                    "new_name": product.name,
                    "changed_fields": changed,
                })),
            )
            .await?;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(product_id = %product_id, "Product updated");
        self.send_event(Event::ProductUpdated(product_id)).await;

        Ok(product.into())
    }

    /// Deletes a product.
    ///
    /// Refused while any invoice item references the product: invoice
    /// history must stay reconstructible. Units and stock adjustments are
    /// owned by the product and go with it.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let referencing_items = InvoiceItemEntity::find()
            .filter(invoice_item::Column::ProductId.eq(product_id))
            .count(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if referencing_items > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product {} ({}) is referenced by {} invoice item(s) and cannot be deleted",
                product_id, product.name, referencing_items
            )));
        }

        AuditService::record(
            &txn,
            actor,
            "DELETE",
            "PRODUCT",
            Some(product_id),
            Some(json!({
                "sku": product.sku,
                "name": product.name,
                "quantity_at_deletion": product.quantity_on_hand,
            })),
        )
        .await?;

        ProductEntity::delete_by_id(product_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(product_id = %product_id, "Product deleted");
        self.send_event(Event::ProductDeleted(product_id)).await;

        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(
        &self,
        product_id: Uuid,
    ) -> Result<Option<ProductResponse>, ServiceError> {
        let db = &*self.db_pool;

        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(product.map(Into::into))
    }

    /// Lists products ordered by name with optional filters.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filters: ProductFilters,
        limit: u64,
        offset: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = ProductEntity::find();
        if let Some(name) = &filters.name {
            query = query.filter(product::Column::Name.contains(name));
        }
        if let Some(min_stock) = filters.min_stock {
            query = query.filter(product::Column::QuantityOnHand.gte(min_stock));
        }

        let total = query
            .clone()
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let products = query
            .order_by_asc(product::Column::Name)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(ProductListResponse {
            products: products.into_iter().map(Into::into).collect(),
            total,
            limit,
            offset,
        })
    }

    /// Products at or below their reorder level, lowest stock first.
    #[instrument(skip(self))]
    pub async fn low_stock_products(&self) -> Result<Vec<ProductResponse>, ServiceError> {
        let db = &*self.db_pool;

        let products = ProductEntity::find()
            .filter(
                Expr::col(product::Column::QuantityOnHand)
                    .lte(Expr::col(product::Column::ReorderLevel)),
            )
            .order_by_asc(product::Column::QuantityOnHand)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(products.into_iter().map(Into::into).collect())
    }

    /// Adds a sale unit to a product.
    ///
    /// Marking the new unit default clears the previous default in the same
    /// transaction, so at most one default survives per product.
    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn add_unit(
        &self,
        product_id: Uuid,
        request: CreateProductUnitRequest,
        actor: &str,
    ) -> Result<ProductUnitResponse, ServiceError> {
        request.validate()?;

        if request.price_per_unit <= Decimal::ZERO {
            return Err(ServiceError::InvalidPrice(format!(
                "Unit price {} must be positive",
                request.price_per_unit
            )));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if request.is_default {
            ProductUnitEntity::update_many()
                .col_expr(product_unit::Column::IsDefault, Expr::value(false))
                .filter(product_unit::Column::ProductId.eq(product_id))
                .filter(product_unit::Column::IsDefault.eq(true))
                .exec(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        let unit = product_unit::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            name: Set(request.name.clone()),
            multiplier_to_base: Set(request.multiplier_to_base),
            price_per_unit: Set(request.price_per_unit),
            is_default: Set(request.is_default),
            ..Default::default()
        };
        let unit = unit.insert(&txn).await.map_err(ServiceError::DatabaseError)?;

        AuditService::record(
            &txn,
            actor,
            "CREATE",
            "PRODUCT_UNIT",
            Some(unit.id),
            Some(json!({
                "product_id": product_id,
                "product_name": product.name,
                "unit_name": request.name,
                "multiplier_to_base": request.multiplier_to_base,
                "is_default": request.is_default,
            })),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(product_id = %product_id, unit_id = %unit.id, "Product unit added");

        Ok(unit.into())
    }

    /// Units of a product, default first, then by name.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_units(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ProductUnitResponse>, ServiceError> {
        let db = &*self.db_pool;

        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if product.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        let units = ProductUnitEntity::find()
            .filter(product_unit::Column::ProductId.eq(product_id))
            .order_by_desc(product_unit::Column::IsDefault)
            .order_by_asc(product_unit::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(units.into_iter().map(Into::into).collect())
    }

    async fn send_event(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send product event");
            }
        }
    }
}
