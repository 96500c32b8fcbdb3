use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
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
        invoice::{self, Entity as InvoiceEntity, InvoiceStatus},
        invoice_item::{self, Entity as InvoiceItemEntity},
        product::{self, Entity as ProductEntity},
        product_unit::{self, Entity as ProductUnitEntity},
        stock_adjustment::StockAdjustmentReason,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit::AuditService,
    services::inventory::apply_adjustment,
};

/// Request/response types for the invoice service

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    /// Free-form label of who makes the sale.
    #[validate(length(max = 255, message = "Seller label cannot exceed 255 characters"))]
    pub sold_by_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddInvoiceItemRequest {
    pub product_id: Uuid,
    pub product_unit_id: Uuid,
    /// Quantity in sale units.
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Price per sale unit; falls back to the unit's list price when absent.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelInvoiceRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_unit_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<invoice_item::Model> for InvoiceItemResponse {
    fn from(model: invoice_item::Model) -> Self {
        let line_total = model.line_total();
        Self {
            id: model.id,
            product_id: model.product_id,
            product_unit_id: model.product_unit_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_total,
            created_at: model.created_at,
        }
    }
}

/// Invoice plus its items plus a freshly computed total. The total is never
/// stored; it is recomputed from the items on every read so it cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub sold_by_name: Option<String>,
    pub status: InvoiceStatus,
    pub items: Vec<InvoiceItemResponse>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl InvoiceResponse {
    fn build(invoice: invoice::Model, items: Vec<invoice_item::Model>) -> Self {
        let items: Vec<InvoiceItemResponse> = items.into_iter().map(Into::into).collect();
        let total = items.iter().map(|item| item.line_total).sum();
        Self {
            id: invoice.id,
            sold_by_name: invoice.sold_by_name,
            status: invoice.status,
            items,
            total,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// The invoice lifecycle engine.
///
/// Drives DRAFT → FINALIZED → CANCELLED transitions and coordinates with
/// the stock ledger so the status change and its stock effects commit in
/// one transaction.
#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new invoice in DRAFT with an empty item list.
    #[instrument(skip(self, request))]
    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
        actor: &str,
    ) -> Result<InvoiceResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let invoice_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for invoice creation");
            ServiceError::DatabaseError(e)
        })?;

        let invoice = invoice::ActiveModel {
            id: Set(invoice_id),
            sold_by_name: Set(request.sold_by_name.clone()),
            status: Set(InvoiceStatus::Draft),
            ..Default::default()
        };
        let invoice = invoice.insert(&txn).await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to create invoice");
            ServiceError::DatabaseError(e)
        })?;

        AuditService::record(
            &txn,
            actor,
            "CREATE",
            "INVOICE",
            Some(invoice_id),
            Some(json!({ "sold_by_name": request.sold_by_name })),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(invoice_id = %invoice_id, "Invoice created");
        self.send_event(Event::InvoiceCreated(invoice_id)).await;

        Ok(InvoiceResponse::build(invoice, Vec::new()))
    }

    /// Adds an item to a draft invoice.
    ///
    /// Stock is deliberately not checked or reserved here: all stock checks
    /// are deferred to finalize, so two concurrent drafts may reference more
    /// stock than exists and the race resolves at finalize time (first to
    /// finalize wins).
    #[instrument(skip(self, request), fields(invoice_id = %invoice_id, product_id = %request.product_id))]
    pub async fn add_item(
        &self,
        invoice_id: Uuid,
        request: AddInvoiceItemRequest,
        actor: &str,
    ) -> Result<InvoiceResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to start transaction for add item");
            ServiceError::DatabaseError(e)
        })?;

        // Lock the invoice row so a racing finalize/cancel cannot transition
        // it underneath this insert; the loser of that race fails here.
        let invoice = Self::find_invoice_locked(&txn, invoice_id).await?;

        if !invoice.status.is_editable() {
            return Err(ServiceError::InvalidStatus(format!(
                "Items can only be added to DRAFT invoices (invoice {} is {})",
                invoice_id, invoice.status
            )));
        }

        let product = ProductEntity::find_by_id(request.product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", request.product_id))
            })?;

        let unit = ProductUnitEntity::find_by_id(request.product_unit_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product unit {} not found",
                    request.product_unit_id
                ))
            })?;

        if unit.product_id != product.id {
            return Err(ServiceError::UnitMismatch(format!(
                "Unit {} belongs to product {}, not product {}",
                unit.id, unit.product_id, product.id
            )));
        }

        let unit_price = request.unit_price.unwrap_or(unit.price_per_unit);
        if unit_price <= Decimal::ZERO {
            return Err(ServiceError::InvalidPrice(format!(
                "Effective unit price {} for product {} must be positive",
                unit_price, product.id
            )));
        }

        let item = invoice_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(invoice_id),
            product_id: Set(product.id),
            product_unit_id: Set(unit.id),
            quantity: Set(request.quantity),
            unit_price: Set(unit_price),
            ..Default::default()
        };
        let item = item.insert(&txn).await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to insert invoice item");
            ServiceError::DatabaseError(e)
        })?;

        AuditService::record(
            &txn,
            actor,
            "ADD_ITEM",
            "INVOICE_ITEM",
            Some(item.id),
            Some(json!({
                "invoice_id": invoice_id,
                "product_id": product.id,
                "product_name": product.name,
                "quantity": request.quantity,
                "unit_price": unit_price,
            })),
        )
        .await?;

        let items = Self::load_items(&txn, invoice_id).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(invoice_id = %invoice_id, item_id = %item.id, "Invoice item added");
        self.send_event(Event::InvoiceItemAdded {
            invoice_id,
            item_id: item.id,
            product_id: product.id,
        })
        .await;

        Ok(InvoiceResponse::build(invoice, items))
    }

    /// Finalizes a draft invoice, deducting stock for every item.
    ///
    /// Validation of every item (unit consistency, conversion, and stock
    /// availability, cumulative per product so an invoice holding two items
    /// of the same product cannot pass the check yet overdraw) runs before
    /// any stock is mutated. Only then are the deductions applied, all
    /// inside the same transaction: a failure on any item leaves no stock
    /// mutated for any item.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn finalize_invoice(
        &self,
        invoice_id: Uuid,
        actor: &str,
    ) -> Result<InvoiceResponse, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to start transaction for finalize");
            ServiceError::DatabaseError(e)
        })?;

        let invoice = Self::find_invoice_locked(&txn, invoice_id).await?;

        if invoice.status != InvoiceStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "Only DRAFT invoices can be finalized (invoice {} is {})",
                invoice_id, invoice.status
            )));
        }

        let items = Self::load_items(&txn, invoice_id).await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Invoice {} has no items",
                invoice_id
            )));
        }

        // Validation pass: resolve and lock every product, convert every
        // quantity, and prove sufficient stock for the whole item list.
        // Nothing is written until every item has passed.
        let mut products: HashMap<Uuid, product::Model> = HashMap::new();
        let mut units: HashMap<Uuid, product_unit::Model> = HashMap::new();
        let mut remaining: HashMap<Uuid, i64> = HashMap::new();
        let mut deductions: Vec<(Uuid, i64)> = Vec::with_capacity(items.len());

        for item in &items {
            if !products.contains_key(&item.product_id) {
                let product = ProductEntity::find_by_id(item.product_id)
                    .lock_exclusive()
                    .one(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", item.product_id))
                    })?;
                remaining.insert(product.id, product.quantity_on_hand);
                products.insert(product.id, product);
            }
            if !units.contains_key(&item.product_unit_id) {
                let unit = ProductUnitEntity::find_by_id(item.product_unit_id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Product unit {} not found",
                            item.product_unit_id
                        ))
                    })?;
                units.insert(unit.id, unit);
            }

            let unit = &units[&item.product_unit_id];
            let base_qty = unit.base_quantity(item.product_id, item.quantity)?;

            let available = remaining
                .get_mut(&item.product_id)
                .expect("product loaded above");
            if *available < base_qty {
                let product = &products[&item.product_id];
                return Err(ServiceError::InsufficientStock(format!(
                    "Not enough stock for {} ({}). Available: {}, Required: {}",
                    product.name, product.id, available, base_qty
                )));
            }
            *available -= base_qty;

            deductions.push((item.product_id, base_qty));
        }

        // Mutation pass: every item passed, deduct through the stock ledger.
        for (product_id, base_qty) in deductions {
            let product = products
                .remove(&product_id)
                .expect("product loaded during validation");
            let (_, updated) = apply_adjustment(
                &txn,
                product,
                -base_qty,
                StockAdjustmentReason::SaleFinalize,
                Some(invoice_id.to_string()),
                None,
                actor,
            )
            .await?;
            products.insert(product_id, updated);
        }

        let mut active_invoice: invoice::ActiveModel = invoice.into();
        active_invoice.status = Set(InvoiceStatus::Finalized);
        let invoice = active_invoice
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let response = InvoiceResponse::build(invoice, items);

        AuditService::record(
            &txn,
            actor,
            "FINALIZE",
            "INVOICE",
            Some(invoice_id),
            Some(json!({
                "items_count": response.items.len(),
                "total": response.total,
            })),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to commit finalize transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(invoice_id = %invoice_id, total = %response.total, "Invoice finalized");
        self.send_event(Event::InvoiceFinalized(invoice_id)).await;

        Ok(response)
    }

    /// Cancels an invoice.
    ///
    /// A FINALIZED invoice restores exactly the amount deducted at finalize
    /// (recorded item quantity × unit multiplier, independent of any stock
    /// changes since). A DRAFT invoice never reserved stock, so its item
    /// list is simply discarded. A CANCELLED invoice cannot be cancelled
    /// again.
    #[instrument(skip(self, request), fields(invoice_id = %invoice_id))]
    pub async fn cancel_invoice(
        &self,
        invoice_id: Uuid,
        request: CancelInvoiceRequest,
        actor: &str,
    ) -> Result<InvoiceResponse, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to start transaction for cancel");
            ServiceError::DatabaseError(e)
        })?;

        let invoice = Self::find_invoice_locked(&txn, invoice_id).await?;
        let previous_status = invoice.status;

        let items = match previous_status {
            InvoiceStatus::Cancelled => {
                return Err(ServiceError::InvalidStatus(format!(
                    "Invoice {} is already cancelled",
                    invoice_id
                )));
            }
            InvoiceStatus::Finalized => {
                let items = Self::load_items(&txn, invoice_id).await?;
                self.restore_stock(&txn, invoice_id, &items, actor).await?;
                items
            }
            InvoiceStatus::Draft => {
                // No stock was ever reserved; cancelling a draft discards
                // its item list.
                InvoiceItemEntity::delete_many()
                    .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
                    .exec(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                Vec::new()
            }
        };

        let mut active_invoice: invoice::ActiveModel = invoice.into();
        active_invoice.status = Set(InvoiceStatus::Cancelled);
        let invoice = active_invoice
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        AuditService::record(
            &txn,
            actor,
            "CANCEL",
            "INVOICE",
            Some(invoice_id),
            Some(json!({
                "previous_status": previous_status.to_string(),
                "cancellation_reason": request.reason,
            })),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to commit cancel transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            invoice_id = %invoice_id,
            previous_status = %previous_status,
            "Invoice cancelled"
        );
        self.send_event(Event::InvoiceCancelled {
            invoice_id,
            previous_status: previous_status.to_string(),
        })
        .await;

        Ok(InvoiceResponse::build(invoice, items))
    }

    /// Retrieves an invoice with its items and computed total.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceResponse>, ServiceError> {
        let db = &*self.db_pool;

        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        match invoice {
            Some(invoice) => {
                let items = Self::load_items(db, invoice_id).await?;
                Ok(Some(InvoiceResponse::build(invoice, items)))
            }
            None => Ok(None),
        }
    }

    /// Lists invoices, newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        status: Option<InvoiceStatus>,
        limit: u64,
        offset: u64,
    ) -> Result<InvoiceListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = InvoiceEntity::find();
        if let Some(status) = status {
            query = query.filter(invoice::Column::Status.eq(status));
        }

        let total = query
            .clone()
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let invoices = query
            .order_by_desc(invoice::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut responses = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let items = Self::load_items(db, invoice.id).await?;
            responses.push(InvoiceResponse::build(invoice, items));
        }

        Ok(InvoiceListResponse {
            invoices: responses,
            total,
            limit,
            offset,
        })
    }

    /// Restore stock for every item of a finalized invoice being cancelled.
    ///
    /// The restored amount is the recorded quantity × the unit's multiplier,
    /// the exact amount finalize deducted; current stock is never consulted.
    async fn restore_stock(
        &self,
        txn: &DatabaseTransaction,
        invoice_id: Uuid,
        items: &[invoice_item::Model],
        actor: &str,
    ) -> Result<(), ServiceError> {
        let mut products: HashMap<Uuid, product::Model> = HashMap::new();

        for item in items {
            if !products.contains_key(&item.product_id) {
                let product = ProductEntity::find_by_id(item.product_id)
                    .lock_exclusive()
                    .one(txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", item.product_id))
                    })?;
                products.insert(product.id, product);
            }

            let unit = ProductUnitEntity::find_by_id(item.product_unit_id)
                .one(txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Product unit {} not found",
                        item.product_unit_id
                    ))
                })?;

            let base_qty = unit.base_quantity(item.product_id, item.quantity)?;

            let product = products
                .remove(&item.product_id)
                .expect("product loaded above");
            let (_, updated) = apply_adjustment(
                txn,
                product,
                base_qty,
                StockAdjustmentReason::SaleCancelRestore,
                Some(invoice_id.to_string()),
                None,
                actor,
            )
            .await?;
            products.insert(item.product_id, updated);
        }

        Ok(())
    }

    async fn find_invoice_locked(
        txn: &DatabaseTransaction,
        invoice_id: Uuid,
    ) -> Result<invoice::Model, ServiceError> {
        InvoiceEntity::find_by_id(invoice_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))
    }

    /// Items of an invoice in insertion order.
    async fn load_items<C: ConnectionTrait>(
        conn: &C,
        invoice_id: Uuid,
    ) -> Result<Vec<invoice_item::Model>, ServiceError> {
        InvoiceItemEntity::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_item::Column::CreatedAt)
            .order_by_asc(invoice_item::Column::Id)
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn send_event(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send invoice event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: i32, unit_price: Decimal) -> invoice_item::Model {
        invoice_item::Model {
            id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_unit_id: Uuid::new_v4(),
            quantity,
            unit_price,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn response_total_is_sum_of_line_totals() {
        let invoice = invoice::Model {
            id: Uuid::new_v4(),
            sold_by_name: Some("front desk".to_string()),
            status: InvoiceStatus::Draft,
            created_at: Utc::now(),
            updated_at: None,
        };

        let response = InvoiceResponse::build(
            invoice,
            vec![item(2, dec!(10.00)), item(3, dec!(1.50))],
        );

        assert_eq!(response.total, dec!(24.50));
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].line_total, dec!(20.00));
        assert_eq!(response.items[1].line_total, dec!(4.50));
    }

    #[test]
    fn response_total_of_empty_invoice_is_zero() {
        let invoice = invoice::Model {
            id: Uuid::new_v4(),
            sold_by_name: None,
            status: InvoiceStatus::Draft,
            created_at: Utc::now(),
            updated_at: None,
        };

        let response = InvoiceResponse::build(invoice, Vec::new());
        assert_eq!(response.total, Decimal::ZERO);
    }
}
