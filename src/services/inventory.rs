use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        product::{self, Entity as ProductEntity},
        stock_adjustment::{self, Entity as StockAdjustmentEntity, StockAdjustmentReason},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit::AuditService,
    services::products::ProductResponse,
};

/// Request to change a product's stock by a signed amount of base units.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustStockCommand {
    pub product_id: Uuid,
    /// Signed change in base units; positive increases stock.
    pub change_qty: i64,
    pub reason: StockAdjustmentReason,
    pub reference: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockAdjustmentResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub change_qty: i64,
    pub reason: StockAdjustmentReason,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<stock_adjustment::Model> for StockAdjustmentResponse {
    fn from(model: stock_adjustment::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            change_qty: model.change_qty,
            reason: model.reason,
            reference: model.reference,
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

/// The stock ledger.
///
/// Owns the authoritative `quantity_on_hand` snapshot per product. Every
/// change goes through [`apply_adjustment`], which writes the new snapshot
/// and appends the adjustment row in the same unit of work; no other code
/// path writes `quantity_on_hand`.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

/// Update a product's stock snapshot and append the matching ledger row.
///
/// `product` must be the row as currently visible to `conn` (callers lock it
/// first). Fails with `NegativeStock` before writing anything when the
/// change would drive the snapshot below zero. Returns the adjustment row
/// and the updated product so callers chaining several adjustments in one
/// transaction keep an accurate view.
pub(crate) async fn apply_adjustment<C: ConnectionTrait>(
    conn: &C,
    product: product::Model,
    change_qty: i64,
    reason: StockAdjustmentReason,
    reference: Option<String>,
    note: Option<String>,
    actor: &str,
) -> Result<(stock_adjustment::Model, product::Model), ServiceError> {
    let old_quantity = product.quantity_on_hand;
    let new_quantity = old_quantity + change_qty;

    if new_quantity < 0 {
        return Err(ServiceError::NegativeStock(format!(
            "Cannot adjust stock of product {} ({}) by {}: only {} on hand",
            product.id, product.name, change_qty, old_quantity
        )));
    }

    let product_id = product.id;
    let product_name = product.name.clone();

    let mut active_product: product::ActiveModel = product.into();
    active_product.quantity_on_hand = Set(new_quantity);
    let updated_product = active_product
        .update(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    let adjustment = stock_adjustment::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        change_qty: Set(change_qty),
        reason: Set(reason),
        reference: Set(reference.clone()),
        note: Set(note),
        created_by: Set(Some(actor.to_string())),
        ..Default::default()
    };
    let adjustment = adjustment
        .insert(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    AuditService::record(
        conn,
        actor,
        "ADJUST_STOCK",
        "PRODUCT",
        Some(product_id),
        Some(json!({
            "product_name": product_name,
            "change_qty": change_qty,
            "reason": reason.to_string(),
            "old_quantity": old_quantity,
            "new_quantity": new_quantity,
            "reference": reference,
        })),
    )
    .await?;

    Ok((adjustment, updated_product))
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Manually adjusts a product's stock.
    ///
    /// The snapshot read, the snapshot write, and the appended adjustment
    /// row happen in one transaction with the product row locked, so
    /// concurrent adjusters of the same product serialize.
    #[instrument(skip(self, command), fields(product_id = %command.product_id, change_qty = %command.change_qty))]
    pub async fn adjust_stock(
        &self,
        command: AdjustStockCommand,
        actor: &str,
    ) -> Result<(StockAdjustmentResponse, ProductResponse), ServiceError> {
        if command.change_qty == 0 {
            return Err(ServiceError::ValidationError(
                "Stock adjustment change quantity cannot be zero".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for stock adjustment");
            ServiceError::DatabaseError(e)
        })?;

        let product = ProductEntity::find_by_id(command.product_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", command.product_id))
            })?;

        let (adjustment, updated_product) = apply_adjustment(
            &txn,
            product,
            command.change_qty,
            command.reason,
            command.reference.clone(),
            command.note.clone(),
            actor,
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, product_id = %command.product_id, "Failed to commit stock adjustment");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            product_id = %command.product_id,
            change_qty = %command.change_qty,
            new_quantity = %updated_product.quantity_on_hand,
            "Stock adjusted"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::StockAdjusted {
                    product_id: command.product_id,
                    change_qty: command.change_qty,
                    new_quantity: updated_product.quantity_on_hand,
                    reason: command.reason.to_string(),
                    adjustment_id: adjustment.id,
                })
                .await
            {
                warn!(error = %e, product_id = %command.product_id, "Failed to send stock adjusted event");
            }
        }

        Ok((adjustment.into(), updated_product.into()))
    }

    /// Read-only stock snapshot for a product.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        let db = &*self.db_pool;

        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        Ok(product.quantity_on_hand)
    }

    /// Adjustment history for a product, newest first.
    #[instrument(skip(self))]
    pub async fn list_adjustments(
        &self,
        product_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<StockAdjustmentResponse>, ServiceError> {
        let db = &*self.db_pool;

        let adjustments = StockAdjustmentEntity::find()
            .filter(stock_adjustment::Column::ProductId.eq(product_id))
            .order_by_desc(stock_adjustment::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(adjustments.into_iter().map(Into::into).collect())
    }
}
