use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;

/// Sale unit for a product, e.g. "box of 10" over a base unit of one tablet.
///
/// `multiplier_to_base` says how many base units one sale unit represents.
/// At most one unit per product is marked default; the default's price is
/// used when an invoice item does not carry an explicit price.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "product_units")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Unit name must be between 1 and 100 characters"
    ))]
    pub name: String,

    /// How many base units one sale unit represents. Always >= 1.
    #[validate(range(min = 1, message = "Unit multiplier must be at least 1"))]
    pub multiplier_to_base: i32,

    pub price_per_unit: Decimal,

    pub is_default: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::invoice_item::Entity")]
    InvoiceItems,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::invoice_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceItems.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.is_default {
                active_model.is_default = Set(false);
            }
            active_model.created_at = Set(Utc::now());
        }

        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}

impl Model {
    /// Convert a sale quantity in this unit into base units.
    ///
    /// Fails when the unit does not belong to `product_id`; that check runs
    /// before any caller touches stock.
    pub fn base_quantity(&self, product_id: Uuid, quantity: i32) -> Result<i64, ServiceError> {
        if self.product_id != product_id {
            return Err(ServiceError::UnitMismatch(format!(
                "Unit {} belongs to product {}, not product {}",
                self.id, self.product_id, product_id
            )));
        }
        Ok(quantity as i64 * self.multiplier_to_base as i64)
    }
}
