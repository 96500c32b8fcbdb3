use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Why stock changed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAdjustmentReason {
    #[sea_orm(string_value = "INITIAL_IMPORT")]
    #[strum(serialize = "INITIAL_IMPORT")]
    InitialImport,
    #[sea_orm(string_value = "MANUAL_ADJUSTMENT")]
    #[strum(serialize = "MANUAL_ADJUSTMENT")]
    ManualAdjustment,
    #[sea_orm(string_value = "SALE_FINALIZE")]
    #[strum(serialize = "SALE_FINALIZE")]
    SaleFinalize,
    #[sea_orm(string_value = "SALE_CANCEL_RESTORE")]
    #[strum(serialize = "SALE_CANCEL_RESTORE")]
    SaleCancelRestore,
}

/// Append-only stock ledger row. One row per change to a product's
/// `quantity_on_hand`, written in the same transaction as the snapshot
/// update. Never updated or deleted: the ledger is the durable record from
/// which the snapshot can be reconstructed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_adjustments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,

    /// Signed change in base units; positive increases stock.
    pub change_qty: i64,

    pub reason: StockAdjustmentReason,

    /// External reference, e.g. the invoice id for sale adjustments.
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
