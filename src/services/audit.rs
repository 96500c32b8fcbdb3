use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::audit_log::{self, Entity as AuditLogEntity},
    errors::ServiceError,
};

/// Appends one audit row per mutating action.
///
/// `record` takes the caller's connection, which in every mutating path is
/// the operation's open transaction: the audit row commits or rolls back
/// together with the primary mutation. A failure here is therefore the same
/// storage-failure class as the operation itself, never a separate
/// user-facing error.
pub struct AuditService;

impl AuditService {
    pub async fn record<C: ConnectionTrait>(
        conn: &C,
        actor: &str,
        action: &str,
        resource_type: &str,
        resource_id: Option<Uuid>,
        details: Option<Value>,
    ) -> Result<audit_log::Model, ServiceError> {
        let entry = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            actor: Set(actor.to_string()),
            action: Set(action.to_string()),
            resource_type: Set(resource_type.to_string()),
            resource_id: Set(resource_id),
            details: Set(details),
            ..Default::default()
        };

        entry.insert(conn).await.map_err(ServiceError::DatabaseError)
    }

    /// Most recent audit rows, newest first.
    pub async fn list_recent(
        db: &DbPool,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<audit_log::Model>, ServiceError> {
        AuditLogEntity::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
