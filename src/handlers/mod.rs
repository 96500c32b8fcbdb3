pub mod health;
pub mod inventory;
pub mod invoices;
pub mod products;

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    inventory::InventoryService, invoices::InvoiceService, products::ProductService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub inventory: Arc<InventoryService>,
    pub invoices: Arc<InvoiceService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            products: Arc::new(ProductService::new(db_pool.clone(), event_sender.clone())),
            inventory: Arc::new(InventoryService::new(db_pool.clone(), event_sender.clone())),
            invoices: Arc::new(InvoiceService::new(db_pool, event_sender)),
        }
    }
}

/// Actor identity for audit attribution, taken from the `X-Actor` header.
/// The HTTP layer owns authentication; the core only needs a label.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| "system".to_string())
}
