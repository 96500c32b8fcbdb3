//! PharmaPOS API Library
//!
//! Pharmacy inventory and point-of-sale invoicing: products with
//! unit-of-sale conversions, a stock ledger with an append-only adjustment
//! trail, and invoices that move stock atomically through a
//! DRAFT → FINALIZED → CANCELLED lifecycle.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Full v1 API surface: invoices, products, inventory.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/invoices", handlers::invoices::invoice_router())
        .nest("/products", handlers::products::product_router())
        .nest("/inventory", handlers::inventory::inventory_router())
}
