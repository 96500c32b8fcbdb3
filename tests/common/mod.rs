// Shared across test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use pharmapos_api::{
    db::{self, DbConfig, DbPool},
    entities::product::ProductType,
    handlers::AppServices,
    services::products::{CreateProductRequest, CreateProductUnitRequest, ProductResponse, ProductUnitResponse},
};

pub const ACTOR: &str = "test-suite";

/// Test harness: an in-memory SQLite database with migrations applied and
/// the full service layer wired against it.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single pooled connection keeps every handle on the same
        // in-memory database.
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&config)
            .await
            .expect("database connection");
        db::run_migrations(&pool).await.expect("migrations");

        let db = Arc::new(pool);
        let services = AppServices::new(db.clone(), None);

        Self { db, services }
    }

    /// Seed a product with the given starting stock (base units).
    pub async fn seed_product(&self, sku: &str, initial_quantity: i64) -> ProductResponse {
        self.services
            .products
            .create_product(
                CreateProductRequest {
                    sku: sku.to_string(),
                    name: format!("Product {}", sku),
                    brand_name: None,
                    supplier_name: None,
                    barcode: None,
                    markup_percent: None,
                    reorder_level: 0,
                    product_type: ProductType::Medical,
                    dispense_without_prescription: None,
                    return_policy: None,
                    initial_quantity: Some(initial_quantity),
                },
                ACTOR,
            )
            .await
            .expect("seed product")
    }

    /// Seed a sale unit for a product.
    pub async fn seed_unit(
        &self,
        product_id: Uuid,
        multiplier_to_base: i32,
        price_per_unit: Decimal,
    ) -> ProductUnitResponse {
        self.services
            .products
            .add_unit(
                product_id,
                CreateProductUnitRequest {
                    name: format!("pack of {}", multiplier_to_base),
                    multiplier_to_base,
                    price_per_unit,
                    is_default: true,
                },
                ACTOR,
            )
            .await
            .expect("seed unit")
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i64 {
        self.services
            .inventory
            .snapshot(product_id)
            .await
            .expect("stock snapshot")
    }
}
