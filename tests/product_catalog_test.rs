//! Product catalog tests: CRUD, delete refusal with invoice history,
//! filters, low stock, and the single-default unit rule.

mod common;

use assert_matches::assert_matches;
use common::{TestApp, ACTOR};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use pharmapos_api::{
    entities::{product_unit, stock_adjustment},
    errors::ServiceError,
    services::invoices::{AddInvoiceItemRequest, CreateInvoiceRequest},
    services::products::{
        CreateProductRequest, CreateProductUnitRequest, ProductFilters, UpdateProductRequest,
    },
};

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let app = TestApp::new().await;
    app.seed_product("DUP-SKU", 0).await;

    let err = app
        .services
        .products
        .create_product(
            CreateProductRequest {
                sku: "DUP-SKU".to_string(),
                name: "Another product".to_string(),
                brand_name: None,
                supplier_name: None,
                barcode: None,
                markup_percent: None,
                reorder_level: 0,
                product_type: pharmapos_api::entities::product::ProductType::Medical,
                dispense_without_prescription: None,
                return_policy: None,
                initial_quantity: None,
            },
            ACTOR,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn update_changes_descriptive_fields_only() {
    let app = TestApp::new().await;
    let product = app.seed_product("UPD", 10).await;

    let updated = app
        .services
        .products
        .update_product(
            product.id,
            UpdateProductRequest {
                name: Some("Renamed".to_string()),
                brand_name: Some("BrandCo".to_string()),
                supplier_name: None,
                barcode: None,
                markup_percent: None,
                reorder_level: Some(3),
                product_type: None,
                dispense_without_prescription: None,
                return_policy: None,
                status: None,
            },
            ACTOR,
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.brand_name.as_deref(), Some("BrandCo"));
    assert_eq!(updated.reorder_level, 3);
    // Stock is untouched by updates.
    assert_eq!(updated.quantity_on_hand, 10);
}

#[tokio::test]
async fn delete_without_history_removes_units_and_adjustments() {
    let app = TestApp::new().await;
    let product = app.seed_product("DEL-OK", 20).await;
    app.seed_unit(product.id, 10, dec!(1.00)).await;

    app.services
        .products
        .delete_product(product.id, ACTOR)
        .await
        .unwrap();

    assert!(app
        .services
        .products
        .get_product(product.id)
        .await
        .unwrap()
        .is_none());

    // Owned children went with the product.
    let units = product_unit::Entity::find()
        .filter(product_unit::Column::ProductId.eq(product.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(units.is_empty());
    let adjustments = stock_adjustment::Entity::find()
        .filter(stock_adjustment::Column::ProductId.eq(product.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(adjustments.is_empty());
}

#[tokio::test]
async fn delete_with_invoice_history_is_refused() {
    let app = TestApp::new().await;
    let product = app.seed_product("DEL-REF", 50).await;
    let unit = app.seed_unit(product.id, 1, dec!(1.00)).await;

    let invoice = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest { sold_by_name: None }, ACTOR)
        .await
        .unwrap();
    app.services
        .invoices
        .add_item(
            invoice.id,
            AddInvoiceItemRequest {
                product_id: product.id,
                product_unit_id: unit.id,
                quantity: 1,
                unit_price: None,
            },
            ACTOR,
        )
        .await
        .unwrap();

    let err = app
        .services
        .products
        .delete_product(product.id, ACTOR)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    // Nothing was deleted.
    assert!(app
        .services
        .products
        .get_product(product.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn list_filters_by_name_and_min_stock() {
    let app = TestApp::new().await;
    app.seed_product("AMOX-250", 5).await;
    app.seed_product("AMOX-500", 50).await;
    app.seed_product("IBU-400", 50).await;

    let by_name = app
        .services
        .products
        .list_products(
            ProductFilters {
                name: Some("AMOX".to_string()),
                min_stock: None,
            },
            50,
            0,
        )
        .await
        .unwrap();
    assert_eq!(by_name.total, 2);

    let stocked = app
        .services
        .products
        .list_products(
            ProductFilters {
                name: Some("AMOX".to_string()),
                min_stock: Some(10),
            },
            50,
            0,
        )
        .await
        .unwrap();
    assert_eq!(stocked.total, 1);
    assert_eq!(stocked.products[0].sku, "AMOX-500");
}

#[tokio::test]
async fn low_stock_lists_products_at_or_below_reorder_level() {
    let app = TestApp::new().await;

    let low = app.seed_product("LOW", 2).await;
    app.services
        .products
        .update_product(
            low.id,
            UpdateProductRequest {
                name: None,
                brand_name: None,
                supplier_name: None,
                barcode: None,
                markup_percent: None,
                reorder_level: Some(5),
                product_type: None,
                dispense_without_prescription: None,
                return_policy: None,
                status: None,
            },
            ACTOR,
        )
        .await
        .unwrap();

    let fine = app.seed_product("FINE", 100).await;
    assert_eq!(fine.reorder_level, 0);

    let report = app.services.products.low_stock_products().await.unwrap();
    let skus: Vec<&str> = report.iter().map(|p| p.sku.as_str()).collect();
    assert!(skus.contains(&"LOW"));
    assert!(!skus.contains(&"FINE"));
}

#[tokio::test]
async fn at_most_one_default_unit_per_product() {
    let app = TestApp::new().await;
    let product = app.seed_product("UNITS", 100).await;

    let first = app.seed_unit(product.id, 1, dec!(1.00)).await;
    assert!(first.is_default);

    let second = app
        .services
        .products
        .add_unit(
            product.id,
            CreateProductUnitRequest {
                name: "box of 10".to_string(),
                multiplier_to_base: 10,
                price_per_unit: dec!(9.00),
                is_default: true,
            },
            ACTOR,
        )
        .await
        .unwrap();
    assert!(second.is_default);

    let units = app.services.products.list_units(product.id).await.unwrap();
    let defaults: Vec<_> = units.iter().filter(|u| u.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second.id);
}

#[tokio::test]
async fn unit_validation_rejects_bad_multiplier_and_price() {
    let app = TestApp::new().await;
    let product = app.seed_product("BAD-UNIT", 0).await;

    let err = app
        .services
        .products
        .add_unit(
            product.id,
            CreateProductUnitRequest {
                name: "empty box".to_string(),
                multiplier_to_base: 0,
                price_per_unit: dec!(1.00),
                is_default: false,
            },
            ACTOR,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .products
        .add_unit(
            product.id,
            CreateProductUnitRequest {
                name: "free box".to_string(),
                multiplier_to_base: 10,
                price_per_unit: dec!(0.00),
                is_default: false,
            },
            ACTOR,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidPrice(_));

    let err = app
        .services
        .products
        .add_unit(
            uuid::Uuid::new_v4(),
            CreateProductUnitRequest {
                name: "orphan box".to_string(),
                multiplier_to_base: 10,
                price_per_unit: dec!(1.00),
                is_default: false,
            },
            ACTOR,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
