//! Stock ledger tests: snapshot/ledger consistency, negative-stock refusal,
//! and adjustment history.

mod common;

use assert_matches::assert_matches;
use common::{TestApp, ACTOR};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use pharmapos_api::{
    entities::stock_adjustment::{self, StockAdjustmentReason},
    errors::ServiceError,
    services::inventory::AdjustStockCommand,
    services::invoices::{AddInvoiceItemRequest, CancelInvoiceRequest, CreateInvoiceRequest},
};

fn adjust(product_id: Uuid, change_qty: i64) -> AdjustStockCommand {
    AdjustStockCommand {
        product_id,
        change_qty,
        reason: StockAdjustmentReason::ManualAdjustment,
        reference: None,
        note: None,
    }
}

async fn ledger_sum(app: &TestApp, product_id: Uuid) -> i64 {
    stock_adjustment::Entity::find()
        .filter(stock_adjustment::Column::ProductId.eq(product_id))
        .all(&*app.db)
        .await
        .unwrap()
        .iter()
        .map(|row| row.change_qty)
        .sum()
}

#[tokio::test]
async fn adjust_updates_snapshot_and_appends_ledger_row() {
    let app = TestApp::new().await;
    let product = app.seed_product("ADJ-1", 0).await;

    let (adjustment, updated) = app
        .services
        .inventory
        .adjust_stock(adjust(product.id, 25), ACTOR)
        .await
        .unwrap();

    assert_eq!(adjustment.change_qty, 25);
    assert_eq!(adjustment.reason, StockAdjustmentReason::ManualAdjustment);
    assert_eq!(adjustment.created_by.as_deref(), Some(ACTOR));
    assert_eq!(updated.quantity_on_hand, 25);
    assert_eq!(app.stock_of(product.id).await, 25);

    let (_, updated) = app
        .services
        .inventory
        .adjust_stock(adjust(product.id, -10), ACTOR)
        .await
        .unwrap();
    assert_eq!(updated.quantity_on_hand, 15);
    assert_eq!(ledger_sum(&app, product.id).await, 15);
}

#[tokio::test]
async fn negative_result_is_refused_without_partial_write() {
    let app = TestApp::new().await;
    let product = app.seed_product("ADJ-NEG", 10).await;

    let err = app
        .services
        .inventory
        .adjust_stock(adjust(product.id, -11), ACTOR)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NegativeStock(_));

    // Snapshot unchanged and no ledger row appended beyond the seed import.
    assert_eq!(app.stock_of(product.id).await, 10);
    let rows = stock_adjustment::Entity::find()
        .filter(stock_adjustment::Column::ProductId.eq(product.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reason, StockAdjustmentReason::InitialImport);
}

#[tokio::test]
async fn zero_change_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("ADJ-ZERO", 10).await;

    let err = app
        .services
        .inventory
        .adjust_stock(adjust(product.id, 0), ACTOR)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn adjusting_missing_product_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .services
        .inventory
        .adjust_stock(adjust(Uuid::new_v4(), 5), ACTOR)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn initial_quantity_is_recorded_as_initial_import() {
    let app = TestApp::new().await;
    let product = app.seed_product("SEEDED", 42).await;

    assert_eq!(product.quantity_on_hand, 42);

    let rows = stock_adjustment::Entity::find()
        .filter(stock_adjustment::Column::ProductId.eq(product.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reason, StockAdjustmentReason::InitialImport);
    assert_eq!(rows[0].change_qty, 42);
}

#[tokio::test]
async fn snapshot_always_equals_ledger_sum() {
    let app = TestApp::new().await;

    let product = app.seed_product("RECON", 100).await;
    let unit = app.seed_unit(product.id, 10, dec!(4.00)).await;

    // Manual moves.
    app.services
        .inventory
        .adjust_stock(adjust(product.id, 30), ACTOR)
        .await
        .unwrap();
    app.services
        .inventory
        .adjust_stock(adjust(product.id, -15), ACTOR)
        .await
        .unwrap();

    // A full sale cycle: finalize deducts, cancel restores.
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
                quantity: 4,
                unit_price: None,
            },
            ACTOR,
        )
        .await
        .unwrap();
    app.services
        .invoices
        .finalize_invoice(invoice.id, ACTOR)
        .await
        .unwrap();
    app.services
        .invoices
        .cancel_invoice(invoice.id, CancelInvoiceRequest { reason: None }, ACTOR)
        .await
        .unwrap();

    let snapshot = app.stock_of(product.id).await;
    assert_eq!(snapshot, 115);
    assert_eq!(ledger_sum(&app, product.id).await, snapshot);
}

#[tokio::test]
async fn sale_adjustments_reference_the_invoice() {
    let app = TestApp::new().await;

    let product = app.seed_product("REF", 50).await;
    let unit = app.seed_unit(product.id, 5, dec!(2.00)).await;

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
                quantity: 2,
                unit_price: None,
            },
            ACTOR,
        )
        .await
        .unwrap();
    app.services
        .invoices
        .finalize_invoice(invoice.id, ACTOR)
        .await
        .unwrap();
    app.services
        .invoices
        .cancel_invoice(invoice.id, CancelInvoiceRequest { reason: None }, ACTOR)
        .await
        .unwrap();

    let rows = stock_adjustment::Entity::find()
        .filter(stock_adjustment::Column::Reference.eq(invoice.id.to_string()))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let deduct = rows
        .iter()
        .find(|r| r.reason == StockAdjustmentReason::SaleFinalize)
        .expect("finalize row");
    let restore = rows
        .iter()
        .find(|r| r.reason == StockAdjustmentReason::SaleCancelRestore)
        .expect("restore row");
    assert_eq!(deduct.change_qty, -10);
    assert_eq!(restore.change_qty, 10);
}

#[tokio::test]
async fn adjustment_history_is_newest_first_and_paginated() {
    let app = TestApp::new().await;
    let product = app.seed_product("HIST", 0).await;

    for qty in [5i64, 7, 9] {
        app.services
            .inventory
            .adjust_stock(adjust(product.id, qty), ACTOR)
            .await
            .unwrap();
    }

    let history = app
        .services
        .inventory
        .list_adjustments(product.id, 50, 0)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);

    let page = app
        .services
        .inventory
        .list_adjustments(product.id, 2, 0)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);

    // History is scoped to the product.
    let other = app.seed_product("HIST-OTHER", 0).await;
    let other_history = app
        .services
        .inventory
        .list_adjustments(other.id, 50, 0)
        .await
        .unwrap();
    assert!(other_history.is_empty());
}
