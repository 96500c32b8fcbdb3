//! Audit trail tests: every mutating operation leaves its row, committed in
//! the same unit of work as the mutation.

mod common;

use common::{TestApp, ACTOR};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use pharmapos_api::{
    entities::audit_log,
    services::invoices::{AddInvoiceItemRequest, CancelInvoiceRequest, CreateInvoiceRequest},
};

async fn rows_for(app: &TestApp, action: &str) -> Vec<audit_log::Model> {
    audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq(action))
        .all(&*app.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn full_sale_cycle_is_fully_audited() {
    let app = TestApp::new().await;

    let product = app.seed_product("AUDITED", 100).await;
    let unit = app.seed_unit(product.id, 10, dec!(10.00)).await;

    let invoice = app
        .services
        .invoices
        .create_invoice(
            CreateInvoiceRequest {
                sold_by_name: Some("till 9".to_string()),
            },
            ACTOR,
        )
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
        .cancel_invoice(
            invoice.id,
            CancelInvoiceRequest {
                reason: Some("returned".to_string()),
            },
            ACTOR,
        )
        .await
        .unwrap();

    // One CREATE each for the product, its unit, and the invoice.
    let creates = rows_for(&app, "CREATE").await;
    assert_eq!(creates.len(), 3);
    assert!(creates.iter().all(|row| row.actor == ACTOR));
    assert!(creates.iter().any(|row| row.resource_type == "PRODUCT"));
    assert!(creates.iter().any(|row| row.resource_type == "PRODUCT_UNIT"));
    assert!(creates.iter().any(|row| row.resource_type == "INVOICE"));

    assert_eq!(rows_for(&app, "ADD_ITEM").await.len(), 1);

    let finalizes = rows_for(&app, "FINALIZE").await;
    assert_eq!(finalizes.len(), 1);
    assert_eq!(finalizes[0].resource_id, Some(invoice.id));

    let cancels = rows_for(&app, "CANCEL").await;
    assert_eq!(cancels.len(), 1);
    let details = cancels[0].details.as_ref().expect("cancel details");
    assert_eq!(details["previous_status"], "FINALIZED");
    assert_eq!(details["cancellation_reason"], "returned");

    // Ledger writes: initial import + finalize deduct + cancel restore.
    let adjusts = rows_for(&app, "ADJUST_STOCK").await;
    assert_eq!(adjusts.len(), 3);
    assert!(adjusts.iter().all(|row| row.resource_id == Some(product.id)));
}

#[tokio::test]
async fn failed_operations_leave_no_audit_rows() {
    let app = TestApp::new().await;

    let before = audit_log::Entity::find().all(&*app.db).await.unwrap().len();

    // Finalizing a missing invoice fails before anything is written.
    let _ = app
        .services
        .invoices
        .finalize_invoice(Uuid::new_v4(), ACTOR)
        .await
        .unwrap_err();

    let after = audit_log::Entity::find().all(&*app.db).await.unwrap().len();
    assert_eq!(before, after);
}

#[tokio::test]
async fn product_update_and_delete_are_audited() {
    let app = TestApp::new().await;
    let product = app.seed_product("AUD-CRUD", 0).await;

    app.services
        .products
        .update_product(
            product.id,
            pharmapos_api::services::products::UpdateProductRequest {
                name: Some("Renamed".to_string()),
                brand_name: None,
                supplier_name: None,
                barcode: None,
                markup_percent: None,
                reorder_level: None,
                product_type: None,
                dispense_without_prescription: None,
                return_policy: None,
                status: None,
            },
            ACTOR,
        )
        .await
        .unwrap();
    app.services
        .products
        .delete_product(product.id, ACTOR)
        .await
        .unwrap();

    let updates = rows_for(&app, "UPDATE").await;
    assert_eq!(updates.len(), 1);
    let details = updates[0].details.as_ref().expect("update details");
    assert_eq!(details["new_name"], "Renamed");

    let deletes = rows_for(&app, "DELETE").await;
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].resource_id, Some(product.id));
}
