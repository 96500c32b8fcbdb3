use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PharmaPOS API",
        version = "0.1.0",
        description = r#"
# PharmaPOS API

Pharmacy inventory and point-of-sale invoicing.

- **Products**: catalog with SKUs, classification, and sale units
  (unit-of-sale to base-unit conversion)
- **Inventory**: stock snapshot per product plus an append-only
  adjustment ledger
- **Invoices**: DRAFT → FINALIZED → CANCELLED lifecycle; finalize deducts
  stock atomically, cancel restores it

Audit attribution is taken from the `X-Actor` request header.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "invoices", description = "Invoice lifecycle endpoints"),
        (name = "products", description = "Product catalog endpoints"),
        (name = "inventory", description = "Stock ledger endpoints")
    ),
    paths(
        // Invoices
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::add_invoice_item,
        crate::handlers::invoices::finalize_invoice,
        crate::handlers::invoices::cancel_invoice,
        crate::handlers::invoices::get_invoice,
        crate::handlers::invoices::list_invoices,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::low_stock_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::add_product_unit,
        crate::handlers::products::list_product_units,

        // Inventory
        crate::handlers::inventory::adjust_stock,
        crate::handlers::inventory::stock_snapshot,
        crate::handlers::inventory::list_adjustments,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::services::invoices::CreateInvoiceRequest,
            crate::services::invoices::AddInvoiceItemRequest,
            crate::services::invoices::CancelInvoiceRequest,
            crate::services::invoices::InvoiceResponse,
            crate::services::invoices::InvoiceItemResponse,
            crate::services::invoices::InvoiceListResponse,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::CreateProductUnitRequest,
            crate::services::products::ProductResponse,
            crate::services::products::ProductUnitResponse,
            crate::services::products::ProductListResponse,
            crate::services::inventory::AdjustStockCommand,
            crate::services::inventory::StockAdjustmentResponse,
            crate::entities::invoice::InvoiceStatus,
            crate::entities::product::ProductType,
            crate::entities::product::ProductStatus,
            crate::entities::stock_adjustment::StockAdjustmentReason,
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("PharmaPOS API"));
        assert!(json.contains("/api/v1/invoices"));
        assert!(json.contains("/api/v1/inventory/adjust"));
    }
}
