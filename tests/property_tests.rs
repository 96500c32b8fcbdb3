//! Property tests for the pure data rules: unit conversion, line totals,
//! and the status transition matrix.

use chrono::Utc;
use proptest::prelude::*;
use rstest::rstest;
use rust_decimal::Decimal;
use uuid::Uuid;

use pharmapos_api::entities::{
    invoice::InvoiceStatus,
    invoice_item,
    product_unit,
};

fn unit(product_id: Uuid, multiplier: i32) -> product_unit::Model {
    product_unit::Model {
        id: Uuid::new_v4(),
        product_id,
        name: format!("pack of {}", multiplier),
        multiplier_to_base: multiplier,
        price_per_unit: Decimal::ONE,
        is_default: false,
        created_at: Utc::now(),
        updated_at: None,
    }
}

proptest! {
    /// Conversion scales linearly with the sale quantity.
    #[test]
    fn base_quantity_scales_linearly(
        multiplier in 1i32..100_000,
        quantity in 1i32..100_000,
    ) {
        let product_id = Uuid::new_v4();
        let unit = unit(product_id, multiplier);

        let one = unit.base_quantity(product_id, 1).unwrap();
        let many = unit.base_quantity(product_id, quantity).unwrap();

        prop_assert_eq!(one, multiplier as i64);
        prop_assert_eq!(many, quantity as i64 * multiplier as i64);
        prop_assert!(many >= quantity as i64);
    }

    /// A unit never converts against a product it does not belong to.
    #[test]
    fn base_quantity_always_rejects_foreign_products(
        multiplier in 1i32..100_000,
        quantity in 1i32..100_000,
    ) {
        let unit = unit(Uuid::new_v4(), multiplier);
        prop_assert!(unit.base_quantity(Uuid::new_v4(), quantity).is_err());
    }

    /// An invoice total is exactly the sum of its line totals.
    #[test]
    fn totals_are_sums_of_line_totals(
        lines in prop::collection::vec((1i32..1_000, 1i64..1_000_000), 0..20),
    ) {
        let invoice_id = Uuid::new_v4();
        let items: Vec<invoice_item::Model> = lines
            .iter()
            .map(|(quantity, cents)| invoice_item::Model {
                id: Uuid::new_v4(),
                invoice_id,
                product_id: Uuid::new_v4(),
                product_unit_id: Uuid::new_v4(),
                quantity: *quantity,
                unit_price: Decimal::new(*cents, 2),
                created_at: Utc::now(),
            })
            .collect();

        let expected: Decimal = lines
            .iter()
            .map(|(quantity, cents)| Decimal::from(*quantity) * Decimal::new(*cents, 2))
            .sum();
        let total: Decimal = items.iter().map(|item| item.line_total()).sum();

        prop_assert_eq!(total, expected);
    }
}

#[rstest]
#[case(InvoiceStatus::Draft, InvoiceStatus::Finalized, true)]
#[case(InvoiceStatus::Draft, InvoiceStatus::Cancelled, true)]
#[case(InvoiceStatus::Finalized, InvoiceStatus::Cancelled, true)]
#[case(InvoiceStatus::Draft, InvoiceStatus::Draft, false)]
#[case(InvoiceStatus::Finalized, InvoiceStatus::Draft, false)]
#[case(InvoiceStatus::Finalized, InvoiceStatus::Finalized, false)]
#[case(InvoiceStatus::Cancelled, InvoiceStatus::Draft, false)]
#[case(InvoiceStatus::Cancelled, InvoiceStatus::Finalized, false)]
#[case(InvoiceStatus::Cancelled, InvoiceStatus::Cancelled, false)]
fn transition_matrix_is_exactly_the_specified_one(
    #[case] from: InvoiceStatus,
    #[case] to: InvoiceStatus,
    #[case] legal: bool,
) {
    assert_eq!(from.can_transition_to(to), legal);
}
