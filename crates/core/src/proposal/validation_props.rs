//! Property-based tests for proposal validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::proposal::validation::ProposalDraft;

fn arb_amount() -> impl Strategy<Value = Decimal> {
    // Positive amounts with up to two decimal places.
    (1i64..1_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn draft(quantity: Decimal, unit_price: Decimal) -> ProposalDraft {
    ProposalDraft {
        category: "Goods".to_string(),
        subcategory: None,
        activity: "Item".to_string(),
        unit_label: "unit".to_string(),
        quantity,
        unit_price,
        planned: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Property 1: total == quantity × unit_price for every accepted draft
    #[test]
    fn prop_total_is_product(quantity in arb_amount(), unit_price in arb_amount()) {
        let validated = draft(quantity, unit_price).validate().unwrap();
        prop_assert_eq!(validated.total, quantity * unit_price);
        prop_assert!(validated.total > Decimal::ZERO);
    }

    // Property 2: a non-positive quantity is never accepted
    #[test]
    fn prop_non_positive_quantity_rejected(
        quantity in -1_000_000i64..=0,
        unit_price in arb_amount(),
    ) {
        prop_assert!(draft(Decimal::from(quantity), unit_price).validate().is_err());
    }
}
