//! Property-based tests for course pricing.
//!
//! These tests use proptest to check the price calculation invariants across a wide
//! range of prices, discounts and minimum-gain floors.

use course_checkout_api::pricing::{
    compute_final_price, round_price, to_minor_units, PriceQuote, PricingError,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn discount_strategy() -> impl Strategy<Value = Decimal> {
    // 0.01% ..= 99.99%
    (1i64..10_000).prop_map(|bp| Decimal::new(bp, 2))
}

fn floor_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..20_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn no_discount_keeps_list_price(price in price_strategy(), floor in proptest::option::of(floor_strategy())) {
        prop_assert_eq!(compute_final_price(price, None, floor).unwrap(), round_price(price));
        prop_assert_eq!(compute_final_price(price, Some(Decimal::ZERO), floor).unwrap(), round_price(price));
    }

    #[test]
    fn free_course_is_always_free(discount in proptest::option::of(discount_strategy()), floor in proptest::option::of(floor_strategy())) {
        prop_assert_eq!(compute_final_price(Decimal::ZERO, discount, floor).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn discount_without_floor_is_rounded_product(price in price_strategy(), discount in discount_strategy()) {
        let expected = round_price(price * (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED);
        prop_assert_eq!(compute_final_price(price, Some(discount), None).unwrap(), expected);
    }

    #[test]
    fn final_price_stays_within_bounds(price in price_strategy(), discount in discount_strategy(), floor in proptest::option::of(floor_strategy())) {
        let final_price = compute_final_price(price, Some(discount), floor).unwrap();
        prop_assert!(final_price >= Decimal::ZERO);
        prop_assert!(final_price <= round_price(price));
        if let Some(floor) = floor {
            prop_assert!(final_price >= round_price(floor.min(price)));
        }
    }

    #[test]
    fn floor_above_discounted_price_wins(price in price_strategy(), discount in discount_strategy(), share in 0u32..=100) {
        let candidate = price * (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED;
        // Pick a floor between the discounted price and the list price.
        let floor = candidate + (price - candidate) * Decimal::from(share) / Decimal::ONE_HUNDRED;
        prop_assume!(floor > candidate);
        prop_assert_eq!(compute_final_price(price, Some(discount), Some(floor)).unwrap(), round_price(floor));
    }

    #[test]
    fn discounts_of_one_hundred_or_more_are_rejected(price in price_strategy(), excess in 0i64..10_000) {
        let discount = Decimal::ONE_HUNDRED + Decimal::new(excess, 1);
        let is_invalid_discount = matches!(
            compute_final_price(price, Some(discount), None),
            Err(PricingError::InvalidDiscount(_))
        );
        prop_assert!(is_invalid_discount);
    }

    #[test]
    fn negative_prices_are_rejected(cents in 1i64..10_000_000) {
        let is_invalid_input = matches!(
            compute_final_price(Decimal::new(-cents, 2), None, None),
            Err(PricingError::InvalidInput(_))
        );
        prop_assert!(is_invalid_input);
    }

    #[test]
    fn calculation_is_deterministic(price in price_strategy(), discount in discount_strategy(), floor in proptest::option::of(floor_strategy())) {
        prop_assert_eq!(
            compute_final_price(price, Some(discount), floor),
            compute_final_price(price, Some(discount), floor)
        );
    }

    #[test]
    fn quote_minor_units_match_final_price(price in price_strategy(), discount in proptest::option::of(discount_strategy()), floor in proptest::option::of(floor_strategy())) {
        let quote = PriceQuote::calculate(price, discount, floor, "usd").unwrap();
        prop_assert_eq!(quote.amount_minor_units, to_minor_units(quote.final_price).unwrap());
        prop_assert_eq!(Decimal::from(quote.amount_minor_units), quote.final_price * Decimal::ONE_HUNDRED);
        prop_assert_eq!(quote.final_price.scale(), 2);
    }
}
