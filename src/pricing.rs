//! Course price calculation.
//!
//! Every function in this module is pure. The amount quoted to a buyer and the amount
//! sent to the payment processor both come from [`compute_final_price`], so the two
//! can never drift apart by a rounding step.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Number of decimal places prices are displayed and charged with.
pub const PRICE_SCALE: u32 = 2;

/// Ties are rounded away from zero (half-up for the non-negative amounts used here).
pub const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Errors produced while validating or computing a price
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("discount percentage must be at least 0 and below 100, got {0}")]
    InvalidDiscount(Decimal),
}

/// Outcome of a price evaluation before it is turned into a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Evaluation {
    final_price: Decimal,
    minimum_gain_applied: bool,
}

/// Computes the amount a buyer pays for a course.
///
/// * A price of zero is a free course and always yields zero.
/// * An absent or zero discount yields the list price.
/// * Otherwise the percentage discount is applied, and if the result falls below
///   `minimum_gain` the floor wins, clamped so it never exceeds the list price.
///
/// The result is rounded to [`PRICE_SCALE`] places with [`ROUNDING`].
pub fn compute_final_price(
    original: Decimal,
    discount_percentage: Option<Decimal>,
    minimum_gain: Option<Decimal>,
) -> Result<Decimal, PricingError> {
    evaluate(original, discount_percentage, minimum_gain).map(|eval| eval.final_price)
}

fn evaluate(
    original: Decimal,
    discount_percentage: Option<Decimal>,
    minimum_gain: Option<Decimal>,
) -> Result<Evaluation, PricingError> {
    ensure_non_negative("price", original)?;

    if original.is_zero() {
        return Ok(Evaluation {
            final_price: round_price(Decimal::ZERO),
            minimum_gain_applied: false,
        });
    }

    let discount = effective_discount(discount_percentage)?;
    if let Some(floor) = minimum_gain {
        ensure_non_negative("minimum gain", floor)?;
    }

    let Some(discount) = discount else {
        return Ok(Evaluation {
            final_price: round_price(original),
            minimum_gain_applied: false,
        });
    };

    let remaining_share = (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED;
    let candidate = original
        .checked_mul(remaining_share)
        .ok_or_else(|| PricingError::InvalidInput("price is out of range".to_string()))?;

    let evaluation = match minimum_gain {
        Some(floor) if candidate < floor => Evaluation {
            final_price: round_price(floor.min(original)),
            minimum_gain_applied: true,
        },
        _ => Evaluation {
            final_price: round_price(candidate),
            minimum_gain_applied: false,
        },
    };

    Ok(evaluation)
}

/// Converts a major-unit amount into the integer minor units a payment processor
/// expects, i.e. `round(amount * 100)`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PricingError> {
    ensure_non_negative("amount", amount)?;

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round_dp_with_strategy(0, ROUNDING))
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| PricingError::InvalidInput("amount is out of range".to_string()))
}

/// Validates pricing fields as they would be stored on a course, independent of
/// whether the course is currently free.
pub fn validate_pricing(
    price: Decimal,
    discount_percentage: Option<Decimal>,
    minimum_gain: Option<Decimal>,
) -> Result<(), PricingError> {
    ensure_non_negative("price", price)?;
    effective_discount(discount_percentage)?;
    if let Some(floor) = minimum_gain {
        ensure_non_negative("minimum gain", floor)?;
    }
    Ok(())
}

/// Rounds a price to two decimal places and pins the scale so it always renders
/// with cents (`70.00`, not `70`).
pub fn round_price(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(PRICE_SCALE, ROUNDING);
    rounded.rescale(PRICE_SCALE);
    rounded
}

fn effective_discount(discount_percentage: Option<Decimal>) -> Result<Option<Decimal>, PricingError> {
    match discount_percentage {
        None => Ok(None),
        Some(d) if d < Decimal::ZERO => Err(PricingError::InvalidInput(format!(
            "discount percentage cannot be negative, got {d}"
        ))),
        Some(d) if d >= Decimal::ONE_HUNDRED => Err(PricingError::InvalidDiscount(d)),
        Some(d) if d.is_zero() => Ok(None),
        Some(d) => Ok(Some(d)),
    }
}

fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), PricingError> {
    if value < Decimal::ZERO {
        return Err(PricingError::InvalidInput(format!(
            "{field} cannot be negative, got {value}"
        )));
    }
    Ok(())
}

/// Price breakdown shown to a buyer before checkout.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// List price of the course
    #[schema(value_type = String, example = "100.00")]
    pub original_price: Decimal,
    /// Percentage discount configured on the course, if any
    #[schema(value_type = Option<String>, example = "30")]
    pub discount_percentage: Option<Decimal>,
    /// Amount the buyer pays
    #[schema(value_type = String, example = "70.00")]
    pub final_price: Decimal,
    /// Revenue the seller gives up with the discount (list price minus final price)
    #[schema(value_type = String, example = "30.00")]
    pub discount_amount: Decimal,
    /// Whether the minimum-gain floor raised the discounted price
    pub minimum_gain_applied: bool,
    /// Final price in minor currency units, as charged by the payment processor
    #[schema(example = 7000)]
    pub amount_minor_units: i64,
    /// ISO 4217 currency code, lowercase
    #[schema(example = "usd")]
    pub currency: String,
}

impl PriceQuote {
    pub fn calculate(
        original: Decimal,
        discount_percentage: Option<Decimal>,
        minimum_gain: Option<Decimal>,
        currency: &str,
    ) -> Result<Self, PricingError> {
        let evaluation = evaluate(original, discount_percentage, minimum_gain)?;
        let original_price = round_price(original);
        let amount_minor_units = to_minor_units(evaluation.final_price)?;

        Ok(Self {
            original_price,
            discount_percentage: discount_percentage.filter(|d| !d.is_zero()),
            final_price: evaluation.final_price,
            discount_amount: round_price(original_price - evaluation.final_price),
            minimum_gain_applied: evaluation.minimum_gain_applied,
            amount_minor_units,
            currency: currency.to_ascii_lowercase(),
        })
    }

    /// A free course is enrolled directly without a payment intent.
    pub fn is_free(&self) -> bool {
        self.amount_minor_units == 0
    }
}
