use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Course row as stored by the backend.
///
/// Pricing fields are the only inputs to checkout; they are re-read on every
/// checkout attempt and never taken from the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// List price in major currency units
    pub price: Decimal,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    /// Minimum seller proceeds a discount may not undercut
    #[serde(default)]
    pub minimum_gain: Option<Decimal>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub instructor_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn pricing(&self) -> CoursePricing {
        CoursePricing {
            price: self.price,
            discount_percentage: self.discount_percentage,
            minimum_gain: self.minimum_gain,
        }
    }

    pub fn apply_pricing(&mut self, pricing: &CoursePricing) {
        self.price = pricing.price;
        self.discount_percentage = pricing.discount_percentage;
        self.minimum_gain = pricing.minimum_gain;
        self.updated_at = Some(Utc::now());
    }

    /// Currency the course is sold in, falling back to `default` when unset.
    pub fn currency_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.currency
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(default)
    }
}

/// The three pricing columns of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePricing {
    pub price: Decimal,
    pub discount_percentage: Option<Decimal>,
    pub minimum_gain: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn deserializes_backend_row_with_numeric_and_missing_columns() {
        let course: Course = serde_json::from_value(json!({
            "id": "c-1",
            "title": "Rust for Beginners",
            "price": "49.90",
            "discount_percentage": "20",
            "is_published": true
        }))
        .unwrap();

        assert_eq!(course.price, dec!(49.90));
        assert_eq!(course.discount_percentage, Some(dec!(20)));
        assert_eq!(course.minimum_gain, None);
        assert!(course.is_published);
        assert_eq!(course.currency_or("usd"), "usd");
    }

    #[test]
    fn apply_pricing_replaces_all_three_fields() {
        let mut course: Course = serde_json::from_value(json!({
            "id": "c-1",
            "title": "t",
            "price": "10",
            "discount_percentage": "5",
            "minimum_gain": "9"
        }))
        .unwrap();

        course.apply_pricing(&CoursePricing {
            price: dec!(12),
            discount_percentage: None,
            minimum_gain: None,
        });

        assert_eq!(course.pricing().price, dec!(12));
        assert!(course.discount_percentage.is_none());
        assert!(course.minimum_gain.is_none());
        assert!(course.updated_at.is_some());
    }
}
