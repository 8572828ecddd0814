use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_METHOD: &str = "card";
/// Accepted difference between a proposed amount and the computed fare.
pub const PRICE_TOLERANCE: f64 = 0.01;

/// Fare checks applied before a booking's payment snapshot is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tolerance: f64,
    pub default_currency: String,
    pub default_method: String,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tolerance: PRICE_TOLERANCE,
            default_currency: DEFAULT_CURRENCY.to_string(),
            default_method: DEFAULT_METHOD.to_string(),
        }
    }
}

impl PricingPolicy {
    pub fn expected(&self, price: f64, passengers: u32) -> f64 {
        expected_amount(price, passengers)
    }

    pub fn validate(&self, expected: f64, proposed: f64) -> bool {
        amount_matches(expected, proposed, self.tolerance)
    }

    pub fn currency_or_default(&self, currency: Option<String>) -> String {
        currency.unwrap_or_else(|| self.default_currency.clone())
    }

    pub fn method_or_default(&self, method: Option<String>) -> String {
        method.unwrap_or_else(|| self.default_method.clone())
    }
}

pub fn expected_amount(price: f64, passengers: u32) -> f64 {
    price * f64::from(passengers)
}

pub fn amount_matches(expected: f64, proposed: f64, tolerance: f64) -> bool {
    proposed.is_finite() && (proposed - expected).abs() <= tolerance
}
