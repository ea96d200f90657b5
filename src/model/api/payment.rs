use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Request to start a pro-user payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentRequest {
    /// Price in whole currency units; clients send either a number or a
    /// decimal string.
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Number(f64),
    Text(String),
}

impl PaymentRequest {
    /// The price in the smallest currency unit, rounded to the nearest cent.
    pub fn amount_cents(&self) -> Result<i64> {
        let units = match &self.price {
            Price::Number(n) => *n,
            Price::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::validation(format!("invalid price '{s}'")))?,
        };
        let cents = (units * 100.0).round();
        if !cents.is_finite() || cents < 1.0 || cents > i64::MAX as f64 {
            return Err(Error::validation("price must be at least one cent"));
        }
        Ok(cents as i64)
    }
}

/// What the client needs to confirm the payment with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
}
