//! HTTP request DTOs.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::order::NewOrder;

/// Body of `POST /api/orders/execute`.
///
/// Every field is optional at the wire level so that all problems can be
/// reported at once instead of failing on the first missing key. Amounts
/// accept JSON numbers or decimal strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    /// Token sold.
    pub token_in: Option<String>,
    /// Token bought.
    pub token_out: Option<String>,
    /// Amount of `tokenIn` to sell.
    pub amount_in: Option<Value>,
    /// Minimum acceptable price.
    pub limit_price: Option<Value>,
}

impl SubmitOrderRequest {
    /// Validate the payload and convert it to order fields.
    ///
    /// # Errors
    ///
    /// Returns one message per invalid field.
    pub fn validate(self) -> Result<NewOrder, Vec<String>> {
        let mut details = Vec::new();

        let token_in = required_token("tokenIn", self.token_in, &mut details);
        let token_out = required_token("tokenOut", self.token_out, &mut details);
        let amount_in = positive_decimal("amountIn", self.amount_in.as_ref(), &mut details);
        let limit_price = positive_decimal("limitPrice", self.limit_price.as_ref(), &mut details);

        match (token_in, token_out, amount_in, limit_price) {
            (Some(token_in), Some(token_out), Some(amount_in), Some(limit_price))
                if details.is_empty() =>
            {
                Ok(NewOrder {
                    token_in,
                    token_out,
                    amount_in,
                    limit_price,
                })
            }
            _ => Err(details),
        }
    }
}

fn required_token(field: &str, value: Option<String>, details: &mut Vec<String>) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(token) if !token.is_empty() => Some(token),
        Some(_) => {
            details.push(format!("{field}: must not be empty"));
            None
        }
        None => {
            details.push(format!("{field}: required"));
            None
        }
    }
}

fn positive_decimal(field: &str, value: Option<&Value>, details: &mut Vec<String>) -> Option<Decimal> {
    let Some(value) = value else {
        details.push(format!("{field}: required"));
        return None;
    };

    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };

    match parsed {
        Some(d) if d > Decimal::ZERO => Some(d),
        Some(_) => {
            details.push(format!("{field}: must be positive"));
            None
        }
        None => {
            details.push(format!("{field}: must be a number or decimal string"));
            None
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Query string of the WebSocket endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeQuery {
    /// Order to follow.
    pub order_id: Option<String>,
}
