use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    app::app_error::AppError,
    lifecycle::status::{AnswerStatus, PreparationStatus, UnknownStatus},
};

/// One requested order line as sent by the customer frontend.
#[derive(Deserialize, ToSchema, Debug, Clone, Default)]
pub struct OrderLineInput {
    pub product_id: Option<i32>,
    /// Defaults to 1.
    pub quantity: Option<i32>,
    /// Defaults to the product's current price.
    pub unit_price: Option<i32>,
}

/// An order line that passed input checks. Product existence is checked at insert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: Option<i32>,
}

pub fn validate_order_lines(lines: &[OrderLineInput]) -> Result<Vec<ValidatedLine>, AppError> {
    if lines.is_empty() {
        return Err(AppError::BadRequest(
            "An order must contain at least one product".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(lines.len());
    let mut validated = Vec::with_capacity(lines.len());

    for line in lines {
        let product_id = match line.product_id {
            Some(id) if id > 0 => id,
            _ => {
                return Err(AppError::BadRequest(
                    "Each product row must include product_id (integer)".into(),
                ));
            }
        };

        let quantity = line.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(AppError::BadRequest("quantity must be >= 1".into()));
        }

        if let Some(price) = line.unit_price {
            if price < 0 {
                return Err(AppError::BadRequest("unit_price must be >= 0".into()));
            }
        }

        if !seen.insert(product_id) {
            return Err(AppError::Conflict(format!(
                "Product {} appears more than once in the order",
                product_id
            )));
        }

        validated.push(ValidatedLine {
            product_id,
            quantity,
            unit_price: line.unit_price,
        });
    }

    Ok(validated)
}

/// Reads a projected preparation time leniently. Integers, integral floats and
/// numeric strings are accepted; anything else, including negatives, yields `None`.
pub fn parse_projected_minutes(raw: Option<&Value>) -> Option<i32> {
    let minutes = match raw? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    i32::try_from(minutes).ok().filter(|m| *m >= 0)
}

/// Only acceptances keep a projected preparation time.
pub fn effective_projection(decision: AnswerStatus, minutes: Option<i32>) -> Option<i32> {
    match decision {
        AnswerStatus::Accepted => minutes.filter(|m| *m >= 0),
        AnswerStatus::Rejected => None,
    }
}

pub fn parse_decision(raw: Option<&str>) -> Result<AnswerStatus, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest("decision is required".into()))?;
    raw.parse()
        .map_err(|err: UnknownStatus| AppError::BadRequest(err.to_string()))
}

pub fn parse_preparation_status(raw: Option<&str>) -> Result<PreparationStatus, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest("status is required".into()))?;
    raw.parse().map_err(|_| {
        AppError::BadRequest("invalid status; must be one of: DELAYED, DONE, CANCELLED".into())
    })
}

pub fn validate_delay_minutes(raw: Option<i32>) -> Result<i32, AppError> {
    let minutes = raw.unwrap_or(0);
    if minutes < 0 {
        return Err(AppError::BadRequest("delay_minutes must be >= 0".into()));
    }
    Ok(minutes)
}
