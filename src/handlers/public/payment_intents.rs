use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;

const DEFAULT_CURRENCY: &str = "usd";

#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Major currency units, e.g. 10.00 for ten dollars
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

/// Convert a major-unit amount into minor units (cents), rounding half away from zero.
///
/// Rejects missing, non-finite and non-positive amounts, as well as amounts
/// that round down to zero cents.
pub fn amount_to_minor_units(amount: Option<f64>) -> Result<i64> {
    let amount = match amount {
        Some(a) if a.is_finite() && a > 0.0 => a,
        _ => return Err(AppError::BadRequest(msg::INVALID_AMOUNT.into())),
    };

    let cents = (amount * 100.0).round();
    if cents < 1.0 || cents >= i64::MAX as f64 {
        return Err(AppError::BadRequest(msg::INVALID_AMOUNT.into()));
    }

    Ok(cents as i64)
}

/// Lowercased ISO 4217 code, defaulting to USD.
pub fn normalize_currency(currency: Option<&str>) -> Result<String> {
    let currency = currency.unwrap_or(DEFAULT_CURRENCY).trim().to_ascii_lowercase();

    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(AppError::BadRequest(msg::INVALID_CURRENCY.into()));
    }

    Ok(currency)
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>> {
    let amount_cents = amount_to_minor_units(request.amount)?;
    let currency = normalize_currency(request.currency.as_deref())?;

    let intent = state
        .stripe
        .create_payment_intent(amount_cents, &currency)
        .await?;

    tracing::info!(
        "Created payment intent {} for {} {}",
        intent.id,
        amount_cents,
        currency
    );

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    }))
}
