use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a webhook timestamp before it's rejected (in seconds).
/// Matches the default tolerance of Stripe's own SDKs.
pub const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Clock skew allowed for timestamps that appear to come from the future.
const WEBHOOK_FUTURE_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Base URL of the Stripe API, without a trailing slash
    pub api_base: String,
    pub timeout: Duration,
}

/// A payment intent as returned to the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create a payment intent for `amount_cents` minor units of `currency`,
    /// letting Stripe pick the payment methods shown to the customer.
    pub async fn create_payment_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent> {
        let amount = amount_cents.to_string();

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("automatic_payment_methods[enabled]", "true"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<StripeErrorResponse>(&error_text) {
                Ok(StripeErrorResponse {
                    error: StripeErrorBody {
                        message: Some(message),
                        ..
                    },
                }) => message,
                Ok(StripeErrorResponse {
                    error: StripeErrorBody { code: Some(code), .. },
                }) => code,
                _ => format!("Stripe API returned {}: {}", status, error_text),
            };
            return Err(AppError::Upstream(message));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))
    }
}

// ============ Webhook verification ============

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing stripe-signature header")]
    MissingHeader,

    #[error("Invalid stripe-signature header format")]
    InvalidFormat,

    #[error("Invalid timestamp in signature")]
    InvalidTimestamp,

    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,

    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Verify a Stripe webhook and parse its event.
///
/// `payload` must be the raw request body exactly as received: the
/// signature covers the bytes, not their JSON meaning.
pub fn verify_webhook(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> std::result::Result<StripeWebhookEvent, SignatureError> {
    verify_webhook_signature(
        payload,
        signature_header,
        secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )?;

    serde_json::from_slice(payload).map_err(|e| SignatureError::InvalidPayload(e.to_string()))
}

/// Check the `t=...,v1=...` signature header against `payload` at time `now`.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> std::result::Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) if timestamp.is_none() => timestamp = Some(t),
            Some(("v1", s)) => signatures.push(s),
            _ => {}
        }
    }

    let timestamp_str = timestamp.ok_or(SignatureError::InvalidFormat)?;
    if signatures.is_empty() {
        return Err(SignatureError::InvalidFormat);
    }

    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    // `t` is attacker-controlled; extreme values must not overflow
    let age = now
        .checked_sub(timestamp)
        .ok_or(SignatureError::InvalidTimestamp)?;
    if age > tolerance_secs {
        tracing::warn!(
            "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
            age,
            tolerance_secs
        );
        return Err(SignatureError::TimestampOutsideTolerance);
    }
    if age < -WEBHOOK_FUTURE_SKEW_SECS {
        tracing::warn!("Stripe webhook rejected: timestamp in the future (age={}s)", age);
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    // Signed payload is "{t}." followed by the raw body bytes
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidFormat)?;
    mac.update(timestamp_str.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());
    let expected_bytes = expected.as_bytes();

    // Length is not secret (always 64 hex chars), only the content comparison is constant-time
    let matched = signatures.iter().any(|provided| {
        let provided_bytes = provided.as_bytes();
        provided_bytes.len() == expected_bytes.len() && bool::from(expected_bytes.ct_eq(provided_bytes))
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::NoMatchingSignature)
    }
}

/// Generic Stripe webhook event - object is parsed based on event_type
#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

// ============ payment_intent.* ============

#[derive(Debug, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: Option<String>,
    pub last_payment_error: Option<StripePaymentError>,
}

#[derive(Debug, Deserialize)]
pub struct StripePaymentError {
    pub code: Option<String>,
    pub message: Option<String>,
}
