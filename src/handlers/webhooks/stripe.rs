//! Stripe webhook ingestion.
//!
//! The handler takes the body as raw `Bytes` so the signature is checked
//! against exactly what Stripe sent. Once the signature passes, the event is
//! always acknowledged with `{"received": true}`: ledger failures are logged
//! and dropped rather than surfaced, so Stripe does not redeliver forever.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;

use crate::db::{AppState, DbPool, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{CreateTransaction, RecordOutcome, Transaction, TransactionStatus};
use crate::payments::{SignatureError, StripePaymentIntent, StripeWebhookEvent, verify_webhook};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Parsed webhook event, reduced to what the ledger cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentSucceeded {
        id: String,
        amount: i64,
        currency: Option<String>,
    },
    PaymentFailed {
        id: String,
        currency: Option<String>,
        reason: Option<String>,
    },
    /// A payment intent event whose object could not be read
    Malformed { event_type: String, error: String },
    Unhandled(String),
}

/// What happened to an event after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Recorded(Transaction),
    AlreadyRecorded,
    /// The ledger write failed; the event is dropped
    StorageFailed,
    /// Logged only, nothing persisted
    Logged,
}

fn extract_signature(headers: &HeaderMap) -> std::result::Result<String, SignatureError> {
    headers
        .get(SIGNATURE_HEADER)
        .ok_or(SignatureError::MissingHeader)?
        .to_str()
        .map(|s| s.to_string())
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in Stripe signature header: {}", e);
            SignatureError::InvalidFormat
        })
}

fn parse_payment_intent(event: &StripeWebhookEvent) -> std::result::Result<StripePaymentIntent, WebhookEvent> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| WebhookEvent::Malformed {
        event_type: event.event_type.clone(),
        error: e.to_string(),
    })
}

pub fn parse_event(event: &StripeWebhookEvent) -> WebhookEvent {
    match event.event_type.as_str() {
        "payment_intent.succeeded" => match parse_payment_intent(event) {
            Ok(intent) => WebhookEvent::PaymentSucceeded {
                id: intent.id,
                amount: intent.amount,
                currency: intent.currency,
            },
            Err(malformed) => malformed,
        },
        "payment_intent.payment_failed" => match parse_payment_intent(event) {
            Ok(intent) => WebhookEvent::PaymentFailed {
                id: intent.id,
                currency: intent.currency,
                reason: intent.last_payment_error.and_then(|e| e.message.or(e.code)),
            },
            Err(malformed) => malformed,
        },
        other => WebhookEvent::Unhandled(other.to_string()),
    }
}

/// Apply an event to the ledger. Never fails: storage errors are logged and
/// reported as `StorageFailed`.
pub fn process_event(db: &DbPool, event: WebhookEvent) -> EventOutcome {
    match event {
        WebhookEvent::PaymentSucceeded {
            id,
            amount,
            currency,
        } => {
            tracing::info!(
                "Payment succeeded: {} ({} {})",
                id,
                amount,
                currency.as_deref().unwrap_or("unknown currency")
            );
            record_payment(db, id, amount)
        }
        WebhookEvent::PaymentFailed {
            id,
            currency,
            reason,
        } => {
            tracing::warn!(
                "Payment failed: {} [{}] ({})",
                id,
                currency.as_deref().unwrap_or("unknown currency"),
                reason.as_deref().unwrap_or("no reason given")
            );
            EventOutcome::Logged
        }
        WebhookEvent::Malformed { event_type, error } => {
            tracing::error!("Malformed {} event, not recorded: {}", event_type, error);
            EventOutcome::Logged
        }
        WebhookEvent::Unhandled(event_type) => {
            tracing::info!("Unhandled event type {}", event_type);
            EventOutcome::Logged
        }
    }
}

fn record_payment(db: &DbPool, payment_intent_id: String, amount: i64) -> EventOutcome {
    let conn = match db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(
                "DB connection error, payment {} not recorded: {}",
                payment_intent_id,
                e
            );
            return EventOutcome::StorageFailed;
        }
    };

    let input = CreateTransaction {
        payment_intent_id,
        amount,
        status: TransactionStatus::Succeeded,
    };

    match queries::record_transaction(&conn, &input) {
        Ok(RecordOutcome::Recorded(tx)) => {
            tracing::info!("Transaction {} recorded for {}", tx.id, tx.payment_intent_id);
            EventOutcome::Recorded(tx)
        }
        Ok(RecordOutcome::AlreadyRecorded) => {
            tracing::info!(
                "Transaction for {} already recorded, ignoring redelivery",
                input.payment_intent_id
            );
            EventOutcome::AlreadyRecorded
        }
        Err(e) => {
            tracing::error!(
                "Failed to record transaction for {}: {}",
                input.payment_intent_id,
                e
            );
            EventOutcome::StorageFailed
        }
    }
}

/// Axum handler for Stripe webhooks.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = extract_signature(&headers)?;
    let event = verify_webhook(
        &body,
        &signature,
        &state.webhook_secret,
        state.webhook_tolerance_secs,
    )?;

    tracing::info!(
        "Received webhook event: {} ({})",
        event.event_type,
        event.id.as_deref().unwrap_or("no id")
    );

    process_event(&state.db, parse_event(&event));

    Ok(Json(WebhookAck { received: true }))
}
