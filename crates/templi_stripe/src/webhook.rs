// --- File: crates/templi_stripe/src/webhook.rs ---
//! Stripe webhook verification and dispatch.
//!
//! A delivery is either rejected at signature verification (nothing else runs)
//! or verified, parsed, deduplicated and dispatched. Once verified the
//! delivery is always acknowledged, whatever the handler does.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use templi_config::WebhookConfig;
use tracing::{debug, error, info, warn};

use crate::error::StripeError;
use crate::idempotency::ProcessedEvents;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `t=<unix>,v1=<hex>[,v1=<hex>...]`.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// --- Event Types ---

/// Represents the `data` field within a Stripe Event.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeEventData {
    /// Shape depends on the event type.
    pub object: serde_json::Value,
}

/// Represents the outer Stripe Event object.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String, // e.g., "checkout.session.completed"
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub livemode: bool,
    pub data: StripeEventData,
}

/// `data.object` of a `checkout.session.completed` event.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeCheckoutSessionObject {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub payment_status: Option<String>, // e.g., "paid", "unpaid", "no_payment_required"
    pub client_reference_id: Option<String>,
}

/// `data.object` of the `customer.subscription.*` events.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeSubscriptionObject {
    pub id: String,
    pub status: Option<String>,
    pub customer: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

/// What the dispatcher did with a verified, first-seen event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Handled,
    /// Unknown type: logged and acknowledged.
    Unhandled,
}

/// Result of a delivery that passed verification. Every variant is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookReceipt {
    Dispatched(EventDisposition),
    /// The event id was already processed; handlers did not run again.
    Duplicate,
    /// A handler failed; the error was logged.
    HandlerFailed,
}

// --- Signature Verification ---

fn signed_payload_mac(
    secret: &str,
    timestamp: &str,
    payload: &[u8],
) -> Result<HmacSha256, StripeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        StripeError::WebhookSignatureError("Invalid webhook secret format for HMAC".to_string())
    })?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex `v1` signature Stripe would send for `payload` at `timestamp`.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, StripeError> {
    let mac = signed_payload_mac(secret, &timestamp.to_string(), payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies the signature of an incoming Stripe webhook request.
///
/// # Arguments
/// * `payload_bytes` - The raw request body bytes, exactly as received.
/// * `sig_header` - The value of the 'Stripe-Signature' header.
/// * `secret` - The webhook signing secret (whsec_...).
/// * `tolerance_secs` - Maximum allowed distance between the signed timestamp and now.
pub fn verify_stripe_signature(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), StripeError> {
    verify_stripe_signature_at(
        payload_bytes,
        sig_header,
        secret,
        tolerance_secs,
        Utc::now().timestamp(),
    )
}

pub(crate) fn verify_stripe_signature_at(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), StripeError> {
    let sig_header_value = sig_header.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing Stripe-Signature header".to_string())
    })?;
    debug!("[Stripe Webhook] Stripe-Signature header: {}", sig_header_value);

    let mut timestamp_str: Option<&str> = None;
    let mut v1_signatures_hex: Vec<&str> = Vec::new();

    for item in sig_header_value.split(',') {
        if let Some((key, value)) = item.trim().split_once('=') {
            match key {
                "t" => timestamp_str = Some(value),
                "v1" => v1_signatures_hex.push(value),
                _ => {} // Ignore other schemes like v0
            }
        }
    }

    let timestamp_str = timestamp_str.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing timestamp 't' in Stripe-Signature".to_string())
    })?;
    let parsed_timestamp = timestamp_str.parse::<i64>().map_err(|_| {
        StripeError::WebhookSignatureError(
            "Invalid timestamp format in Stripe-Signature".to_string(),
        )
    })?;

    if v1_signatures_hex.is_empty() {
        return Err(StripeError::WebhookSignatureError(
            "Missing v1 signature in Stripe-Signature".to_string(),
        ));
    }

    // abs_diff cannot overflow, whatever `t` the sender put in
    let tolerance = u64::try_from(tolerance_secs).unwrap_or(0);
    if now.abs_diff(parsed_timestamp) > tolerance {
        warn!(
            "[Stripe Webhook] Timestamp outside tolerance. Current: {}, Event: {}",
            now, parsed_timestamp
        );
        return Err(StripeError::WebhookSignatureError(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    // Sign the header text as received, not a re-rendered number.
    let mac = signed_payload_mac(secret, timestamp_str, payload_bytes)?;

    for provided_sig_hex in v1_signatures_hex {
        let Ok(provided) = hex::decode(provided_sig_hex) else {
            continue;
        };
        // verify_slice compares in constant time
        if mac.clone().verify_slice(&provided).is_ok() {
            return Ok(());
        }
    }

    Err(StripeError::WebhookSignatureError(
        "No signatures found matching the expected signature for payload".to_string(),
    ))
}

// --- Event Processing ---

/// Parses a verified body into a [`StripeEvent`].
pub fn parse_event(payload_bytes: &[u8]) -> Result<StripeEvent, StripeError> {
    serde_json::from_slice(payload_bytes).map_err(|e| {
        error!("[Stripe Webhook] Failed to deserialize event: {}", e);
        StripeError::WebhookPayloadError("Invalid payload".to_string())
    })
}

/// Runs the handler for the event's type.
pub fn dispatch_event(event: &StripeEvent) -> Result<EventDisposition, StripeError> {
    info!(
        "[Stripe Webhook] Processing event {} of type {} (livemode: {})",
        event.id, event.event_type, event.livemode
    );

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSessionObject = parse_object(event)?;
            let user_id = session.client_reference_id.as_deref().or_else(|| {
                session
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("userId"))
                    .map(String::as_str)
            });
            info!(
                "[Stripe Webhook] Payment successful: session {}, user {:?}, subscription {:?}, customer {:?}, payment status {:?}",
                session.id, user_id, session.subscription, session.customer, session.payment_status
            );
        }
        "customer.subscription.deleted" => {
            let subscription: StripeSubscriptionObject = parse_object(event)?;
            info!(
                "[Stripe Webhook] Subscription cancelled: {}, user {:?}, customer {:?}",
                subscription.id,
                subscription_user_id(&subscription),
                subscription.customer
            );
        }
        "customer.subscription.created" | "customer.subscription.updated" => {
            let subscription: StripeSubscriptionObject = parse_object(event)?;
            info!(
                "[Stripe Webhook] Subscription {} is now {:?} (user {:?}, event {})",
                subscription.id,
                subscription.status,
                subscription_user_id(&subscription),
                event.event_type
            );
        }
        _ => {
            info!("[Stripe Webhook] Unhandled event type {}", event.event_type);
            return Ok(EventDisposition::Unhandled);
        }
    }
    Ok(EventDisposition::Handled)
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T, StripeError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        StripeError::WebhookProcessingError(format!(
            "Failed to parse {} object: {}",
            event.event_type, e
        ))
    })
}

fn subscription_user_id(subscription: &StripeSubscriptionObject) -> Option<&str> {
    subscription
        .metadata
        .as_ref()
        .and_then(|m| m.get("userId"))
        .map(String::as_str)
}

/// Verifies, parses, deduplicates and dispatches one webhook delivery.
///
/// Errors mean the delivery was rejected (bad signature, unreadable body, or no
/// signing secret configured). Handler failures are logged and still yield
/// `Ok` so Stripe gets its acknowledgment.
pub fn handle_webhook(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    webhook_secret: Option<&str>,
    webhook_config: &WebhookConfig,
    processed_events: &ProcessedEvents,
) -> Result<WebhookReceipt, StripeError> {
    let secret = webhook_secret.filter(|s| !s.is_empty()).ok_or_else(|| {
        StripeError::ConfigError("STRIPE_WEBHOOK_SECRET is not set".to_string())
    })?;

    verify_stripe_signature(
        payload_bytes,
        sig_header,
        secret,
        webhook_config.tolerance_secs,
    )?;
    debug!("[Stripe Webhook] Signature verified");

    let event = parse_event(payload_bytes)?;

    if !processed_events.check_and_record(&event.id) {
        info!(
            "[Stripe Webhook] Event {} ({}) already processed, acknowledging duplicate",
            event.id, event.event_type
        );
        return Ok(WebhookReceipt::Duplicate);
    }

    match dispatch_event(&event) {
        Ok(disposition) => Ok(WebhookReceipt::Dispatched(disposition)),
        Err(e) => {
            error!(
                "[Stripe Webhook] Handler for event {} failed: {}",
                event.id, e
            );
            Ok(WebhookReceipt::HandlerFailed)
        }
    }
}
