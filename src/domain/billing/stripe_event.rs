//! Stripe webhook event types.
//!
//! Defines the envelope and payload structures for parsing Stripe
//! webhook deliveries. Only fields relevant to entitlement
//! reconciliation are captured; everything else in Stripe's schema is
//! ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::webhook_errors::WebhookError;

/// Stripe webhook event envelope (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    pub livemode: bool,

    /// API version used to render this event.
    pub api_version: String,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl StripeEvent {
    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::from_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Stripe event types this service reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,
    /// Customer subscription was created.
    CustomerSubscriptionCreated,
    /// Customer subscription was updated.
    CustomerSubscriptionUpdated,
    /// Customer subscription was deleted.
    CustomerSubscriptionDeleted,
    /// Invoice payment succeeded.
    InvoicePaymentSucceeded,
    /// Invoice payment failed.
    InvoicePaymentFailed,
    /// Unknown or unhandled event type.
    Unknown,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CustomerSubscriptionCreated => "customer.subscription.created",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Payload objects
// ══════════════════════════════════════════════════════════════

/// Reference to a Stripe price object, as nested in line items.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceRef {
    pub id: String,
}

/// Checkout session payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Session id (cs_xxx format).
    pub id: String,

    /// Provider customer id, if the session is tied to a customer.
    pub customer: Option<String>,

    /// Provider subscription id created by the session, if any.
    pub subscription: Option<String>,

    /// Metadata attached when the session was minted.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// Returns the price id our checkout flow stamps into session metadata.
    pub fn metadata_price_id(&self) -> Option<&str> {
        self.metadata.get("price_id").map(String::as_str)
    }
}

/// Subscription payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionObject {
    /// Subscription id (sub_xxx format).
    pub id: String,

    /// Provider customer id.
    pub customer: String,

    /// Subscription status as the provider reports it
    /// ("active", "trialing", "past_due", ...).
    pub status: String,

    /// End of the current billing period (Unix timestamp).
    pub current_period_end: Option<i64>,

    /// Whether the subscription is set to cancel at period end.
    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Subscription line items; the first item's price decides the plan.
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl SubscriptionObject {
    /// Price id of the first line item, if present.
    pub fn first_price_id(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
    }
}

/// Container for subscription line items.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// A single subscription line item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItem {
    pub price: Option<PriceRef>,
}

/// Invoice payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceObject {
    /// Invoice id (in_xxx format).
    pub id: String,

    /// Provider customer id.
    pub customer: Option<String>,

    /// Provider subscription id the invoice bills, if any.
    pub subscription: Option<String>,

    /// Invoice line items; the first line's price decides the plan.
    #[serde(default)]
    pub lines: InvoiceLines,
}

impl InvoiceObject {
    /// Price id of the first invoice line, if present.
    pub fn first_price_id(&self) -> Option<&str> {
        self.lines
            .data
            .first()
            .and_then(|line| line.price.as_ref())
            .map(|price| price.id.as_str())
    }
}

/// Container for invoice line items.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvoiceLines {
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

/// A single invoice line item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceLine {
    pub price: Option<PriceRef>,
}

// ══════════════════════════════════════════════════════════════
// Typed event union
// ══════════════════════════════════════════════════════════════

/// A webhook event with its payload deserialized into the matching type.
///
/// One variant per event type the dispatcher handles, plus a catch-all
/// for everything else. Produced from a verified envelope; an envelope
/// of a handled type whose payload does not deserialize is a contract
/// violation and surfaces as `WebhookError::MalformedEvent`.
#[derive(Debug, Clone)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSessionObject),
    SubscriptionCreated(SubscriptionObject),
    SubscriptionUpdated(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    InvoicePaymentSucceeded(InvoiceObject),
    InvoicePaymentFailed(InvoiceObject),
    Unknown { event_type: String },
}

impl BillingEvent {
    /// Deserializes the envelope's payload according to its event type.
    pub fn from_envelope(event: &StripeEvent) -> Result<Self, WebhookError> {
        let malformed = |e: serde_json::Error| WebhookError::MalformedEvent {
            event_type: event.event_type.clone(),
            reason: e.to_string(),
        };

        match event.parsed_type() {
            StripeEventType::CheckoutSessionCompleted => Ok(BillingEvent::CheckoutCompleted(
                event.deserialize_object().map_err(malformed)?,
            )),
            StripeEventType::CustomerSubscriptionCreated => Ok(BillingEvent::SubscriptionCreated(
                event.deserialize_object().map_err(malformed)?,
            )),
            StripeEventType::CustomerSubscriptionUpdated => Ok(BillingEvent::SubscriptionUpdated(
                event.deserialize_object().map_err(malformed)?,
            )),
            StripeEventType::CustomerSubscriptionDeleted => Ok(BillingEvent::SubscriptionDeleted(
                event.deserialize_object().map_err(malformed)?,
            )),
            StripeEventType::InvoicePaymentSucceeded => Ok(BillingEvent::InvoicePaymentSucceeded(
                event.deserialize_object().map_err(malformed)?,
            )),
            StripeEventType::InvoicePaymentFailed => Ok(BillingEvent::InvoicePaymentFailed(
                event.deserialize_object().map_err(malformed)?,
            )),
            StripeEventType::Unknown => Ok(BillingEvent::Unknown {
                event_type: event.event_type.clone(),
            }),
        }
    }
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    previous_attributes: Option<serde_json::Value>,
    livemode: bool,
    api_version: String,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "customer.subscription.updated".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            previous_attributes: None,
            livemode: false,
            api_version: "2023-10-16".to_string(),
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: StripeEventData {
                object: self.object,
                previous_attributes: self.previous_attributes,
            },
            livemode: self.livemode,
            api_version: self.api_version,
        }
    }
}
