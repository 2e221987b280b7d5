use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CartEntry, CheckoutPayload};

/// Event types published by the storefront
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CheckoutEventType {
    CheckoutCompleted,
}

impl std::fmt::Display for CheckoutEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutEventType::CheckoutCompleted => write!(f, "CheckoutCompleted"),
        }
    }
}

/// OpenTelemetry span context data for distributed tracing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanContextData {
    pub trace_id: String,
    pub span_id: String,
    pub trace_flags: String,
}

impl Default for SpanContextData {
    fn default() -> Self {
        Self {
            trace_id: "00000000000000000000000000000000".to_string(),
            span_id: "0000000000000000".to_string(),
            trace_flags: "00".to_string(),
        }
    }
}

/// A completed checkout on its way to the downstream bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutEvent {
    pub event_type: CheckoutEventType,
    pub order_id: String,
    pub session_id: String,
    pub cart_items: Vec<CartEntry>,
    pub total_amount: Decimal,
    pub span_context: SpanContextData,
    pub timestamp: DateTime<Utc>,
}

impl CheckoutEvent {
    pub fn checkout_completed(payload: &CheckoutPayload, span_context: SpanContextData) -> Self {
        Self {
            event_type: CheckoutEventType::CheckoutCompleted,
            order_id: payload.order_id.clone(),
            session_id: payload.session_id.clone(),
            cart_items: payload.cart_items.clone(),
            total_amount: payload.total_amount,
            span_context,
            timestamp: payload.checked_out_at,
        }
    }
}

/// EventBridge event payload structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    pub source: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub detail: EventDetail,
    pub resources: Vec<String>,
    pub time: DateTime<Utc>,
}

/// Event detail structure for EventBridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetail {
    pub event_type: String,
    pub order_id: String,
    pub session_id: String,
    #[serde(rename = "cartItems")]
    pub cart_items: Vec<CartEntry>,
    #[serde(rename = "totalAmount")]
    pub total_amount: Decimal,
    pub item_count: usize,
    pub span_context: SpanContextData,
}

impl EventPayload {
    pub fn from_event(event: CheckoutEvent, source: &str) -> Self {
        let detail_type = event.event_type.to_string();
        let resources = vec![format!("order/{}", event.order_id)];
        let detail = EventDetail {
            event_type: detail_type.clone(),
            item_count: event.cart_items.len(),
            order_id: event.order_id,
            session_id: event.session_id,
            cart_items: event.cart_items,
            total_amount: event.total_amount,
            span_context: event.span_context,
        };

        Self {
            source: source.to_string(),
            detail_type,
            detail,
            resources,
            time: event.timestamp,
        }
    }
}

/// Upper bound on EventBridge delivery attempts per checkout
pub const MAX_EVENT_RETRY_ATTEMPTS: u32 = 5;

/// Configuration for EventBridge settings
#[derive(Debug, Clone)]
pub struct EventConfig {
    pub event_bus_name: String,
    pub source_name: String,
    pub retry_attempts: u32,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            event_bus_name: "default".to_string(),
            source_name: "spa.storefront".to_string(),
            retry_attempts: 3,
        }
    }
}
