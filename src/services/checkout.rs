use async_trait::async_trait;
use aws_sdk_eventbridge::Client as EventBridgeClient;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::models::{
    CheckoutEvent, CheckoutPayload, EventConfig, EventPayload, Notification, SpanContextData,
    CHECKOUT_TOAST_DURATION_MS, MAX_EVENT_RETRY_ATTEMPTS,
};
use crate::observability::Metrics;
use crate::services::{CartStore, Notifier};

const RETRY_BASE_DELAY_MS: u64 = 100;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Backoff before retry number `attempt` (1-based): doubles from 100ms, capped at 2s
fn retry_delay(attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(factor)).min(MAX_RETRY_DELAY)
}

/// Errors raised while handing a checkout to its destination
#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("EventBridge SDK error: {0}")]
    EventBridgeSdk(
        #[from] SdkError<aws_sdk_eventbridge::operation::put_events::PutEventsError, Response>,
    ),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("EventBridge entry failed: {code} - {message}")]
    EntryFailed { code: String, message: String },
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Destination that receives the cart when the user checks out
#[async_trait]
pub trait HandoffSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, payload: &CheckoutPayload) -> Result<(), HandoffError>;
}

/// In-process checkout screen; keeps delivered payloads per session
#[derive(Debug, Default)]
pub struct CheckoutScreen {
    delivered: RwLock<HashMap<String, Vec<CheckoutPayload>>>,
}

impl CheckoutScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivered_for(&self, session_id: &str) -> Vec<CheckoutPayload> {
        self.delivered
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl HandoffSink for CheckoutScreen {
    fn name(&self) -> &'static str {
        "screen"
    }

    async fn deliver(&self, payload: &CheckoutPayload) -> Result<(), HandoffError> {
        self.delivered
            .write()
            .await
            .entry(payload.session_id.clone())
            .or_default()
            .push(payload.clone());
        Ok(())
    }
}

/// Publishes `CheckoutCompleted` events to an EventBridge bus
#[derive(Clone)]
pub struct EventBridgeHandoff {
    client: Arc<EventBridgeClient>,
    config: EventConfig,
}

impl EventBridgeHandoff {
    #[allow(clippy::result_large_err)]
    pub fn new(client: EventBridgeClient, config: EventConfig) -> Result<Self, HandoffError> {
        if config.event_bus_name.is_empty() {
            return Err(HandoffError::InvalidConfig(
                "Event bus name cannot be empty".to_string(),
            ));
        }

        if config.source_name.is_empty() {
            return Err(HandoffError::InvalidConfig(
                "Source name cannot be empty".to_string(),
            ));
        }

        if config.retry_attempts == 0 {
            return Err(HandoffError::InvalidConfig(
                "Retry attempts must be at least 1".to_string(),
            ));
        }

        if config.retry_attempts > MAX_EVENT_RETRY_ATTEMPTS {
            return Err(HandoffError::InvalidConfig(format!(
                "Retry attempts cannot exceed {}",
                MAX_EVENT_RETRY_ATTEMPTS
            )));
        }

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    /// Emit event with exponential backoff retry logic
    async fn emit_with_retry(&self, payload: EventPayload) -> Result<(), HandoffError> {
        let mut attempts = 0;
        let max_attempts = self.config.retry_attempts;

        while attempts < max_attempts {
            match self.send_to_eventbridge(&payload).await {
                Ok(_) => {
                    info!(
                        event_type = %payload.detail_type,
                        order_id = %payload.detail.order_id,
                        attempt = attempts + 1,
                        "Event successfully emitted to EventBridge"
                    );
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;

                    if attempts >= max_attempts {
                        error!(
                            event_type = %payload.detail_type,
                            order_id = %payload.detail.order_id,
                            attempts = attempts,
                            error = %e,
                            "Failed to emit event after maximum retry attempts"
                        );
                        return Err(HandoffError::MaxRetriesExceeded);
                    }

                    let delay = retry_delay(attempts);
                    warn!(
                        event_type = %payload.detail_type,
                        order_id = %payload.detail.order_id,
                        attempt = attempts,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Event emission failed, retrying"
                    );

                    sleep(delay).await;
                }
            }
        }

        Err(HandoffError::MaxRetriesExceeded)
    }

    async fn send_to_eventbridge(&self, payload: &EventPayload) -> Result<(), HandoffError> {
        let detail_json = serde_json::to_string(&payload.detail)?;
        let aws_time = aws_smithy_types::DateTime::from_secs(payload.time.timestamp());

        let mut entry_builder = aws_sdk_eventbridge::types::PutEventsRequestEntry::builder()
            .event_bus_name(&self.config.event_bus_name)
            .source(&payload.source)
            .detail_type(&payload.detail_type)
            .detail(detail_json)
            .time(aws_time);

        for resource in &payload.resources {
            entry_builder = entry_builder.resources(resource);
        }

        let response = self
            .client
            .put_events()
            .entries(entry_builder.build())
            .send()
            .await?;

        for entry in response.entries() {
            if let Some(error_code) = entry.error_code() {
                let message = entry.error_message().unwrap_or("Unknown error");
                error!(
                    error_code = error_code,
                    error_message = message,
                    "EventBridge entry failed"
                );
                return Err(HandoffError::EntryFailed {
                    code: error_code.to_string(),
                    message: message.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Extract OpenTelemetry span context from current tracing span
    pub fn extract_span_context() -> SpanContextData {
        use opentelemetry::trace::TraceContextExt;
        use tracing_opentelemetry::OpenTelemetrySpanExt;

        let current_span = tracing::Span::current();
        let context = current_span.context();

        let span = context.span();
        let span_context = span.span_context();
        if span_context.is_valid() {
            SpanContextData {
                trace_id: format!("{:032x}", span_context.trace_id()),
                span_id: format!("{:016x}", span_context.span_id()),
                trace_flags: format!("{:02x}", span_context.trace_flags()),
            }
        } else {
            SpanContextData::default()
        }
    }
}

#[async_trait]
impl HandoffSink for EventBridgeHandoff {
    fn name(&self) -> &'static str {
        "eventbridge"
    }

    #[instrument(skip(self, payload), fields(order_id = %payload.order_id))]
    async fn deliver(&self, payload: &CheckoutPayload) -> Result<(), HandoffError> {
        let event = CheckoutEvent::checkout_completed(payload, Self::extract_span_context());
        let event_payload = EventPayload::from_event(event, &self.config.source_name);

        self.emit_with_retry(event_payload).await
    }
}

/// Moves the cart and its total to the checkout destination
pub struct CheckoutHandoff {
    sink: Arc<dyn HandoffSink>,
    toast_duration_ms: u64,
    metrics: Option<Arc<Metrics>>,
}

impl CheckoutHandoff {
    pub fn new(sink: Arc<dyn HandoffSink>) -> Self {
        Self {
            sink,
            toast_duration_ms: CHECKOUT_TOAST_DURATION_MS,
            metrics: None,
        }
    }

    pub fn with_toast_duration_ms(mut self, toast_duration_ms: u64) -> Self {
        self.toast_duration_ms = toast_duration_ms;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Take the cart contents, deliver them with their total, and show the
    /// order-placed toast. A failed delivery is logged; the cart stays empty.
    #[instrument(skip(self, cart, notifier), fields(session_id = %session_id, sink = self.sink.name()))]
    pub async fn checkout(
        &self,
        session_id: &str,
        cart: &CartStore,
        notifier: &dyn Notifier,
    ) -> CheckoutPayload {
        let items = cart.take_all().await;
        let payload = CheckoutPayload::new(session_id.to_string(), items);

        crate::info_with_trace!(
            order_id = %payload.order_id,
            items = payload.cart_items.len(),
            total = %payload.total_amount,
            "Handing off checkout"
        );

        let delivered = match self.sink.deliver(&payload).await {
            Ok(()) => true,
            Err(e) => {
                crate::error_with_trace!(
                    order_id = %payload.order_id,
                    error = %e,
                    "Checkout hand-off failed"
                );
                false
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_checkout(self.sink.name(), delivered);
        }

        notifier
            .notify(Notification::checkout_succeeded(self.toast_duration_ms))
            .await;

        payload
    }
}
