use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Size;

/// Display time of the order-placed toast
pub const CHECKOUT_TOAST_DURATION_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AddConfirmed,
    DuplicateEntry,
    MissingSize,
    RemovalConfirmed,
    CheckoutSucceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastPosition {
    Top,
    Bottom,
}

/// How the front-end shows a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Presentation {
    /// Blocking dialog the user dismisses
    Alert,
    Toast {
        duration_ms: u64,
        position: ToastPosition,
    },
}

/// User-facing message produced by a cart or checkout operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub level: NotificationLevel,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub presentation: Presentation,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn alert(kind: NotificationKind, level: NotificationLevel, title: String) -> Self {
        Self {
            kind,
            level,
            title,
            message: None,
            presentation: Presentation::Alert,
            created_at: Utc::now(),
        }
    }

    pub fn add_confirmed(service_name: &str, size: Size) -> Self {
        Self::alert(
            NotificationKind::AddConfirmed,
            NotificationLevel::Info,
            format!("{} ({}) added to cart", service_name, size),
        )
    }

    pub fn duplicate_entry(service_name: &str, size: Size) -> Self {
        Self::alert(
            NotificationKind::DuplicateEntry,
            NotificationLevel::Warning,
            format!("{} ({}) is already in the cart", service_name, size),
        )
    }

    pub fn missing_size() -> Self {
        Self::alert(
            NotificationKind::MissingSize,
            NotificationLevel::Warning,
            "Please select a size".to_string(),
        )
    }

    pub fn removal_confirmed(service_name: &str) -> Self {
        Self::alert(
            NotificationKind::RemovalConfirmed,
            NotificationLevel::Info,
            format!("{} removed from cart", service_name),
        )
    }

    pub fn checkout_succeeded(duration_ms: u64) -> Self {
        Self {
            kind: NotificationKind::CheckoutSucceeded,
            level: NotificationLevel::Success,
            title: "Order placed".to_string(),
            message: Some("Thank you for your order!".to_string()),
            presentation: Presentation::Toast {
                duration_ms,
                position: ToastPosition::Bottom,
            },
            created_at: Utc::now(),
        }
    }
}
