//! Request-scoped collection of validation and business-rule failures.

use serde::{Deserialize, Serialize};

/// Stable notification codes shared by the core.
pub mod codes {
    pub const VALIDATION: &str = "validation";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const STORAGE_UNAVAILABLE: &str = "storage_unavailable";
    pub const INVALID_REQUEST: &str = "invalid_request";
}

/// One validation or business-rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainNotification {
    pub code: String,
    pub message: String,
}

impl DomainNotification {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// A structural validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(codes::VALIDATION, message)
    }
}

impl std::fmt::Display for DomainNotification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Accumulates the notifications raised while handling one request.
///
/// Insertion order is kept and duplicates are allowed. Reading is
/// non-destructive, so the HTTP layer may inspect it any number of times.
#[derive(Debug, Clone, Default)]
pub struct NotificationCollector {
    notifications: Vec<DomainNotification>,
}

impl NotificationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, notification: DomainNotification) {
        self.notifications.push(notification);
    }

    pub fn has_notifications(&self) -> bool {
        !self.notifications.is_empty()
    }

    /// All notifications in the order they were added.
    pub fn get_notifications(&self) -> &[DomainNotification] {
        &self.notifications
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.notifications.iter().map(|n| n.message.as_str())
    }
}
