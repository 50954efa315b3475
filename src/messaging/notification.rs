// Notifications - Conditions the engine reports to its host
// Delivered through the notification ringbuffer, alongside tracing output

use std::time::{SystemTime, UNIX_EPOCH};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// What part of the system raised the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    /// Device resolution failures
    Routing,
    /// Output send failures
    Midi,
    /// Start/stop received from an external master
    Transport,
}

/// Notification with timestamp and metadata
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    pub timestamp: u64, // Unix timestamp in milliseconds
}

impl Notification {
    /// Creates a notification stamped with the current time
    pub fn new(level: NotificationLevel, category: NotificationCategory, message: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            level,
            category,
            message,
            timestamp,
        }
    }

    pub fn info(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }
}
