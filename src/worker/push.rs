//! Push notification rendering and click routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Notification title.
pub const NOTIFICATION_TITLE: &str = "Guess the Number";

/// Body used when the push carries no text.
pub const DEFAULT_BODY: &str = "A new game is waiting!";

/// Vibration pattern in milliseconds: on, off, on.
pub const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

/// Action id that opens the game.
pub const ACTION_EXPLORE: &str = "explore";

/// Action id that only dismisses.
pub const ACTION_CLOSE: &str = "close";

/// An incoming push message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushEvent {
    /// Text payload, if any.
    pub data: Option<String>,
}

impl PushEvent {
    /// A push with a text payload.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            data: Some(text.into()),
        }
    }
}

/// One button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Payload attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub date_of_arrival: DateTime<Utc>,
    pub primary_key: u32,
}

/// A rendered notification, serialised in the shape a browser's
/// `showNotification` options expect (plus the title).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Renders the notification for `event`, stamped with `now`.
    #[must_use]
    pub fn render(event: &PushEvent, icon: &str, now: DateTime<Utc>) -> Self {
        let action = |id: &str, title: &str| NotificationAction {
            action: id.to_string(),
            title: title.to_string(),
            icon: icon.to_string(),
        };
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: event
                .data
                .clone()
                .unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: icon.to_string(),
            badge: icon.to_string(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: NotificationData {
                date_of_arrival: now,
                primary_key: 1,
            },
            actions: vec![action(ACTION_EXPLORE, "Play"), action(ACTION_CLOSE, "Dismiss")],
        }
    }
}

/// What a notification click resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Close the notification and open the game page.
    OpenWindow(String),
    /// Close the notification.
    Dismiss,
}

impl ClickAction {
    /// Routes a click on `action` (empty for the notification body itself).
    #[must_use]
    pub fn for_action(action: &str, page: &str) -> Self {
        if action == ACTION_EXPLORE {
            Self::OpenWindow(page.to_string())
        } else {
            Self::Dismiss
        }
    }
}

/// Displays rendered notifications.
pub trait Notifier: Send + Sync {
    /// Shows the notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be delivered.
    fn show(&self, notification: &Notification) -> Result<()>;
}

/// [`Notifier`] that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
        log::info!("Notification: {}: {}", notification.title, notification.body);
        Ok(())
    }
}
