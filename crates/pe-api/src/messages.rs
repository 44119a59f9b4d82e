//! User-facing flash messages.
//!
//! Messages are queued in the session and drained by the next page the user
//! sees. Delivery is fire-and-forget: callers never learn whether a message
//! was stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::warn;

/// Session key holding queued messages.
pub const FLASH_MESSAGES_KEY: &str = "messages";

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Status,
    Warning,
    Error,
}

/// A message queued for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: MessageLevel,
    pub text: String,
}

/// Channel for surfacing errors to the user.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Queues an error message for the user owning `session`.
    async fn add_error(&self, session: &Session, message: &str);
}

/// Messenger that queues messages in the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionMessenger;

impl SessionMessenger {
    async fn push(&self, session: &Session, message: FlashMessage) {
        let mut queued: Vec<FlashMessage> = session
            .get(FLASH_MESSAGES_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        queued.push(message);

        if let Err(e) = session.insert(FLASH_MESSAGES_KEY, queued).await {
            warn!(error = %e, "Failed to queue flash message");
        }
    }
}

#[async_trait]
impl Messenger for SessionMessenger {
    async fn add_error(&self, session: &Session, message: &str) {
        self.push(
            session,
            FlashMessage {
                level: MessageLevel::Error,
                text: message.to_string(),
            },
        )
        .await;
    }
}

/// Removes and returns every queued message.
pub async fn take_messages(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(FLASH_MESSAGES_KEY).await {
        Ok(messages) => messages.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}
