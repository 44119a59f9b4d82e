//! Session storage for a pending password reset token.

use tower_sessions::Session;
use tracing::warn;

/// Session key holding the reset token.
pub const RESET_TOKEN_KEY: &str = "pass_reset_token";

/// Holds at most one reset token per session.
///
/// The token is opaque here: it is neither validated nor persisted outside
/// the session, and it disappears with the session.
pub struct ResetTokenSlot<'a> {
    session: &'a Session,
}

impl<'a> ResetTokenSlot<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Returns the stored token. Unreadable session data counts as absent.
    pub async fn get(&self) -> Option<String> {
        match self.session.get::<String>(RESET_TOKEN_KEY).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read reset token from session");
                None
            }
        }
    }

    /// Stores a token, replacing any previous one.
    pub async fn set(&self, token: &str) -> Result<(), tower_sessions::session::Error> {
        self.session.insert(RESET_TOKEN_KEY, token).await
    }

    /// Removes the token.
    pub async fn clear(&self) -> Result<(), tower_sessions::session::Error> {
        self.session.remove::<String>(RESET_TOKEN_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn test_set_get_clear() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let slot = ResetTokenSlot::new(&session);

        assert_eq!(slot.get().await, None);

        slot.set("XYZ").await.unwrap();
        assert_eq!(slot.get().await.as_deref(), Some("XYZ"));

        slot.set("ABC").await.unwrap();
        assert_eq!(slot.get().await.as_deref(), Some("ABC"));

        slot.clear().await.unwrap();
        assert_eq!(slot.get().await, None);
    }
}
