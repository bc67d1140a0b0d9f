//! Session state and change notification.
//!
//! Sessions are issued by the backend's auth service; this module only holds
//! the current one and tells subscribers when it changes. The reconcilers
//! treat these transitions as the sole trigger for re-fetching or clearing
//! their local state.

use std::sync::Arc;

use bazaar_core::UserId;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{clear_sentry_user, set_sentry_user};

/// Role claim carried by the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An authenticated user context.
#[derive(Clone)]
pub struct Session {
    pub user_id: UserId,
    /// Bearer token sent with every remote call.
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub role: Role,
}

impl Session {
    #[must_use]
    pub fn new(
        user_id: UserId,
        access_token: SecretString,
        expires_at: DateTime<Utc>,
        role: Role,
    ) -> Self {
        Self {
            user_id,
            access_token,
            expires_at,
            role,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("role", &self.role)
            .finish()
    }
}

/// A session transition as seen by one subscriber.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session for a user became active. Also emitted when the session is
    /// replaced by one for a different user.
    Acquired(Session),
    /// The token was replaced for the same user.
    Refreshed(Session),
    /// The user signed out.
    Cleared,
}

/// Holds the current session and broadcasts changes.
///
/// Cheaply cloneable; all clones share the same session.
#[derive(Clone)]
pub struct SessionProvider {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionProvider {
    #[must_use]
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// The active session, if any.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// User of the active session, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.tx.borrow().as_ref().map(|s| s.user_id.clone())
    }

    /// Install a freshly issued session.
    pub fn sign_in(&self, session: Session) {
        tracing::info!(user_id = %session.user_id, "Session acquired");
        set_sentry_user(&session.user_id);
        self.tx.send_replace(Some(session));
    }

    /// Replace the token of the active session.
    pub fn refresh(&self, session: Session) {
        tracing::debug!(user_id = %session.user_id, "Session refreshed");
        set_sentry_user(&session.user_id);
        self.tx.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.tx.send_replace(None) {
            tracing::info!(user_id = %previous.user_id, "Session cleared");
        }
        clear_sentry_user();
    }

    /// Subscribe to transitions after the current state.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        let rx = self.tx.subscribe();
        let last_user = rx.borrow().as_ref().map(|s| s.user_id.clone());
        SessionSubscription { rx, last_user }
    }
}

/// Receiving side of [`SessionProvider::subscribe`].
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
    last_user: Option<UserId>,
}

impl SessionSubscription {
    /// Wait for the next transition.
    ///
    /// Rapid changes are coalesced; only the latest session is reported.
    /// Returns `None` once every provider handle has been dropped.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            self.rx.changed().await.ok()?;
            let current = self.rx.borrow_and_update().clone();

            let event = match (self.last_user.take(), current) {
                (None, None) => None,
                (Some(_), None) => Some(SessionEvent::Cleared),
                (Some(previous), Some(session)) if previous == session.user_id => {
                    self.last_user = Some(previous);
                    Some(SessionEvent::Refreshed(session))
                }
                (_, Some(session)) => {
                    self.last_user = Some(session.user_id.clone());
                    Some(SessionEvent::Acquired(session))
                }
            };

            if event.is_some() {
                return event;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn session(user: &str) -> Session {
        Session::new(
            UserId::new(user),
            SecretString::from("token"),
            Utc::now() + Duration::hours(1),
            Role::Customer,
        )
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut s = session("u1");
        s.access_token = SecretString::from("eyJhbGciOiJIUzI1NiJ9.super-secret");
        let debug = format!("{s:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[tokio::test]
    async fn test_subscription_reports_transitions() {
        let provider = SessionProvider::default();
        let mut sub = provider.subscribe();

        provider.sign_in(session("u1"));
        assert!(matches!(
            sub.next_event().await,
            Some(SessionEvent::Acquired(s)) if s.user_id == UserId::new("u1")
        ));

        provider.refresh(session("u1"));
        assert!(matches!(sub.next_event().await, Some(SessionEvent::Refreshed(_))));

        provider.sign_in(session("u2"));
        assert!(matches!(
            sub.next_event().await,
            Some(SessionEvent::Acquired(s)) if s.user_id == UserId::new("u2")
        ));

        provider.sign_out();
        assert!(matches!(sub.next_event().await, Some(SessionEvent::Cleared)));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_provider_dropped() {
        let provider = SessionProvider::default();
        let mut sub = provider.subscribe();
        drop(provider);
        assert!(sub.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_silent() {
        let provider = SessionProvider::default();
        let mut sub = provider.subscribe();
        provider.sign_out();
        provider.sign_in(session("u1"));
        assert!(matches!(sub.next_event().await, Some(SessionEvent::Acquired(_))));
    }
}
