/*
[INPUT]:  Auth provider session and its state-change notifications
[OUTPUT]: Which top-level view to show (auth form or task list)
[POS]:    Application layer - session-driven view routing
[UPDATE]: When view routing rules or auth events change
*/

use std::sync::Arc;

use taskdeck_adapter::{AuthProvider, AuthStateChange, AuthSubscription, Session};
use tracing::{error, info};

/// View selected by the gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateView<'a> {
    SignedOut,
    SignedIn(&'a Session),
}

/// Effect of one notification on the selected view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    Unchanged,
    /// A session appeared, or a different user signed in
    SignedIn,
    SignedOut,
}

/// Observes the provider's session; never mutates it.
pub struct SessionGate {
    auth: Arc<dyn AuthProvider>,
    session: Option<Session>,
    subscription: Option<AuthSubscription>,
}

impl SessionGate {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            session: None,
            subscription: None,
        }
    }

    /// Subscribe to notifications, then fetch the current session once.
    ///
    /// A failed fetch is logged and treated as signed out.
    pub async fn mount(&mut self) -> GateView<'_> {
        self.subscription = Some(self.auth.on_auth_state_change());

        self.session = match self.auth.get_session().await {
            Ok(session) => session,
            Err(err) => {
                error!(error = %err, "failed to fetch current session");
                None
            }
        };
        info!(signed_in = self.session.is_some(), "session gate mounted");
        self.view()
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Next notification; `None` when unmounted or the provider went away
    pub async fn next_change(&mut self) -> Option<AuthStateChange> {
        let subscription = self.subscription.as_mut()?;
        let change = subscription.recv().await;
        if change.is_none() {
            self.subscription = None;
        }
        change
    }

    pub fn apply(&mut self, change: AuthStateChange) -> GateTransition {
        let before = self.session.as_ref().map(|session| session.user.id);
        self.session = change.session;
        let after = self.session.as_ref().map(|session| session.user.id);

        let transition = match (before, after) {
            (None, Some(_)) => GateTransition::SignedIn,
            (Some(_), None) => GateTransition::SignedOut,
            (Some(old), Some(new)) if old != new => GateTransition::SignedIn,
            _ => GateTransition::Unchanged,
        };
        if transition != GateTransition::Unchanged {
            info!(event = ?change.event, transition = ?transition, "session changed");
        }
        transition
    }

    pub fn view(&self) -> GateView<'_> {
        match &self.session {
            Some(session) => GateView::SignedIn(session),
            None => GateView::SignedOut,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Unsubscribe; the last observed session is kept
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_adapter::{AuthEvent, MemoryBackend, Operation};

    #[tokio::test]
    async fn test_mount_without_session_shows_form() {
        let backend = Arc::new(MemoryBackend::new());
        let mut gate = SessionGate::new(backend);

        assert_eq!(gate.mount().await, GateView::SignedOut);
        assert!(gate.is_mounted());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_signed_out() {
        let backend = MemoryBackend::new().signed_in("a@x.io");
        backend.fail(Operation::GetSession, "offline");
        let mut gate = SessionGate::new(Arc::new(backend));

        assert_eq!(gate.mount().await, GateView::SignedOut);
    }

    #[tokio::test]
    async fn test_notifications_drive_the_view() {
        let backend = Arc::new(MemoryBackend::new().with_user("a@x.io", "pw", "Ada"));
        let mut gate = SessionGate::new(backend.clone());
        gate.mount().await;

        backend.sign_in_with_password("a@x.io", "pw").await.unwrap();
        let change = gate.next_change().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedIn);
        assert_eq!(gate.apply(change), GateTransition::SignedIn);
        assert!(matches!(gate.view(), GateView::SignedIn(session) if session.email() == Some("a@x.io")));

        backend.sign_out().await.unwrap();
        let change = gate.next_change().await.unwrap();
        assert_eq!(gate.apply(change), GateTransition::SignedOut);
        assert_eq!(gate.view(), GateView::SignedOut);
    }

    #[tokio::test]
    async fn test_token_refresh_keeps_view() {
        let backend = Arc::new(MemoryBackend::new().signed_in("a@x.io"));
        let mut gate = SessionGate::new(backend.clone());
        gate.mount().await;

        let mut refreshed = gate.session().cloned().unwrap();
        refreshed.access_token = "rotated".to_string();
        let transition = gate.apply(AuthStateChange {
            event: AuthEvent::TokenRefreshed,
            session: Some(refreshed),
        });

        assert_eq!(transition, GateTransition::Unchanged);
        assert_eq!(gate.session().map(|s| s.access_token.as_str()), Some("rotated"));
    }

    #[tokio::test]
    async fn test_teardown_unsubscribes() {
        let backend = Arc::new(MemoryBackend::new());
        let mut gate = SessionGate::new(backend);
        gate.mount().await;
        gate.teardown();

        assert!(!gate.is_mounted());
        assert!(gate.next_change().await.is_none());
    }
}
