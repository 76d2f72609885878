/*
[INPUT]:  Backend HTTP client, optional session store, email/password credentials
[OUTPUT]: Sessions plus a broadcast of auth state changes
[POS]:    Auth layer - orchestrates sign-up, sign-in, refresh and sign-out
[UPDATE]: When auth endpoints or flow steps change
*/

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

use crate::http::client::SessionRefresher;
use crate::http::{BackendClient, BackendError, Result};

use super::session::TokenResponse;
use super::{AuthEvent, AuthStateChange, Session, SessionStore, User};

const EVENT_CAPACITY: usize = 16;

/// Client for the auth endpoints.
///
/// Holds the session in the shared [`BackendClient`] holder so that every other
/// client built from the same backend client sends the current access token.
/// Those clients renew an expired session through this client before sending.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: BackendClient,
    state: Arc<AuthState>,
}

/// Session persistence and notifications shared with the backend client
#[derive(Debug)]
struct AuthState {
    store: Option<SessionStore>,
    events: broadcast::Sender<AuthStateChange>,
    refreshing: Mutex<()>,
}

impl AuthClient {
    /// Create an auth client that keeps the session in memory only
    pub fn new(client: BackendClient) -> Self {
        Self::build(client, None)
    }

    /// Create an auth client that persists the session to `store`
    pub fn with_store(client: BackendClient, store: SessionStore) -> Self {
        Self::build(client, Some(store))
    }

    fn build(client: BackendClient, store: Option<SessionStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = Arc::new(AuthState {
            store,
            events,
            refreshing: Mutex::new(()),
        });
        client.set_refresher(state.clone());
        Self { client, state }
    }

    pub fn backend(&self) -> &BackendClient {
        &self.client
    }

    /// Access token of the current session, if any
    pub fn access_token(&self) -> Option<String> {
        self.client.session().access_token()
    }

    /// Subscribe to auth state changes from now on
    pub fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription::from_receiver(self.state.events.subscribe())
    }

    /// Current session, restoring it from disk and refreshing it when expired.
    ///
    /// A stored session whose refresh fails is discarded and reported as
    /// signed out rather than returned as an error.
    pub async fn get_session(&self) -> Result<Option<Session>> {
        let current = match self.client.session().get() {
            Some(session) => Some(session),
            None => self.state.restore(),
        };

        let Some(session) = current else {
            return Ok(None);
        };

        if !session.is_expired() {
            self.client.session().set(session.clone());
            return Ok(Some(session));
        }

        info!(user_id = %session.user.id, "stored session expired, refreshing");
        match refresh_with(&self.client, &session.refresh_token).await {
            Ok(refreshed) => {
                self.state.store_session(&self.client, &refreshed);
                self.state.emit(AuthEvent::TokenRefreshed, Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(err) => {
                warn!(error = %err, "session refresh failed, signing out locally");
                self.state.drop_session(&self.client);
                self.state.emit(AuthEvent::SignedOut, None);
                Ok(None)
            }
        }
    }

    /// Register a new account.
    ///
    /// POST /auth/v1/signup
    ///
    /// Returns `None` when the provider requires email confirmation before
    /// issuing a session.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<Session>> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "name": name },
        });

        let builder = self.client.request(Method::POST, "auth/v1/signup")?.json(&body);
        let response: Value = self.client.send_json(builder).await?;

        if response.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(response)?.into_session()?;
            info!(user_id = %session.user.id, "signed up");
            self.state.store_session(&self.client, &session);
            self.state.emit(AuthEvent::SignedIn, Some(session.clone()));
            return Ok(Some(session));
        }

        let user: User = serde_json::from_value(response.get("user").cloned().unwrap_or(response))?;
        info!(user_id = %user.id, "signed up, awaiting email confirmation");
        Ok(None)
    }

    /// POST /auth/v1/token?grant_type=password
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({
            "email": email,
            "password": password,
        });

        let builder = self
            .client
            .request(Method::POST, "auth/v1/token?grant_type=password")?
            .json(&body);
        let response: TokenResponse = self.client.send_json(builder).await?;
        let session = response.into_session()?;

        info!(user_id = %session.user.id, "signed in");
        self.state.store_session(&self.client, &session);
        self.state.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Exchange the current refresh token for a new session.
    ///
    /// POST /auth/v1/token?grant_type=refresh_token
    pub async fn refresh_session(&self) -> Result<Session> {
        let session = self.client.session().get().ok_or(BackendError::NotSignedIn)?;
        let refreshed = refresh_with(&self.client, &session.refresh_token).await?;
        self.state.store_session(&self.client, &refreshed);
        self.state.emit(AuthEvent::TokenRefreshed, Some(refreshed.clone()));
        Ok(refreshed)
    }

    /// End the session remotely and locally.
    ///
    /// POST /auth/v1/logout
    ///
    /// A token the provider no longer recognizes still signs out locally.
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(token) = self.access_token() {
            let builder = self
                .client
                .request(Method::POST, "auth/v1/logout")?
                .bearer_auth(token);
            match self.client.send_empty(builder).await {
                Ok(()) => {}
                Err(BackendError::Authentication { .. }) => {}
                Err(BackendError::Api { code, .. })
                    if code == StatusCode::NOT_FOUND.as_u16() || code == StatusCode::FORBIDDEN.as_u16() => {}
                Err(err) => return Err(err),
            }
        }

        info!("signed out");
        self.state.drop_session(&self.client);
        self.state.emit(AuthEvent::SignedOut, None);
        Ok(())
    }
}

impl AuthState {
    fn restore(&self) -> Option<Session> {
        let store = self.store.as_ref()?;
        match store.load() {
            Ok(session) => session,
            Err(err) => {
                warn!(path = %store.path().display(), error = %err, "stored session unreadable, ignoring");
                None
            }
        }
    }

    fn store_session(&self, client: &BackendClient, session: &Session) {
        client.session().set(session.clone());
        if let Some(store) = &self.store
            && let Err(err) = store.save(session)
        {
            warn!(path = %store.path().display(), error = %err, "failed to persist session");
        }
    }

    fn drop_session(&self, client: &BackendClient) {
        client.session().clear();
        if let Some(store) = &self.store
            && let Err(err) = store.clear()
        {
            warn!(path = %store.path().display(), error = %err, "failed to remove stored session");
        }
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        // No subscribers is fine.
        let _ = self.events.send(AuthStateChange { event, session });
    }
}

#[async_trait]
impl SessionRefresher for AuthState {
    /// A refresh the provider rejects ends the session; a transport failure
    /// keeps it so the request goes out with the stale token.
    async fn refresh_expired(&self, client: &BackendClient, expired: Session) -> Option<Session> {
        let _guard = self.refreshing.lock().await;
        // Another request may have refreshed or signed out while this one waited.
        let current = client.session().get()?;
        if current.access_token != expired.access_token && !current.is_expired() {
            return Some(current);
        }

        info!(user_id = %current.user.id, "access token expired, refreshing");
        match refresh_with(client, &current.refresh_token).await {
            Ok(refreshed) => {
                self.store_session(client, &refreshed);
                self.emit(AuthEvent::TokenRefreshed, Some(refreshed.clone()));
                Some(refreshed)
            }
            Err(err @ (BackendError::Authentication { .. } | BackendError::Api { .. })) => {
                warn!(error = %err, "session refresh rejected, signing out locally");
                self.drop_session(client);
                self.emit(AuthEvent::SignedOut, None);
                None
            }
            Err(err) => {
                warn!(error = %err, "session refresh failed, keeping current token");
                Some(current)
            }
        }
    }
}

async fn refresh_with(client: &BackendClient, refresh_token: &str) -> Result<Session> {
    let body = json!({ "refresh_token": refresh_token });
    let builder = client
        .request(Method::POST, "auth/v1/token?grant_type=refresh_token")?
        .json(&body);
    let response: TokenResponse = client.send_json(builder).await?;
    response.into_session()
}

/// Receiving end of [`AuthClient::on_auth_state_change`]; dropping it unsubscribes
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthStateChange>,
}

impl AuthSubscription {
    pub(crate) fn from_receiver(receiver: broadcast::Receiver<AuthStateChange>) -> Self {
        Self { receiver }
    }

    /// Next notification, or `None` once the auth client is gone.
    ///
    /// A subscriber that fell behind skips to the oldest notification still
    /// buffered.
    pub async fn recv(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Explicit unsubscribe
    pub fn unsubscribe(self) {}
}
