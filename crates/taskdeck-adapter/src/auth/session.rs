/*
[INPUT]:  Token responses from the auth endpoints
[OUTPUT]: Session/User records, auth events and the shared session holder
[POS]:    Auth layer - session lifecycle management
[UPDATE]: When session fields or auth event kinds change
*/

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::http::{BackendError, Result};

/// Sessions this close to expiry are treated as expired
const EXPIRY_MARGIN_SECONDS: i64 = 10;

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl User {
    /// Display name given at sign-up
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata.get("name").and_then(Value::as_str)
    }
}

/// Access token plus the identity it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECONDS) >= self.expires_at
    }
}

/// Body returned by the token and sign-up endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenResponse {
    pub(crate) fn into_session(self) -> Result<Session> {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc
                .timestamp_opt(at, 0)
                .single()
                .ok_or_else(|| BackendError::InvalidResponse(format!("invalid expires_at {at}")))?,
            (None, Some(seconds)) => Utc::now() + Duration::seconds(seconds),
            (None, None) => {
                return Err(BackendError::InvalidResponse(
                    "token response without expiry".to_string(),
                ));
            }
        };

        Ok(Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
            user: self.user,
        })
    }
}

/// Kind of auth state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Notification delivered to auth state subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Thread-safe holder for the current session
#[derive(Debug, Clone, Default)]
pub struct SessionHolder {
    data: Arc<RwLock<Option<Session>>>,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, session: Session) {
        *self.write() = Some(session);
    }

    pub fn get(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|session| session.access_token.clone())
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
