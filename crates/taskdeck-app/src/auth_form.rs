/*
[INPUT]:  Name/email/password input, sign-in or sign-up mode, auth provider
[OUTPUT]: Delegated sign-in/sign-up calls; cleared fields on success
[POS]:    Application layer - unauthenticated view logic
[UPDATE]: When auth form fields or validation rules change
*/

use std::sync::Arc;

use taskdeck_adapter::{AuthProvider, BackendError, Session};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthFields {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum AuthFormError {
    #[error("invalid input: {0}")]
    Validation(&'static str),
    #[error(transparent)]
    Remote(#[from] BackendError),
}

/// Result of a successful submit
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    SignedIn(Session),
    /// Account created; the provider wants the email confirmed first
    AwaitingConfirmation,
}

/// Sign-in / sign-up form. The session gate, not the form, switches views.
pub struct AuthForm {
    auth: Arc<dyn AuthProvider>,
    mode: AuthMode,
    fields: AuthFields,
}

impl AuthForm {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            mode: AuthMode::default(),
            fields: AuthFields::default(),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
    }

    pub fn fields(&self) -> &AuthFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut AuthFields {
        &mut self.fields
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.fields.name = name.into();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.fields.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.fields.password = password.into();
    }

    pub fn validate(&self) -> Result<(), AuthFormError> {
        if self.fields.email.trim().is_empty() {
            return Err(AuthFormError::Validation("email is required"));
        }
        if self.fields.password.trim().is_empty() {
            return Err(AuthFormError::Validation("password is required"));
        }
        if self.mode == AuthMode::SignUp && self.fields.name.trim().is_empty() {
            return Err(AuthFormError::Validation("name is required to sign up"));
        }
        Ok(())
    }

    /// Submit in the current mode.
    ///
    /// Invalid input returns without a log or a remote call. A rejected
    /// request is logged and the fields stay as typed.
    pub async fn submit(&mut self) -> Result<AuthOutcome, AuthFormError> {
        self.validate()?;

        let email = self.fields.email.trim();
        let result = match self.mode {
            AuthMode::SignIn => self
                .auth
                .sign_in_with_password(email, &self.fields.password)
                .await
                .map(AuthOutcome::SignedIn),
            AuthMode::SignUp => self
                .auth
                .sign_up(email, &self.fields.password, self.fields.name.trim())
                .await
                .map(|session| match session {
                    Some(session) => AuthOutcome::SignedIn(session),
                    None => AuthOutcome::AwaitingConfirmation,
                }),
        };

        match result {
            Ok(outcome) => {
                if outcome == AuthOutcome::AwaitingConfirmation {
                    info!("account created, confirm the email address to sign in");
                }
                self.fields = AuthFields::default();
                Ok(outcome)
            }
            Err(err) => {
                error!(mode = ?self.mode, error = %err, "authentication failed");
                Err(err.into())
            }
        }
    }
}
