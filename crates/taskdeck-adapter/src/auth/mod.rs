/*
[INPUT]:  Email/password credentials and persisted sessions
[OUTPUT]: Sessions, auth state notifications and auth errors
[POS]:    Auth layer - handles hosted backend authentication
[UPDATE]: When auth flow or session storage changes
*/

pub mod client;
pub mod session;
pub mod store;

pub use client::{AuthClient, AuthSubscription};
pub use session::{AuthEvent, AuthStateChange, Session, SessionHolder, User};
pub use store::SessionStore;
