/*
[INPUT]:  Public API exports for the taskdeck application crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod auth_form;
pub mod backends;
pub mod config;
pub mod session_gate;
pub mod tasks;
pub mod tui;

// Re-export main types for convenience
pub use auth_form::{AuthForm, AuthFormError, AuthMode, AuthOutcome};
pub use backends::Backends;
pub use config::AppConfig;
pub use session_gate::{GateTransition, GateView, SessionGate};
pub use tasks::{TaskError, TaskListController, TaskListSnapshot, TaskSettings};
