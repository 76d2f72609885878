/*
[INPUT]:  AppState, session notifications, live task changes, submitted forms
[OUTPUT]: AppState transitions between signed-out and signed-in views
[POS]:    TUI state transitions and task actions
[UPDATE]: When view transitions or task actions change
*/

use taskdeck_adapter::{AuthStateChange, ChangeEvent, Session};
use tracing::debug;

use super::app::{AppState, Focus};
use crate::auth_form::AuthOutcome;
use crate::session_gate::GateTransition;
use crate::tasks::{TaskError, TaskListController};

impl AppState {
    /// Mount the gate and, with a session already present, the task view
    pub(super) async fn mount(&mut self) {
        self.gate.mount().await;
        if let Some(session) = self.gate.session().cloned() {
            self.open_tasks(&session).await;
        }
    }

    pub(super) async fn on_session_change(&mut self, change: AuthStateChange) {
        match self.gate.apply(change) {
            GateTransition::SignedIn => {
                let Some(session) = self.gate.session().cloned() else {
                    return;
                };
                self.close_tasks().await;
                self.open_tasks(&session).await;
            }
            GateTransition::SignedOut => {
                self.close_tasks().await;
                self.status_message = "Signed out".to_string();
            }
            GateTransition::Unchanged => {}
        }
    }

    pub(super) fn on_task_change(&mut self, event: &ChangeEvent) {
        if let Some(controller) = self.controller.as_mut() {
            controller.apply_change(event);
        }
        self.clamp_selection();
    }

    async fn open_tasks(&mut self, session: &Session) {
        let email = session.email().unwrap_or_default();
        let mut controller = TaskListController::new(self.backends.clone(), self.settings.clone(), email);
        controller.mount().await;
        self.controller = Some(controller);

        self.focus = Focus::Form;
        self.task_view.reset();
        self.list_state.select(None);
        self.clamp_selection();

        let who = session.user.display_name().or(session.email()).unwrap_or("unknown user");
        self.status_message = format!("Signed in as {who}");
    }

    async fn close_tasks(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.teardown().await;
        }
        self.list_state.select(None);
    }

    pub(super) async fn submit_auth(&mut self) {
        match self.auth_form.submit().await {
            Ok(AuthOutcome::SignedIn(_)) => {
                self.auth_view.reset();
            }
            Ok(AuthOutcome::AwaitingConfirmation) => {
                self.auth_view.reset();
                self.status_message = "Account created, confirm the email to sign in".to_string();
            }
            // Invalid input is silent; remote failures are already logged.
            Err(err) => debug!(error = %err, "auth submit aborted"),
        }
    }

    pub(super) async fn submit_task(&mut self) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        match controller.submit().await {
            Ok(task) => {
                self.task_view.reset();
                self.status_message = format!("Saved task #{}", task.id);
            }
            Err(err) => debug!(error = %err, "task submit aborted"),
        }
        self.clamp_selection();
    }

    pub(super) fn cancel_edit(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            controller.cancel_edit();
        }
        self.task_view.reset();
        self.clamp_selection();
    }

    pub(super) fn edit_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        if controller.edit(id).is_ok() {
            self.task_view.reset();
            self.focus = Focus::Form;
            self.status_message = format!("Editing task #{id}");
        }
        self.clamp_selection();
    }

    pub(super) async fn delete_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        match controller.delete(id).await {
            Ok(()) => self.status_message = format!("Deleted task #{id}"),
            Err(TaskError::NotFound(_)) => {}
            Err(err) => debug!(id, error = %err, "delete aborted"),
        }
        self.clamp_selection();
    }

    pub(super) async fn reload_tasks(&mut self) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        if let Ok(count) = controller.load().await {
            self.status_message = format!("Loaded {count} tasks");
        }
        self.clamp_selection();
    }

    /// The gate's notification, not this call, switches the view
    pub(super) async fn sign_out(&mut self) {
        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        match controller.sign_out().await {
            Ok(()) => debug!("sign out requested"),
            Err(err) => debug!(error = %err, "sign out aborted"),
        }
    }

    pub(super) async fn teardown(&mut self) {
        self.close_tasks().await;
        self.gate.teardown();
    }
}
