/*
[INPUT]:  Backend handles, task settings, log buffer
[OUTPUT]: AppState owning the session gate, auth form and task controller
[POS]:    TUI app state and selection management
[UPDATE]: When adding view state or navigation
*/

use ratatui::widgets::ListState;
use taskdeck_adapter::TaskId;

use crate::auth_form::AuthForm;
use crate::backends::Backends;
use crate::session_gate::{GateView, SessionGate};
use crate::tasks::{TaskListController, TaskSettings};
use crate::tui::LogBufferHandle;
use crate::tui::ui::form::{AuthFormView, TaskFormView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Tab {
    Main,
    Logs,
}

/// Which task view pane receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Focus {
    Form,
    List,
}

pub(super) struct AppState {
    pub(super) backends: Backends,
    pub(super) settings: TaskSettings,
    pub(super) log_buffer: LogBufferHandle,
    pub(super) gate: SessionGate,
    pub(super) auth_form: AuthForm,
    pub(super) auth_view: AuthFormView,
    /// Present exactly while the gate holds a session
    pub(super) controller: Option<TaskListController>,
    pub(super) task_view: TaskFormView,
    pub(super) focus: Focus,
    pub(super) list_state: ListState,
    pub(super) current_tab: Tab,
    pub(super) status_message: String,
}

impl AppState {
    pub(super) fn new(backends: Backends, settings: TaskSettings, log_buffer: LogBufferHandle) -> Self {
        Self {
            gate: SessionGate::new(backends.auth.clone()),
            auth_form: AuthForm::new(backends.auth.clone()),
            auth_view: AuthFormView::default(),
            backends,
            settings,
            log_buffer,
            controller: None,
            task_view: TaskFormView::default(),
            focus: Focus::Form,
            list_state: ListState::default(),
            current_tab: Tab::Main,
            status_message: "Ready".to_string(),
        }
    }

    pub(super) fn signed_in(&self) -> bool {
        matches!(self.gate.view(), GateView::SignedIn(_))
    }

    pub(super) fn is_live(&self) -> bool {
        self.controller.as_ref().is_some_and(TaskListController::is_live)
    }

    pub(super) fn next_tab(&mut self) {
        self.current_tab = match self.current_tab {
            Tab::Main => Tab::Logs,
            Tab::Logs => Tab::Main,
        };
    }

    pub(super) fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Form => Focus::List,
            Focus::List => Focus::Form,
        };
        self.clamp_selection();
    }

    fn visible_len(&self) -> usize {
        self.controller
            .as_ref()
            .map(|controller| controller.visible_tasks().count())
            .unwrap_or(0)
    }

    pub(super) fn selected_task_id(&self) -> Option<TaskId> {
        let index = self.list_state.selected()?;
        self.controller
            .as_ref()?
            .visible_tasks()
            .nth(index)
            .map(|task| task.id)
    }

    pub(super) fn move_selection(&mut self, delta: isize) {
        let len = self.visible_len();
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, (len - 1) as isize) as usize;
        self.list_state.select(Some(next));
    }

    /// Keep the selection inside the visible list after it changed
    pub(super) fn clamp_selection(&mut self) {
        let len = self.visible_len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            None => self.list_state.select(Some(0)),
            Some(selected) if selected >= len => self.list_state.select(Some(len - 1)),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::LogBuffer;
    use taskdeck_adapter::MemoryBackend;

    fn settings() -> TaskSettings {
        TaskSettings {
            table: "tasks".to_string(),
            bucket: "tasks-images".to_string(),
        }
    }

    #[tokio::test]
    async fn test_selection_follows_visible_rows() {
        let backend = MemoryBackend::new().signed_in("a@x.io");
        backend.seed("one", "1", "a@x.io");
        backend.seed("two", "2", "a@x.io");
        backend.seed("three", "3", "a@x.io");
        let mut app = AppState::new(
            Backends::memory(backend).without_feed(),
            settings(),
            LogBuffer::handle(16),
        );
        app.mount().await;

        assert!(app.signed_in());
        assert_eq!(app.selected_task_id(), Some(3));

        app.move_selection(10);
        assert_eq!(app.selected_task_id(), Some(1));

        app.controller.as_mut().unwrap().edit(1).unwrap();
        app.clamp_selection();
        assert_eq!(app.selected_task_id(), Some(2));

        app.move_selection(-10);
        assert_eq!(app.selected_task_id(), Some(3));
    }
}
