/*
[INPUT]:  Crossterm key events and the current AppState view
[OUTPUT]: TUI key routing to the auth form, task form or task list
[POS]:    TUI event module
[UPDATE]: When keybindings change
*/

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::{AppState, Focus, Tab};
use super::ui::form::FormAction;

/// Handles key events for the TUI.
///
/// Returns `true` if quit is requested, `false` otherwise.
pub(super) async fn handle_key_event(app: &mut AppState, key: KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    match key.code {
        KeyCode::F(10) => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::F(2) => {
            app.next_tab();
            return false;
        }
        _ => {}
    }

    if app.current_tab == Tab::Logs {
        if key.code == KeyCode::Esc {
            app.next_tab();
        }
        return false;
    }

    if !app.signed_in() {
        return handle_auth_key(app, key.code).await;
    }

    if key.code == KeyCode::F(4) {
        app.sign_out().await;
        return false;
    }

    match app.focus {
        Focus::Form => handle_task_form_key(app, key.code).await,
        Focus::List => handle_task_list_key(app, key.code).await,
    }
    false
}

async fn handle_auth_key(app: &mut AppState, key: KeyCode) -> bool {
    match app.auth_view.handle_key(&mut app.auth_form, key) {
        FormAction::Submit => {
            app.submit_auth().await;
            false
        }
        FormAction::Cancel => true,
        FormAction::None => false,
    }
}

async fn handle_task_form_key(app: &mut AppState, key: KeyCode) {
    let Some(controller) = app.controller.as_mut() else {
        return;
    };
    let editing = controller.editing();
    match app.task_view.handle_key(controller.form_mut(), editing, key) {
        FormAction::Submit => app.submit_task().await,
        FormAction::Cancel if editing.is_some() => app.cancel_edit(),
        FormAction::Cancel => app.toggle_focus(),
        FormAction::None => {}
    }
}

async fn handle_task_list_key(app: &mut AppState, key: KeyCode) {
    match key {
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Char('e') | KeyCode::Enter => app.edit_selected(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected().await,
        KeyCode::Char('r') => app.reload_tasks().await,
        KeyCode::Esc | KeyCode::Tab => app.toggle_focus(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Backends;
    use crate::tasks::TaskSettings;
    use crate::tui::LogBuffer;
    use taskdeck_adapter::{MemoryBackend, Operation};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut AppState, text: &str) {
        for ch in text.chars() {
            handle_key_event(app, press(KeyCode::Char(ch))).await;
        }
    }

    async fn app_for(backend: &MemoryBackend) -> AppState {
        let mut app = AppState::new(
            Backends::memory(backend.clone()).without_feed(),
            TaskSettings {
                table: "tasks".to_string(),
                bucket: "tasks-images".to_string(),
            },
            LogBuffer::handle(16),
        );
        app.mount().await;
        app
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let backend = MemoryBackend::new();
        let mut app = app_for(&backend).await;

        assert!(handle_key_event(&mut app, press(KeyCode::F(10))).await);
        assert!(handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)).await);
        assert!(!handle_key_event(&mut app, press(KeyCode::Char('q'))).await);
    }

    #[tokio::test]
    async fn test_typed_task_is_added_and_deleted_from_list() {
        let backend = MemoryBackend::new().signed_in("a@x.io");
        let mut app = app_for(&backend).await;

        type_text(&mut app, "milk").await;
        handle_key_event(&mut app, press(KeyCode::Tab)).await;
        type_text(&mut app, "2l").await;
        handle_key_event(&mut app, press(KeyCode::Enter)).await;

        assert_eq!(backend.rows().len(), 1);
        assert_eq!(backend.rows()[0].title, "milk");
        assert_eq!(backend.rows()[0].description, "2l");

        handle_key_event(&mut app, press(KeyCode::Esc)).await;
        assert_eq!(app.focus, Focus::List);
        handle_key_event(&mut app, press(KeyCode::Char('d'))).await;

        assert!(backend.rows().is_empty());
        assert_eq!(backend.calls(Operation::Delete), 1);
    }

    #[tokio::test]
    async fn test_logs_tab_swallows_input() {
        let backend = MemoryBackend::new().signed_in("a@x.io");
        let mut app = app_for(&backend).await;

        handle_key_event(&mut app, press(KeyCode::F(2))).await;
        assert_eq!(app.current_tab, Tab::Logs);
        type_text(&mut app, "abc").await;
        assert_eq!(app.controller.as_ref().unwrap().form().title, "");

        handle_key_event(&mut app, press(KeyCode::F(2))).await;
        assert_eq!(app.current_tab, Tab::Main);
    }
}
