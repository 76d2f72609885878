/*
[INPUT]:  AuthForm fields and mode, key events
[OUTPUT]: Sign-in / sign-up form view and field edits applied back to AuthForm
[POS]:    TUI UI auth form binding
[UPDATE]: When auth form fields change
*/

use crossterm::event::KeyCode;

use super::{Field, FormAction, FormView, handle_form_key};
use crate::auth_form::{AuthForm, AuthMode};

const MODE_FIELD: usize = 0;
const NAME_FIELD: usize = 1;
const EMAIL_FIELD: usize = 2;
const PASSWORD_FIELD: usize = 3;
const MODES: &[&str] = &["Sign in", "Sign up"];

#[derive(Debug, Default)]
pub(in crate::tui) struct AuthFormView {
    focus_index: usize,
}

impl AuthFormView {
    pub(in crate::tui) fn to_form(&self, form: &AuthForm) -> FormView {
        let (title, submit) = match form.mode() {
            AuthMode::SignIn => ("Sign in", "Sign in"),
            AuthMode::SignUp => ("Create account", "Sign up"),
        };
        let fields = form.fields();

        FormView {
            title: title.to_string(),
            focus_index: self.focus_index,
            fields: vec![
                Field::Select {
                    label: "Mode",
                    options: MODES,
                    selected: mode_index(form.mode()),
                },
                Field::text("Name (sign up)", fields.name.clone()),
                Field::text("Email", fields.email.clone()),
                Field::TextInput {
                    label: "Password",
                    value: fields.password.clone(),
                    masked: true,
                },
                Field::Button {
                    label: submit,
                    action: FormAction::Submit,
                },
            ],
        }
    }

    pub(in crate::tui) fn handle_key(&mut self, form: &mut AuthForm, key: KeyCode) -> FormAction {
        let mut view = self.to_form(form);
        let action = handle_form_key(&mut view, key);
        self.apply_form_state(form, &view);
        action
    }

    pub(in crate::tui) fn reset(&mut self) {
        self.focus_index = 0;
    }

    fn apply_form_state(&mut self, form: &mut AuthForm, view: &FormView) {
        self.focus_index = view.focus_index;
        if let Some(selected) = view.selected_at(MODE_FIELD)
            && selected != mode_index(form.mode())
        {
            form.toggle_mode();
        }
        if let Some(name) = view.text_at(NAME_FIELD) {
            form.set_name(name);
        }
        if let Some(email) = view.text_at(EMAIL_FIELD) {
            form.set_email(email);
        }
        if let Some(password) = view.text_at(PASSWORD_FIELD) {
            form.set_password(password);
        }
    }
}

fn mode_index(mode: AuthMode) -> usize {
    match mode {
        AuthMode::SignIn => 0,
        AuthMode::SignUp => 1,
    }
}
