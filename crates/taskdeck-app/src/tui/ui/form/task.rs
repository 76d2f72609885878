/*
[INPUT]:  TaskForm state, editing cursor, key events
[OUTPUT]: Task form view and field edits applied back to TaskForm
[POS]:    TUI UI task form binding
[UPDATE]: When task form fields change
*/

use std::path::PathBuf;

use crossterm::event::KeyCode;
use taskdeck_adapter::TaskId;

use super::{Field, FormAction, FormView, handle_form_key};
use crate::tasks::TaskForm;

const TITLE_FIELD: usize = 0;
const DESCRIPTION_FIELD: usize = 1;
const IMAGE_FIELD: usize = 2;

#[derive(Debug, Default)]
pub(in crate::tui) struct TaskFormView {
    focus_index: usize,
}

impl TaskFormView {
    pub(in crate::tui) fn to_form(&self, form: &TaskForm, editing: Option<TaskId>) -> FormView {
        let (title, submit, cancel) = match editing {
            Some(id) => (format!("Edit task #{id}"), "Update", "Cancel edit"),
            None => ("New task".to_string(), "Add", "To list"),
        };
        let image = form
            .attachment
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default();

        FormView {
            title,
            focus_index: self.focus_index,
            fields: vec![
                Field::text("Title", form.title.clone()),
                Field::text("Description", form.description.clone()),
                Field::text("Image path", image),
                Field::Button {
                    label: submit,
                    action: FormAction::Submit,
                },
                Field::Button {
                    label: cancel,
                    action: FormAction::Cancel,
                },
            ],
        }
    }

    pub(in crate::tui) fn handle_key(
        &mut self,
        form: &mut TaskForm,
        editing: Option<TaskId>,
        key: KeyCode,
    ) -> FormAction {
        let mut view = self.to_form(form, editing);
        let action = handle_form_key(&mut view, key);
        self.apply_form_state(form, &view);
        action
    }

    pub(in crate::tui) fn reset(&mut self) {
        self.focus_index = 0;
    }

    fn apply_form_state(&mut self, form: &mut TaskForm, view: &FormView) {
        self.focus_index = view.focus_index;
        if let Some(title) = view.text_at(TITLE_FIELD) {
            form.title = title.to_string();
        }
        if let Some(description) = view.text_at(DESCRIPTION_FIELD) {
            form.description = description.to_string();
        }
        if let Some(image) = view.text_at(IMAGE_FIELD) {
            form.attachment = (!image.trim().is_empty()).then(|| PathBuf::from(image));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_path_sets_and_clears_attachment() {
        let mut form = TaskForm::default();
        let mut view = TaskFormView::default();

        view.handle_key(&mut form, None, KeyCode::Tab);
        view.handle_key(&mut form, None, KeyCode::Tab);
        for ch in "/tmp/a.png".chars() {
            view.handle_key(&mut form, None, KeyCode::Char(ch));
        }
        assert_eq!(form.attachment, Some(PathBuf::from("/tmp/a.png")));

        for _ in 0.."/tmp/a.png".len() {
            view.handle_key(&mut form, None, KeyCode::Backspace);
        }
        assert_eq!(form.attachment, None);
    }

    #[test]
    fn test_edit_title_reflects_cursor() {
        let view = TaskFormView::default();
        let form = TaskForm::default();
        assert_eq!(view.to_form(&form, Some(7)).title, "Edit task #7");
        assert_eq!(view.to_form(&form, None).title, "New task");
    }
}
