/*
[INPUT]:  AppState task controller form and editing cursor
[OUTPUT]: Task form panel rendered into Ratatui frame
[POS]:    TUI UI task form rendering
[UPDATE]: When the task form panel changes
*/

use crate::tui::app::{AppState, Focus};

use super::form::draw_form;

pub(in crate::tui) fn draw_task_form(frame: &mut ratatui::Frame, area: ratatui::layout::Rect, app: &AppState) {
    let Some(controller) = app.controller.as_ref() else {
        return;
    };
    let form = app.task_view.to_form(controller.form(), controller.editing());
    draw_form(frame, area, &form, app.focus == Focus::Form);
}
