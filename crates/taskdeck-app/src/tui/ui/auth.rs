/*
[INPUT]:  AppState auth form and view focus
[OUTPUT]: Sign-in / sign-up panel rendered into Ratatui frame
[POS]:    TUI UI signed-out view
[UPDATE]: When the auth panel layout changes
*/

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;

use super::form::draw_form;
use crate::tui::app::AppState;

pub(in crate::tui) fn draw_auth_form(frame: &mut ratatui::Frame, area: ratatui::layout::Rect, app: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(7)])
        .split(area);

    let hint = Paragraph::new("Sign in to see your tasks. Switch Mode to create an account.")
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(hint, layout[0]);

    let form = app.auth_view.to_form(&app.auth_form);
    draw_form(frame, layout[1], &form, true);
}
