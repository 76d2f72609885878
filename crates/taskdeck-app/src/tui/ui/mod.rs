/*
[INPUT]:  TUI app state for UI components
[OUTPUT]: UI component render functions and module exports
[POS]:    TUI UI module root
[UPDATE]: When adding or moving panels
*/

mod auth;
mod layout;
mod logs;
mod task_form;
mod task_list;

pub mod form;

pub(in crate::tui) use auth::draw_auth_form;
pub(in crate::tui) use layout::draw_tabs;
pub(in crate::tui) use logs::draw_logs;
pub(in crate::tui) use task_form::draw_task_form;
pub(in crate::tui) use task_list::draw_task_list;
