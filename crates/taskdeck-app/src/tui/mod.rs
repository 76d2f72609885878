/*
[INPUT]:  Session gate, auth form, task controller and log buffer
[OUTPUT]: Ratatui-based TUI for signing in and managing tasks
[POS]:    TUI module for the taskdeck binary
[UPDATE]: When changing TUI layout, keybindings, or runtime controls
*/

mod app;
mod events;
mod runtime;
mod state;
mod terminal;
mod ui;

pub use runtime::{
    LOG_BUFFER_CAPACITY, LogBuffer, LogBufferHandle, LogWriter, LogWriterFactory, run_tui_with_log,
};
