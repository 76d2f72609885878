/*
[INPUT]:  Backend handles, task settings, log buffer, terminal input
[OUTPUT]: Ratatui-based TUI run loop, rendering, and log buffer utilities
[POS]:    TUI runtime loop and shared helpers
[UPDATE]: When changing TUI layout, keybindings, or runtime controls
*/

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::Event as CrosstermEvent;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use taskdeck_adapter::ChangeEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;

use super::app::{AppState, Focus, Tab};
use super::events::handle_key_event;
use super::terminal::TerminalGuard;
use super::ui::*;
use crate::backends::Backends;
use crate::tasks::{TaskListController, TaskSettings};

const UI_TICK_INTERVAL: Duration = Duration::from_millis(250);
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const LOG_BUFFER_CAPACITY: usize = 2000;

pub type LogBufferHandle = Arc<StdMutex<LogBuffer>>;

/// Bounded ring of formatted log lines shown on the Logs tab
#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn handle(capacity: usize) -> LogBufferHandle {
        Arc::new(StdMutex::new(Self::new(capacity)))
    }

    pub fn push_line(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The newest `count` lines, oldest first
    pub fn tail(&self, count: usize) -> Vec<String> {
        let start = self.lines.len().saturating_sub(count);
        self.lines.iter().skip(start).cloned().collect()
    }
}

/// `MakeWriter` that feeds tracing output into a [`LogBuffer`]
#[derive(Clone)]
pub struct LogWriterFactory {
    buffer: LogBufferHandle,
}

impl LogWriterFactory {
    pub fn new(buffer: LogBufferHandle) -> Self {
        Self { buffer }
    }
}

pub struct LogWriter {
    buffer: LogBufferHandle,
    partial: String,
}

impl LogWriter {
    fn push(&self, line: String) {
        let mut guard = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.push_line(line);
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line = self.partial[..pos].trim_end_matches('\r').to_string();
            self.partial.drain(..=pos);
            self.push(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.push(line);
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: self.buffer.clone(),
            partial: String::new(),
        }
    }
}

pub async fn run_tui_with_log(
    backends: Backends,
    settings: TaskSettings,
    log_buffer: LogBufferHandle,
) -> Result<()> {
    let mut terminal = TerminalGuard::new()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<CrosstermEvent>();
    let input_shutdown = CancellationToken::new();
    let input_shutdown_clone = input_shutdown.clone();

    tokio::task::spawn_blocking(move || {
        while !input_shutdown_clone.is_cancelled() {
            if crossterm::event::poll(INPUT_POLL_INTERVAL).unwrap_or(false)
                && let Ok(event) = crossterm::event::read()
                && event_tx.send(event).is_err()
            {
                break;
            }
        }
    });

    let mut app = AppState::new(backends, settings, log_buffer);
    app.mount().await;

    let mut tick = tokio::time::interval(UI_TICK_INTERVAL);
    let mut should_quit = false;

    while !should_quit {
        tokio::select! {
            _ = tick.tick() => {}
            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(CrosstermEvent::Key(key)) => {
                        should_quit = handle_key_event(&mut app, key).await;
                    }
                    Some(_) => {}
                    None => should_quit = true,
                }
            }
            Some(change) = app.gate.next_change(), if app.gate.is_mounted() => {
                app.on_session_change(change).await;
            }
            Some(event) = next_task_change(&mut app.controller), if app.is_live() => {
                app.on_task_change(&event);
            }
        }

        terminal.draw(|frame| draw_ui(frame, &mut app))?;
    }

    info!("shutting down");
    app.teardown().await;
    input_shutdown.cancel();
    Ok(())
}

async fn next_task_change(controller: &mut Option<TaskListController>) -> Option<ChangeEvent> {
    match controller.as_mut() {
        Some(controller) => controller.next_change().await,
        None => None,
    }
}

fn draw_ui(frame: &mut ratatui::Frame, app: &mut AppState) {
    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(area);

    draw_tabs(frame, layout[1], app.current_tab);

    match app.current_tab {
        Tab::Main if app.signed_in() => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(layout[0]);
            draw_task_form(frame, columns[0], app);
            draw_task_list(frame, columns[1], app);
        }
        Tab::Main => {
            draw_auth_form(frame, centered_rect(layout[0], 60, 80), app);
        }
        Tab::Logs => {
            draw_logs(frame, layout[0], &app.log_buffer);
        }
    }

    draw_footer(frame, layout[2], app);
}

fn draw_footer(frame: &mut ratatui::Frame, area: Rect, app: &AppState) {
    let key_style = key_style();
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::raw(label)]
    };

    let mut line1 = Vec::new();
    match (app.current_tab, app.signed_in(), app.focus) {
        (Tab::Logs, _, _) => {}
        (Tab::Main, false, _) => {
            line1.extend(hint("[Tab]", " Next field  "));
            line1.extend(hint("[Up/Down]", " Mode  "));
            line1.extend(hint("[Enter]", " Submit"));
        }
        (Tab::Main, true, Focus::Form) => {
            line1.extend(hint("[Tab]", " Next field  "));
            line1.extend(hint("[Enter]", " Save  "));
            line1.extend(hint("[Esc]", " Cancel edit / List"));
        }
        (Tab::Main, true, Focus::List) => {
            line1.extend(hint("[Up/Down]", " Select  "));
            line1.extend(hint("[e]", " Edit  "));
            line1.extend(hint("[d]", " Delete  "));
            line1.extend(hint("[r]", " Reload  "));
            line1.extend(hint("[Esc]", " Form"));
        }
    }

    let mut line2 = Vec::new();
    line2.extend(hint("[F2]", " Logs  "));
    if app.signed_in() {
        line2.extend(hint("[F4]", " Sign out  "));
    }
    line2.extend(hint("[F10]", " Quit  "));
    line2.push(Span::raw(format!("Status: {}", app.status_message)));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .title("Hotkeys");
    let text = Text::from(vec![Line::from(line1), Line::from(line2)]);
    let widget = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

pub(crate) fn border_style() -> Style {
    Style::default().fg(Color::Magenta)
}

pub(crate) fn header_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub(crate) fn key_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub(crate) fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
