/*
[INPUT]:  Form field definitions and key events
[OUTPUT]: Form rendering and form action results
[POS]:    TUI UI form framework shared by the auth and task views
[UPDATE]: When adding field kinds or editing keys
*/

mod auth;
mod task;

pub(in crate::tui) use auth::AuthFormView;
pub(in crate::tui) use task::TaskFormView;

use crossterm::event::KeyCode;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::runtime::border_style;

/// Render-ready description of a form; rebuilt from view state every frame
pub(in crate::tui) struct FormView {
    pub(super) title: String,
    pub(super) focus_index: usize,
    pub(super) fields: Vec<Field>,
}

pub(in crate::tui) enum Field {
    TextInput {
        label: &'static str,
        value: String,
        masked: bool,
    },
    Select {
        label: &'static str,
        options: &'static [&'static str],
        selected: usize,
    },
    Button {
        label: &'static str,
        action: FormAction,
    },
}

impl Field {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        Field::TextInput {
            label,
            value: value.into(),
            masked: false,
        }
    }

    fn value(&self) -> Option<&str> {
        match self {
            Field::TextInput { value, .. } => Some(value.as_str()),
            _ => None,
        }
    }
}

impl FormView {
    pub(super) fn text_at(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(Field::value)
    }

    pub(super) fn selected_at(&self, index: usize) -> Option<usize> {
        match self.fields.get(index) {
            Some(Field::Select { selected, .. }) => Some(*selected),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::tui) enum FormAction {
    Submit,
    Cancel,
    None,
}

pub(in crate::tui) fn draw_form(frame: &mut ratatui::Frame, area: Rect, form: &FormView, focused: bool) {
    let mut block = Block::default().borders(Borders::ALL).title(form.title.as_str());
    if focused {
        block = block.border_style(border_style());
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = form
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let content = match field {
                Field::TextInput { label, value, masked } => {
                    let shown = if *masked {
                        "*".repeat(value.chars().count())
                    } else {
                        value.clone()
                    };
                    format!("{label}: {shown}")
                }
                Field::Select {
                    label,
                    options,
                    selected,
                } => {
                    let selected_value = options.get(*selected).copied().unwrap_or("-");
                    format!("{label}: < {selected_value} >")
                }
                Field::Button { label, .. } => format!("[{label}]"),
            };
            let style = if focused && index == form.focus_index {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(Span::styled(content, style))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Apply one key to the focused field.
///
/// Enter on an input submits; Enter on a button yields the button's action.
pub(in crate::tui) fn handle_form_key(form: &mut FormView, key: KeyCode) -> FormAction {
    let count = form.fields.len();
    match key {
        KeyCode::Esc => FormAction::Cancel,
        KeyCode::Tab if count > 0 => {
            form.focus_index = (form.focus_index + 1) % count;
            FormAction::None
        }
        KeyCode::BackTab if count > 0 => {
            form.focus_index = (form.focus_index + count - 1) % count;
            FormAction::None
        }
        KeyCode::Up | KeyCode::Left => {
            if let Some(Field::Select { selected, .. }) = form.fields.get_mut(form.focus_index) {
                *selected = selected.saturating_sub(1);
            }
            FormAction::None
        }
        KeyCode::Down | KeyCode::Right => {
            if let Some(Field::Select { selected, options, .. }) = form.fields.get_mut(form.focus_index)
                && *selected + 1 < options.len()
            {
                *selected += 1;
            }
            FormAction::None
        }
        KeyCode::Backspace => {
            if let Some(Field::TextInput { value, .. }) = form.fields.get_mut(form.focus_index) {
                value.pop();
            }
            FormAction::None
        }
        KeyCode::Char(ch) => {
            if let Some(Field::TextInput { value, .. }) = form.fields.get_mut(form.focus_index) {
                value.push(ch);
            }
            FormAction::None
        }
        KeyCode::Enter => match form.fields.get(form.focus_index) {
            Some(Field::Button { action, .. }) => *action,
            Some(_) => FormAction::Submit,
            None => FormAction::None,
        },
        _ => FormAction::None,
    }
}
