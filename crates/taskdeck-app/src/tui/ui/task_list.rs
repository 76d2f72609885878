/*
[INPUT]:  AppState task controller visible rows and list selection
[OUTPUT]: Task list rendered into Ratatui frame
[POS]:    TUI UI task list rendering
[UPDATE]: When task row layout changes
*/

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem};

use crate::tui::app::{AppState, Focus};
use crate::tui::runtime::border_style;

pub(in crate::tui) fn draw_task_list(frame: &mut ratatui::Frame, area: ratatui::layout::Rect, app: &mut AppState) {
    let Some(controller) = app.controller.as_ref() else {
        return;
    };

    let mut items: Vec<ListItem> = controller
        .visible_tasks()
        .map(|task| {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled(format!("#{} ", task.id), Style::default().fg(Color::DarkGray)),
                    Span::styled(task.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                ]),
                Line::from(format!("   {}", task.description)),
            ];
            if let Some(url) = task.image_url.as_deref() {
                lines.push(Line::from(Span::styled(
                    format!("   image: {url}"),
                    Style::default().fg(Color::Cyan),
                )));
            }
            ListItem::new(Text::from(lines))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No tasks yet"));
    }

    let title = if controller.is_live() {
        format!("Tasks ({}) | live", controller.visible_tasks().count())
    } else {
        format!("Tasks ({})", controller.visible_tasks().count())
    };
    let mut block = Block::default().borders(Borders::ALL).title(title);
    if app.focus == Focus::List {
        block = block.border_style(border_style());
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut app.list_state);
}
