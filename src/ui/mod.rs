use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use time::{macros::format_description, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, FocusPane, StatusKind};
use crate::config::themes::Palette;
use crate::storage::KeyValueStore;
use crate::view::{FilterState, Row};

const EMPTY_PLACEHOLDER: &str = "Nothing to do. Type a task above and press Enter.";
const ELLIPSIS: &str = "…";

/// Resolved drawing options for the list screen.
#[derive(Debug, Clone, Copy)]
pub struct ScreenStyle {
    pub palette: Palette,
    pub show_indices: bool,
}

pub fn draw_app<S: KeyValueStore>(
    frame: &mut Frame,
    state: &AppState<S>,
    list_state: &mut ListState,
    style: &ScreenStyle,
) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    draw_input(frame, state, vertical[0], style);
    frame.render_widget(Paragraph::new(filter_bar(state, style)), vertical[1]);
    draw_rows(frame, state, list_state, vertical[2], style);
    frame.render_widget(
        Paragraph::new(build_status_line(state, style)),
        vertical[3],
    );

    if state.show_help() {
        draw_help(frame, style);
    }
}

fn draw_input<S: KeyValueStore>(
    frame: &mut Frame,
    state: &AppState<S>,
    area: Rect,
    style: &ScreenStyle,
) {
    let palette = style.palette;
    let focused = state.focus == FocusPane::Input;
    let border = if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.muted)
    };
    let content = if state.input.is_empty() && !focused {
        Span::styled("Add a new task", Style::default().fg(palette.muted))
    } else {
        Span::styled(state.input.value().to_string(), Style::default().fg(palette.text))
    };
    let input = Paragraph::new(Line::from(content)).block(
        Block::default()
            .title("New task")
            .borders(Borders::ALL)
            .border_style(border),
    );
    frame.render_widget(input, area);

    if focused && area.width > 2 {
        let typed = UnicodeWidthStr::width(state.input.value()) as u16;
        let max_x = area.width.saturating_sub(2);
        frame.set_cursor(area.x + 1 + typed.min(max_x), area.y + 1);
    }
}

fn filter_bar<S: KeyValueStore>(state: &AppState<S>, style: &ScreenStyle) -> Line<'static> {
    let palette = style.palette;
    let view = state.view();
    let mut spans = vec![Span::styled(" Filter: ", Style::default().fg(palette.muted))];
    for (position, filter) in FilterState::controls().enumerate() {
        let label = format!("[{}] {}", position + 1, filter.label());
        let span = if view.is_active(filter) {
            Span::styled(
                label,
                Style::default()
                    .fg(palette.active_filter)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )
        } else {
            Span::styled(label, Style::default().fg(palette.text))
        };
        spans.push(span);
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
        "[X] Clear all",
        Style::default().fg(palette.error),
    ));
    Line::from(spans)
}

fn draw_rows<S: KeyValueStore>(
    frame: &mut Frame,
    state: &AppState<S>,
    list_state: &mut ListState,
    area: Rect,
    style: &ScreenStyle,
) {
    let palette = style.palette;
    let border = if state.focus == FocusPane::List {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(list_title(state))
        .borders(Borders::ALL)
        .border_style(border);

    let view = state.view();
    if view.show_empty {
        let placeholder = Paragraph::new(Text::from(vec![
            Line::from(""),
            Line::from(Span::styled(
                EMPTY_PLACEHOLDER,
                Style::default()
                    .fg(palette.muted)
                    .add_modifier(Modifier::ITALIC),
            )),
        ]))
        .wrap(Wrap { trim: true })
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let name_width = usize::from(area.width.saturating_sub(2))
        .saturating_sub(row_prefix_width(style.show_indices));
    let items: Vec<ListItem> = view
        .rows
        .iter()
        .map(|row| ListItem::new(row_line(row, name_width, style)))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(palette.selection_bg)
                .fg(palette.selection_fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn list_title<S: KeyValueStore>(state: &AppState<S>) -> String {
    let view = state.view();
    match view.filter {
        FilterState::None => "Tasks".to_string(),
        filter => format!("Tasks ({}: {} shown)", filter.label(), view.rows.len()),
    }
}

fn row_prefix_width(show_indices: bool) -> usize {
    // highlight symbol + checkbox
    let base = 2 + 4;
    if show_indices {
        base + 5
    } else {
        base
    }
}

fn row_line(row: &Row, name_width: usize, style: &ScreenStyle) -> Line<'static> {
    let palette = style.palette;
    let mut spans = Vec::with_capacity(3);
    if style.show_indices {
        spans.push(Span::styled(
            format!("{:>3}. ", row.index + 1),
            Style::default().fg(palette.muted),
        ));
    }
    let (checkbox, name_style) = if row.completed {
        (
            "[x] ",
            Style::default()
                .fg(palette.completed)
                .add_modifier(Modifier::CROSSED_OUT),
        )
    } else {
        ("[ ] ", Style::default().fg(palette.text))
    };
    spans.push(Span::styled(checkbox, Style::default().fg(palette.accent)));
    spans.push(Span::styled(truncate_to_width(&row.name, name_width), name_style));
    Line::from(spans)
}

fn build_status_line<S: KeyValueStore>(
    state: &AppState<S>,
    style: &ScreenStyle,
) -> Text<'static> {
    let palette = style.palette;
    let store = state.store();
    let mut spans = vec![
        Span::raw(format!("Total: {}", store.len())),
        Span::raw(" | Pending: "),
        Span::styled(
            store.pending_count().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Completed: "),
        Span::styled(
            store.completed_count().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Filter: "),
        Span::styled(
            state.filter().label(),
            Style::default().fg(palette.active_filter),
        ),
    ];
    if let Some(saved) = state.last_saved_at() {
        spans.push(Span::raw(" | Saved "));
        spans.push(Span::styled(
            format_time_short(saved),
            Style::default().fg(palette.muted),
        ));
    }

    let message_line = match state.status_message() {
        Some(message) => {
            let color = match message.kind {
                StatusKind::Info => palette.accent,
                StatusKind::Error => palette.error,
            };
            Line::from(Span::styled(
                message.text.clone(),
                Style::default().fg(color),
            ))
        }
        None => Line::from(Span::styled(
            "Tab switch focus · Space toggle · d delete · 1/2/3 filter · ? help · q quit",
            Style::default().fg(palette.muted),
        )),
    };

    Text::from(vec![
        Line::from(spans).style(Style::default().fg(palette.muted)),
        message_line,
    ])
}

fn draw_help(frame: &mut Frame, style: &ScreenStyle) {
    let palette = style.palette;
    let area = centered_rect(60, 60, frame.size());
    let bindings = [
        ("Tab / Esc", "switch between input and list"),
        ("Enter", "add the typed task (input) / toggle (list)"),
        ("j k ↑ ↓", "move selection"),
        ("Space / x", "toggle completed"),
        ("d / Del", "delete selected task"),
        ("1 2 3", "show all / pending / completed"),
        ("p / c", "toggle pending / completed filter"),
        ("X", "delete every task"),
        ("i a /", "focus the input"),
        ("q / Ctrl-c", "quit"),
    ];
    let lines: Vec<Line> = bindings
        .iter()
        .map(|(keys, description)| {
            Line::from(vec![
                Span::styled(
                    format!("{keys:<12}"),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*description),
            ])
        })
        .collect();
    let help = Paragraph::new(lines).block(
        Block::default()
            .title("Keys")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent)),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

fn format_time_short(dt: OffsetDateTime) -> String {
    dt.format(&format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let budget = max_width.saturating_sub(UnicodeWidthStr::width(ELLIPSIS));
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let width = UnicodeWidthStr::width(grapheme);
        if used + width > budget {
            break;
        }
        used += width;
        out.push_str(grapheme);
    }
    out.push_str(ELLIPSIS);
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
