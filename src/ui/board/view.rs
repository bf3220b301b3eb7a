//! Drawing the board: search bar, grouped task list, footer and modals.

use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::task::{Task, TaskStatus};

use super::app::{AppState, DeleteConfirmState, PromptState, StatusKind};
use super::model::BoardRow;

mod palette {
    use ratatui::style::Color;

    pub const TEXT: Color = Color::Rgb(228, 230, 235);
    pub const SUBTLE: Color = Color::Rgb(150, 156, 166);
    pub const FAINT: Color = Color::Rgb(108, 114, 124);
    pub const HINT: Color = Color::Rgb(120, 190, 214);
    pub const NOTICE: Color = Color::Rgb(236, 196, 104);
    pub const DANGER: Color = Color::Rgb(240, 98, 98);
    pub const KEY: Color = Color::Rgb(130, 166, 250);
    pub const FRAME: Color = Color::Rgb(86, 118, 160);
    pub const FRAME_ACTIVE: Color = Color::Rgb(186, 150, 86);
}

/// Width of the status badge column in task rows
const BADGE_WIDTH: usize = 6;
/// Width of the key column in the help panel
const KEY_COLUMN: usize = 14;

const HELP: &[(&str, &str)] = &[
    ("j/k or up/down", "move selection"),
    ("g/G", "first or last row"),
    ("ctrl+d/u", "page down/up"),
    ("/", "search"),
    ("n", "new task"),
    ("e or enter", "edit title"),
    ("space", "toggle completed"),
    ("s", "cycle status"),
    ("d", "delete task"),
    ("tab", "fold or unfold section"),
    ("q/esc", "quit"),
    ("?", "hide help"),
];

pub fn render(frame: &mut Frame, app: &AppState) {
    let screen = frame.size();
    let [search, list, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(screen);

    draw_search(frame, app, search);
    draw_list(frame, app, list);
    draw_footer(frame, app, footer);

    if let Some(prompt) = &app.prompt {
        draw_prompt(frame, screen, prompt);
    } else if let Some(confirm) = &app.delete_confirm {
        draw_delete_confirm(frame, screen, confirm);
    }
}

fn framed(title: &str, color: Color) -> Block<'_> {
    Block::bordered().title(title).border_style(Style::new().fg(color))
}

fn draw_search(frame: &mut Frame, app: &AppState, area: Rect) {
    let (line, border) = if app.search_active {
        let line = Line::from(vec![app.query.clone().fg(palette::TEXT), cursor()]);
        (line, palette::FRAME_ACTIVE)
    } else if app.query.is_empty() {
        let hint = "press / to search titles and descriptions".fg(palette::FAINT);
        (Line::from(hint), palette::FRAME)
    } else {
        (Line::from(app.query.clone().fg(palette::HINT)), palette::FRAME)
    };
    frame.render_widget(Paragraph::new(line).block(framed("Search", border)), area);
}

fn draw_list(frame: &mut Frame, app: &AppState, area: Rect) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let inner_height = usize::from(area.height.saturating_sub(2));

    let mut lines: Vec<Line> = Vec::new();
    if app.groups.is_empty() && !app.query.trim().is_empty() {
        lines.push(Line::from("No matches".fg(palette::SUBTLE)));
        lines.push(Line::default());
    }

    let help = if app.show_help {
        help_lines(inner_width)
    } else {
        Vec::new()
    };
    let reserved = lines.len() + if help.is_empty() { 0 } else { help.len() + 1 };
    let visible = scroll_window(app.rows.len(), app.selected, inner_height.saturating_sub(reserved));

    for index in visible {
        let selected = app.selected == Some(index);
        let line = match &app.rows[index] {
            BoardRow::Section {
                status,
                count,
                collapsed,
            } => section_line(*status, *count, *collapsed),
            BoardRow::Task { id, .. } => match app.task(id) {
                Some(task) => task_line(task, inner_width),
                None => continue,
            },
        };
        lines.push(if selected {
            line.patch_style(Modifier::REVERSED)
        } else {
            line
        });
    }

    if !help.is_empty() {
        lines.push(Line::default());
        lines.extend(help);
    }

    let widget = Paragraph::new(lines)
        .block(framed("Tasks", palette::FRAME))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

fn draw_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let mut first = vec![app.footer_hint().fg(palette::HINT)];
    if let Some((message, kind)) = app.status_line() {
        let styled = match kind {
            StatusKind::Error => message.fg(palette::DANGER).bold(),
            StatusKind::Info => message.fg(palette::NOTICE),
        };
        first.push(Span::raw("  |  "));
        first.push(styled);
    }
    let counts = Line::from(app.task_count_summary().fg(palette::KEY));

    let widget = Paragraph::new(vec![Line::from(first), counts])
        .alignment(Alignment::Center)
        .block(
            Block::new()
                .borders(Borders::TOP)
                .border_style(Style::new().fg(palette::FRAME)),
        );
    frame.render_widget(widget, area);
}

fn draw_prompt(frame: &mut Frame, screen: Rect, prompt: &PromptState) {
    let width = screen.width.saturating_sub(8).min(72);
    let area = centered(screen, width, 5);
    let room = usize::from(width).saturating_sub(3);

    let lines = vec![
        Line::from(vec![last_chars(&prompt.value, room).fg(palette::TEXT), cursor()]),
        Line::default(),
        Line::from("enter save  esc cancel".fg(palette::FAINT)),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(framed(prompt.title(), palette::FRAME_ACTIVE)),
        area,
    );
}

fn draw_delete_confirm(frame: &mut Frame, screen: Rect, confirm: &DeleteConfirmState) {
    let width = screen.width.saturating_sub(8).min(64);
    let area = centered(screen, width, 8);
    let room = usize::from(width).saturating_sub(9);

    let lines = vec![
        Line::from("Delete task?".fg(palette::DANGER).bold()),
        Line::default(),
        Line::from(vec![
            "Title: ".fg(palette::FAINT),
            ellipsize(&confirm.title, room).fg(palette::TEXT),
        ]),
        Line::from(vec![
            "ID: ".fg(palette::FAINT),
            ellipsize(&confirm.task_id, room).fg(palette::SUBTLE).bold(),
        ]),
        Line::default(),
        Line::from("enter/y confirm  esc/n cancel".fg(palette::FAINT)),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(framed("Delete Task", palette::DANGER))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn help_lines(width: usize) -> Vec<Line<'static>> {
    let key_width = KEY_COLUMN.min(width);
    let text_width = width.saturating_sub(KEY_COLUMN + 1);
    let mut lines = vec![Line::from("Keys".fg(palette::HINT).bold())];
    lines.extend(HELP.iter().map(|(keys, action)| {
        Line::from(vec![
            pad_right(keys, key_width).fg(palette::KEY).bold(),
            Span::raw(" "),
            ellipsize(action, text_width).fg(palette::SUBTLE),
        ])
    }));
    lines
}

fn section_line(status: TaskStatus, count: usize, collapsed: bool) -> Line<'static> {
    let fold = if collapsed { "+ " } else { "- " };
    Line::from(vec![
        fold.fg(palette::FAINT),
        status.label().fg(badge_colors(status).0).bold(),
        format!(" ({count})").fg(palette::SUBTLE),
    ])
}

fn task_line(task: &Task, width: usize) -> Line<'static> {
    let (fg, bg) = badge_colors(task.status());
    let badge = pad_center(badge_text(task.status()), BADGE_WIDTH);
    let title_room = width.saturating_sub(BADGE_WIDTH + 4);
    let title = ellipsize(&task.title, title_room);
    let spare = title_room.saturating_sub(title.chars().count() + 3);

    let title = if task.completed() {
        title.fg(palette::SUBTLE).crossed_out()
    } else {
        title.fg(palette::TEXT)
    };
    let mut spans = vec![
        Span::raw("  "),
        badge.fg(fg).bg(bg).bold(),
        Span::raw(" "),
        title,
    ];
    let first_line = task.description.as_deref().and_then(|text| text.lines().next());
    if let Some(first_line) = first_line.filter(|_| spare > 3) {
        spans.push(format!("   {}", ellipsize(first_line, spare)).fg(palette::FAINT));
    }
    Line::from(spans)
}

fn cursor() -> Span<'static> {
    " ".fg(palette::TEXT).reversed()
}

/// A `width` x `height` rect in the middle of `screen`, clamped to fit
fn centered(screen: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(screen.width.saturating_sub(2));
    let height = height.min(screen.height.saturating_sub(2));
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(screen);
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    area
}

/// Row indices to draw so `selected` stays roughly centred in `height` rows
fn scroll_window(total: usize, selected: Option<usize>, height: usize) -> std::ops::Range<usize> {
    if height >= total {
        return 0..total;
    }
    if height == 0 {
        return 0..0;
    }
    let start = selected
        .unwrap_or(0)
        .saturating_sub(height / 2)
        .min(total - height);
    start..start + height
}

fn badge_text(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "TODO",
        TaskStatus::InProgress => "PROG",
        TaskStatus::Completed => "DONE",
    }
}

fn badge_colors(status: TaskStatus) -> (Color, Color) {
    match status {
        TaskStatus::Pending => (Color::Rgb(80, 250, 123), Color::Rgb(26, 61, 42)),
        TaskStatus::InProgress => (Color::Rgb(139, 233, 253), Color::Rgb(26, 51, 68)),
        TaskStatus::Completed => (Color::Rgb(98, 114, 164), Color::Rgb(42, 42, 61)),
    }
}

fn pad_right(text: &str, width: usize) -> String {
    format!("{:<width$}", ellipsize(text, width))
}

fn pad_center(text: &str, width: usize) -> String {
    format!("{:^width$}", ellipsize(text, width))
}

/// Cut to `max` chars, marking the cut with `...` when there is room for it
fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut cut: String = text.chars().take(max - 3).collect();
    cut.push_str("...");
    cut
}

/// Last `max` characters, so the end of a long input stays visible
fn last_chars(text: &str, max: usize) -> String {
    let skip = text.chars().count().saturating_sub(max);
    text.chars().skip(skip).collect()
}
