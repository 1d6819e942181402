//! UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use dronewatch_core::view::{format_confidence, Detection, LatestPanel, LatestView};

use super::app::{App, InputMode};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, outer_chunks[0]);
    draw_status_line(frame, app, outer_chunks[1]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(outer_chunks[2]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(6)])
        .split(columns[0]);

    draw_latest_panel(frame, app, left[0]);
    draw_settings_panel(frame, app, left[1]);
    draw_events_table(frame, app, columns[1]);

    match app.input_mode {
        InputMode::Normal => draw_key_hints(frame, outer_chunks[3]),
        InputMode::Input => draw_input_line(frame, app, outer_chunks[3]),
    }

    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Title, backend address and poll indicator
fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let poll = app.snapshot.poll;
    let line = Line::from(vec![
        Span::styled(
            " dronewatch ",
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Span::raw(format!("  {}", app.api_url)),
        Span::styled(
            format!(
                "  ↻ {} ms · {} events",
                poll.interval().as_millis(),
                poll.events_limit()
            ),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Command status and current error, side by side
fn draw_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if let Some(msg) = app
        .status_message
        .as_deref()
        .or(app.snapshot.status.as_deref())
    {
        spans.push(Span::styled(
            format!(" {}", msg),
            Style::default().fg(Color::Green),
        ));
    }
    if let Some(ref error) = app.snapshot.error {
        spans.push(Span::styled(
            format!("  ⚠ {}", error),
            Style::default().fg(Color::Red),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_latest_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title(" Latest ").borders(Borders::ALL);

    let content = match &app.snapshot.view.latest {
        LatestView::Empty { reason } => vec![
            Line::from(""),
            Line::from(Span::styled(
                reason.message(),
                Style::default().add_modifier(Modifier::DIM),
            )),
        ],
        LatestView::Populated(panel) => latest_lines(panel),
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn latest_lines(panel: &LatestPanel) -> Vec<Line<'_>> {
    let badge_style = match panel.detection {
        Detection::Detected => Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
        Detection::Noise => Style::default().fg(Color::DarkGray),
    };

    vec![
        Line::from(Span::styled(format!(" {} ", panel.detection), badge_style)),
        Line::from(""),
        field("Label", &panel.label),
        field("Class", &panel.predicted_class),
        field("Confidence", &panel.confidence),
        field("Threshold", &panel.threshold),
        field("Latency", &panel.latency),
        field("Input", &panel.input_shape),
        field("Time", &panel.timestamp),
    ]
}

fn field<'a>(name: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("{:<11}", format!("{}:", name)),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

/// Threshold draft vs confirmed, poll settings
fn draw_settings_panel(frame: &mut Frame, app: &App, area: Rect) {
    let snapshot = &app.snapshot;
    let draft = if snapshot.draft.is_finite() {
        format!("{:.3}", snapshot.draft)
    } else {
        "invalid".to_string()
    };
    let unsaved = snapshot
        .confirmed
        .map_or(true, |confirmed| confirmed != snapshot.draft);

    let mut draft_spans = vec![
        Span::styled("Draft:     ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(draft),
    ];
    if unsaved {
        draft_spans.push(Span::styled(
            "  (a to apply)",
            Style::default().fg(Color::Yellow),
        ));
    }

    let content = vec![
        Line::from(draft_spans),
        field_owned("Confirmed:", format_confidence(snapshot.confirmed)),
        field_owned(
            "Poll:",
            format!(
                "{} ms, {} events",
                snapshot.poll.interval().as_millis(),
                snapshot.poll.events_limit()
            ),
        ),
    ];

    let block = Block::default().title(" Settings ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn field_owned(name: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<11}", name),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

fn draw_events_table(frame: &mut Frame, app: &App, area: Rect) {
    let events = &app.snapshot.view.events;
    let title = format!(" Events ({}) ", events.len());
    let block = Block::default().title(title).borders(Borders::ALL);

    if events.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "No events yet",
            Style::default().add_modifier(Modifier::DIM),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Time", "Label", "Conf", "Latency"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = events
        .iter()
        .map(|event| {
            Row::new(vec![
                Cell::from(event.timestamp.as_str()),
                Cell::from(event.label.as_str()),
                Cell::from(event.confidence.as_str()),
                Cell::from(event.latency.as_str()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(19),
        Constraint::Min(10),
        Constraint::Length(6),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn draw_key_hints(frame: &mut Frame, area: Rect) {
    let hints = "s:start  x:stop  r:refresh  t:threshold  +/-:nudge  a:apply  p:poll  l:limit  ?:help  q:quit";
    let paragraph = Paragraph::new(hints).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

fn draw_input_line(frame: &mut Frame, app: &App, area: Rect) {
    let prompt = app.input_kind.map(|k| k.prompt()).unwrap_or("> ");

    let line = Line::from(vec![
        Span::styled(prompt, Style::default().fg(Color::Yellow)),
        Span::raw(app.input.as_str()),
        Span::styled(
            "  (Enter to confirm, Esc to cancel)",
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x + prompt.chars().count() as u16 + app.input_cursor as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 46.min(area.width.saturating_sub(4));
    let popup_height = 18.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Worker:"),
        Line::from("  s           Start detection"),
        Line::from("  x           Stop detection"),
        Line::from("  r           Refresh now"),
        Line::from(""),
        Line::from("Threshold:"),
        Line::from("  t           Type a new draft"),
        Line::from("  + / -       Nudge draft by 0.01"),
        Line::from("  a           Apply draft"),
        Line::from(""),
        Line::from("  p           Set poll interval"),
        Line::from("  l           Set events limit"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, popup_area);
}
