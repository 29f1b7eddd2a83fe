// Handles the rendering of widgets to the terminal frame.

use super::Popup;
use super::model::ServiceRecord;
use super::registry::Registry;
use super::target::TargetSelector;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

/// Main render function called every frame.
pub fn render(
    f: &mut Frame,
    registry: &Registry,
    targets: &TargetSelector,
    table_state: &mut TableState,
    popup: Option<&Popup>,
    message: Option<&str>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_target(f, chunks[0], targets);
    render_service_table(f, chunks[1], registry, table_state);
    render_footer(f, chunks[2], message);

    match popup {
        Some(Popup::Details {
            service,
            text,
            scroll,
        }) => render_details(f, service, text, *scroll),
        Some(Popup::Logs {
            service,
            lines,
            scroll,
        }) => render_logs(f, service, lines, *scroll),
        Some(Popup::Errors(errors)) => render_errors(f, errors),
        Some(Popup::ConfirmQuit) => render_confirm_quit(f),
        None => {}
    }
}

fn render_target(f: &mut Frame, area: Rect, targets: &TargetSelector) {
    let current = targets
        .list()
        .into_iter()
        .find(|t| t.is_default)
        .map(|t| t.label)
        .unwrap_or_else(|| targets.get_default().to_string());

    let mut spans = vec![
        Span::raw("Default System Target: "),
        Span::styled(current, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if targets.is_modified() {
        spans.push(Span::styled(" (modified)", Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

/// Run state changes are only applied to enabled services.
fn active_label(record: &ServiceRecord) -> &'static str {
    match (record.active, record.modified && record.enabled) {
        (true, true) => "Active (will start)",
        (false, true) => "Inactive (will stop)",
        (true, false) => "Active",
        (false, false) => "Inactive",
    }
}

fn render_service_table(f: &mut Frame, area: Rect, registry: &Registry, state: &mut TableState) {
    let rows: Vec<Row> = registry
        .records()
        .map(|record| {
            let style = if !record.loaded {
                Style::default().fg(Color::DarkGray)
            } else if record.modified {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let marker = if record.modified { "*" } else { " " };

            Row::new(vec![
                Cell::from(format!("{}{}", marker, record.name)),
                Cell::from(record.start_mode().label()),
                Cell::from(active_label(record)),
                Cell::from(record.description.clone()),
            ])
            .style(style)
        })
        .collect();

    let header = Row::new(vec!["Service", "Start", "Active", "Description"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let title = format!(" Services ({}) ", registry.len());
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Length(10),
            Constraint::Length(22),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(
        Style::default()
            .add_modifier(Modifier::BOLD)
            .bg(Color::DarkGray),
    )
    .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, state);
}

fn render_footer(f: &mut Frame, area: Rect, message: Option<&str>) {
    let help_text = match message {
        Some(message) => Line::from(Span::styled(message, Style::default().fg(Color::Yellow))),
        None => Line::from(vec![
            Span::raw("Nav: "),
            Span::styled("j/k ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Start: "),
            Span::styled(
                "Enter(toggle) b(boot) m(manual) ",
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("| Run: "),
            Span::styled("s ", Style::default().fg(Color::Cyan)),
            Span::raw("| Details: "),
            Span::styled("d ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Logs: "),
            Span::styled("l ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Target: "),
            Span::styled("t ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Write: "),
            Span::styled("w ", Style::default().fg(Color::Green)),
            Span::raw("| Discard: "),
            Span::styled("r ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Quit: "),
            Span::styled("q", Style::default().fg(Color::Red)),
        ]),
    };

    let paragraph =
        Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title(" Controls "));

    f.render_widget(paragraph, area);
}

fn render_details(f: &mut Frame, service: &str, text: &str, scroll: u16) {
    let area = centered_rect(80, 80, f.area());

    f.render_widget(Clear, area);

    let title = format!(" Service {} Full Info - Esc to close ", service);
    let block = Block::default().borders(Borders::ALL).title(title);
    let content: Vec<Line> = text.lines().map(Line::from).collect();
    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));

    f.render_widget(paragraph, area);
}

fn render_logs(f: &mut Frame, service: &str, lines: &[String], scroll: u16) {
    let area = centered_rect(80, 80, f.area());

    f.render_widget(Clear, area);

    let title = format!(" Service {} Logs (this boot) - j/k to scroll, Esc to close ", service);
    let block = Block::default().borders(Borders::ALL).title(title);
    let content: Vec<Line> = lines.iter().map(|s| Line::from(s.as_str())).collect();
    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));

    f.render_widget(paragraph, area);
}

fn render_errors(f: &mut Frame, errors: &[String]) {
    let area = centered_rect(70, 60, f.area());

    f.render_widget(Clear, area);

    let mut content = vec![Line::from(Span::styled(
        "Writing the configuration failed:",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))];
    for error in errors {
        content.extend(error.lines().map(Line::from));
    }
    content.push(Line::from(""));
    content.push(Line::from("Press any key to continue editing"));

    let paragraph = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(" Error "))
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

fn render_confirm_quit(f: &mut Frame) {
    let area = centered_rect(50, 20, f.area());

    f.render_widget(Clear, area);

    let paragraph = Paragraph::new(vec![
        Line::from("There are unsaved changes."),
        Line::from("Really quit? (y/n)"),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Quit "));

    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
