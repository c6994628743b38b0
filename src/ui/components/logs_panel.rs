use crate::domain::money::format_eur;
use crate::domain::timefmt::{format_de, now_local};
use crate::domain::{LogAction, LogEntry, LogLevel, LogSummary};
use crate::ui::components::{centered_rect, header_cell, panel_block, selected_style, truncate};
use crate::ui::state::LogsState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

pub fn render_logs_panel(frame: &mut Frame, area: Rect, logs: &LogsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Summary
            Constraint::Length(3), // Filters
            Constraint::Min(5),    // Table
        ])
        .split(area);

    let visible = logs.visible(now_local());
    let selected = logs.selected.min(visible.len().saturating_sub(1));

    render_summary(frame, chunks[0], &LogSummary::from_logs(&logs.logs));
    render_filters(frame, chunks[1], logs, visible.len());
    render_log_table(frame, chunks[2], logs, &visible, selected);

    if logs.show_detail {
        if let Some(entry) = visible.get(selected) {
            render_log_detail(frame, area, entry);
        }
    }
}

fn level_color(level: &LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::Cyan,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Error => Color::Red,
        LogLevel::Success => Color::Green,
        LogLevel::Other(_) => Color::Gray,
    }
}

fn action_color(action: &LogAction) -> Color {
    match action {
        LogAction::Received => Color::Blue,
        LogAction::AiAnalyzed => Color::Magenta,
        LogAction::ResponseSent | LogAction::AutoAccept => Color::Green,
        LogAction::ManualOverride | LogAction::AutoCounter => Color::Yellow,
        LogAction::Error | LogAction::AutoDecline => Color::Red,
        LogAction::SystemStarted | LogAction::Other(_) => Color::Gray,
    }
}

fn render_summary(frame: &mut Frame, area: Rect, summary: &LogSummary) {
    let counts = [
        ("Empfangen", summary.received, Color::Blue),
        ("KI-Analysen", summary.ai_analyzed, Color::Magenta),
        ("Antworten", summary.response_sent, Color::Green),
        ("Manuell", summary.manual_override, Color::Yellow),
    ];
    let spans: Vec<Span> = counts
        .iter()
        .flat_map(|(label, count, color)| {
            [
                Span::styled(
                    format!("{} ", count),
                    Style::default().fg(*color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{}    ", label)),
            ]
        })
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(panel_block(" Übersicht ")),
        area,
    );
}

fn render_filters(frame: &mut Frame, area: Rect, logs: &LogsState, shown: usize) {
    let title = format!(" {} von {} Einträgen ", shown, logs.logs.len());
    let label = Style::default().fg(Color::DarkGray);

    let search = match &logs.search_input {
        Some(input) => Span::styled(input.with_cursor(), Style::default().fg(Color::Yellow)),
        None if logs.filter.search.is_empty() => Span::styled("-", label),
        None => Span::raw(logs.filter.search.clone()),
    };

    let line = Line::from(vec![
        Span::styled("Suche [/]: ", label),
        search,
        Span::styled("   Aktion [a]: ", label),
        Span::raw(logs.filter.action.label()),
        Span::styled("   Zeitraum [t]: ", label),
        Span::raw(logs.filter.date.label()),
    ]);
    frame.render_widget(Paragraph::new(line).block(panel_block(&title)), area);
}

fn log_row<'a>(entry: &'a LogEntry) -> Row<'a> {
    let timestamp = entry
        .parsed_timestamp()
        .map(|ts| format_de(&ts))
        .unwrap_or_else(|| entry.timestamp.clone());

    Row::new(vec![
        Cell::from(timestamp),
        Cell::from(entry.level.label()).style(Style::default().fg(level_color(&entry.level))),
        Cell::from(entry.action.label()).style(Style::default().fg(action_color(&entry.action))),
        Cell::from(truncate(entry.offer_title.as_deref().unwrap_or("-"), 30)),
        Cell::from(entry.message.clone().unwrap_or_default()),
        Cell::from(entry.details_preview()).style(Style::default().fg(Color::DarkGray)),
    ])
}

fn render_log_table(
    frame: &mut Frame,
    area: Rect,
    logs: &LogsState,
    visible: &[&LogEntry],
    selected: usize,
) {
    let block = panel_block(" Protokoll [e] CSV-Export ");

    if visible.is_empty() {
        let text = if logs.loading {
            "Lade Protokolle..."
        } else if logs.logs.is_empty() {
            "Keine Protokolleinträge vorhanden"
        } else {
            "Keine Einträge für die aktuellen Filter"
        };
        let placeholder = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(vec![
        header_cell("Zeitstempel"),
        header_cell("Level"),
        header_cell("Aktion"),
        header_cell("Artikel"),
        header_cell("Nachricht"),
        header_cell("Details"),
    ]);
    let rows: Vec<Row> = visible.iter().map(|entry| log_row(entry)).collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(20), // Zeitstempel
            Constraint::Length(8),  // Level
            Constraint::Length(20), // Aktion
            Constraint::Length(30), // Artikel
            Constraint::Min(20),    // Nachricht
            Constraint::Length(30), // Details
        ],
    )
    .header(header)
    .block(block)
    .highlight_style(selected_style())
    .column_spacing(1);

    let mut table_state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_log_detail(frame: &mut Frame, area: Rect, entry: &LogEntry) {
    let popup = centered_rect(70, area.height.saturating_sub(4), area);
    frame.render_widget(Clear, popup);

    let label = Style::default().fg(Color::DarkGray);
    let timestamp = entry
        .parsed_timestamp()
        .map(|ts| format_de(&ts))
        .unwrap_or_else(|| entry.timestamp.clone());

    let mut lines = vec![
        Line::from(vec![Span::styled("Zeitstempel: ", label), Span::raw(timestamp)]),
        Line::from(vec![
            Span::styled("Aktion: ", label),
            Span::styled(
                entry.action.label().to_string(),
                Style::default().fg(action_color(&entry.action)),
            ),
        ]),
    ];
    if let Some(title) = &entry.offer_title {
        lines.push(Line::from(vec![Span::styled("Artikel: ", label), Span::raw(title.clone())]));
    }
    if let Some(buyer) = &entry.buyer_name {
        lines.push(Line::from(vec![Span::styled("Käufer: ", label), Span::raw(buyer.clone())]));
    }
    if let (Some(list), Some(offer)) = (entry.listing_price, entry.offer_price) {
        let pct = entry
            .price_percentage()
            .map(|p| format!(" ({:.1}% vom Angebotspreis)", p))
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled("Preise: ", label),
            Span::raw(format!(
                "Angebotspreis {}, Käufer-Angebot {}{}",
                format_eur(list),
                format_eur(offer),
                pct
            )),
        ]));
    }
    if let Some(message) = &entry.message {
        lines.push(Line::default());
        lines.push(Line::from(message.clone()));
    }
    if let Some(payload) = entry.payload_pretty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Daten:", label)));
        lines.extend(payload.lines().map(|l| Line::from(l.to_string())));
    }

    let detail = Paragraph::new(lines)
        .block(panel_block(" Protokolleintrag [Enter] schließen "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, popup);
}
