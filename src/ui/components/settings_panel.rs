use crate::domain::{Service, Settings};
use crate::ui::components::{header_cell, panel_block, selected_style};
use crate::ui::state::SettingsState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};

pub fn render_settings_panel(frame: &mut Frame, area: Rect, settings: &SettingsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(9),    // Values
            Constraint::Length(5), // Connection tests
        ])
        .split(area);

    render_values(frame, chunks[0], settings);
    render_connection_tests(frame, chunks[1], settings);
}

fn render_values(frame: &mut Frame, area: Rect, state: &SettingsState) {
    let mut title = String::from(" Einstellungen ");
    if state.loading {
        title.push_str("· lädt... ");
    } else if state.saving {
        title.push_str("· speichert... ");
    } else if state.dirty {
        title.push_str("· ungespeichert [s] ");
    }
    let block = panel_block(&title);

    let header = Row::new(vec![header_cell("Einstellung"), header_cell("Wert")]);
    let keys = state.settings.ordered_keys();
    let rows: Vec<Row> = keys
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let value = match &state.input {
                Some(input) if idx == state.selected => {
                    Span::styled(input.with_cursor(), Style::default().fg(Color::Yellow))
                }
                _ => value_span(&state.settings, key, state.reveal_secrets),
            };
            Row::new(vec![
                Cell::from(Settings::label(key).to_string()),
                Cell::from(Line::from(value)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(28), Constraint::Min(20)])
        .header(header)
        .block(block)
        .highlight_style(selected_style())
        .column_spacing(1);

    let mut table_state = TableState::default().with_selected(Some(state.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn value_span(settings: &Settings, key: &str, reveal: bool) -> Span<'static> {
    if Settings::is_flag(key) {
        let (text, color) = if settings.flag(key) {
            ("● an", Color::Green)
        } else {
            ("○ aus", Color::DarkGray)
        };
        return Span::styled(text, Style::default().fg(color));
    }
    let raw = settings.get(key);
    if raw.is_empty() {
        return Span::styled("nicht gesetzt", Style::default().fg(Color::DarkGray));
    }
    if reveal {
        Span::raw(raw.to_string())
    } else {
        Span::raw(settings.display_value(key))
    }
}

fn render_connection_tests(frame: &mut Frame, area: Rect, state: &SettingsState) {
    let services = [(Service::Ebay, "e"), (Service::OpenAi, "o")];
    let lines: Vec<Line> = services
        .iter()
        .map(|(service, hotkey)| {
            let mut spans = vec![Span::styled(
                format!("[{}] {:<8}", hotkey, service.label()),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if state.testing == Some(*service) {
                spans.push(Span::styled("teste...", Style::default().fg(Color::Cyan)));
            } else {
                match state.tests.get(service) {
                    Some(result) if result.success => spans.push(Span::styled(
                        format!("✓ {}", result.message),
                        Style::default().fg(Color::Green),
                    )),
                    Some(result) => spans.push(Span::styled(
                        format!("✗ {}", result.message),
                        Style::default().fg(Color::Red),
                    )),
                    None => spans.push(Span::styled(
                        "nicht getestet",
                        Style::default().fg(Color::DarkGray),
                    )),
                }
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).block(panel_block(" Verbindungstest [m] Geheimnisse zeigen ")),
        area,
    );
}
