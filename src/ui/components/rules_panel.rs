use crate::domain::{NegotiationRule, NegotiationTone, RuleType};
use crate::ui::components::{centered_rect, header_cell, panel_block, selected_style, truncate};
use crate::ui::state::{RuleEditor, RuleField, RulesState};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

pub fn render_rules_panel(frame: &mut Frame, area: Rect, rules: &RulesState) {
    render_rule_table(frame, area, rules);

    if let Some(editor) = &rules.editor {
        render_rule_editor(frame, area, editor);
    } else if let Some(rule) = &rules.confirm_delete {
        render_delete_confirmation(frame, area, rule);
    }
}

fn type_color(rule_type: &RuleType) -> Color {
    match rule_type {
        RuleType::General => Color::Cyan,
        RuleType::TimeBased => Color::Magenta,
        RuleType::Auto => Color::Green,
        RuleType::Other(_) => Color::Gray,
    }
}

fn tone_color(tone: &NegotiationTone) -> Color {
    match tone {
        NegotiationTone::Friendly => Color::Green,
        NegotiationTone::Professional => Color::Blue,
        NegotiationTone::Firm => Color::Red,
        NegotiationTone::Efficient => Color::Yellow,
        NegotiationTone::Other(_) => Color::Gray,
    }
}

fn automation_text(rule: &NegotiationRule) -> String {
    match (rule.auto_execute_enabled, rule.auto_counter_enabled) {
        (false, false) => "manuell".to_string(),
        (true, false) => "auto".to_string(),
        (false, true) => format!("Gegenangebot {:.0}%", rule.counter_offer_percentage),
        (true, true) => format!("auto + Gegenangebot {:.0}%", rule.counter_offer_percentage),
    }
}

fn rule_row(rule: &NegotiationRule) -> Row<'_> {
    let (active_text, active_color) = if rule.is_active {
        ("● aktiv", Color::Green)
    } else {
        ("○ inaktiv", Color::DarkGray)
    };
    let type_text = match rule.time_range_text() {
        Some(range) => format!("{} ({})", rule.rule_type.label(), range),
        None => rule.rule_type.label().to_string(),
    };

    Row::new(vec![
        Cell::from(active_text).style(Style::default().fg(active_color)),
        Cell::from(truncate(&rule.name, 28)).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(type_text).style(Style::default().fg(type_color(&rule.rule_type))),
        Cell::from(format!("{:.0}%", rule.min_price_percentage)),
        Cell::from(format!("{:.0}%", rule.auto_accept_percentage)),
        Cell::from(format!("{:.0}%", rule.auto_decline_percentage)),
        Cell::from(rule.max_counter_offers.to_string()),
        Cell::from(rule.negotiation_tone.label())
            .style(Style::default().fg(tone_color(&rule.negotiation_tone))),
        Cell::from(automation_text(rule)),
    ])
}

fn render_rule_table(frame: &mut Frame, area: Rect, rules: &RulesState) {
    let title = format!(
        " Verhandlungsregeln ({} aktiv von {}) ",
        rules.rules.iter().filter(|r| r.is_active).count(),
        rules.rules.len()
    );
    let block = panel_block(&title);

    if rules.rules.is_empty() {
        let text = if rules.loading {
            "Lade Regeln..."
        } else {
            "Noch keine Regeln angelegt. [n] Neue Regel"
        };
        let placeholder = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(vec![
        header_cell("Status"),
        header_cell("Name"),
        header_cell("Typ"),
        header_cell("Min."),
        header_cell("Annahme"),
        header_cell("Ablehnung"),
        header_cell("Max. GA"),
        header_cell("Ton"),
        header_cell("Automatik"),
    ]);
    let rows: Vec<Row> = rules.rules.iter().map(rule_row).collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10), // Status
            Constraint::Min(20),    // Name
            Constraint::Length(26), // Typ
            Constraint::Length(6),  // Min.
            Constraint::Length(8),  // Annahme
            Constraint::Length(10), // Ablehnung
            Constraint::Length(8),  // Max. GA
            Constraint::Length(14), // Ton
            Constraint::Length(26), // Automatik
        ],
    )
    .header(header)
    .block(block)
    .highlight_style(selected_style())
    .column_spacing(1);

    let mut table_state = TableState::default().with_selected(Some(rules.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_rule_editor(frame: &mut Frame, area: Rect, editor: &RuleEditor) {
    let height = RuleField::ALL.len() as u16 + 6;
    let popup = centered_rect(60, height, area);
    frame.render_widget(Clear, popup);

    let label_style = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = RuleField::ALL
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let focused = idx == editor.field;
            let value = match (&editor.input, focused) {
                (Some(input), true) => Span::styled(input.with_cursor(), Style::default().fg(Color::Yellow)),
                _ => Span::raw(field.value(&editor.draft)),
            };
            let marker = if focused { "▶ " } else { "  " };
            let label = format!("{}{:<28}", marker, field.label());
            let style = if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                label_style
            };
            Line::from(vec![Span::styled(label, style), value])
        })
        .collect();

    lines.push(Line::default());
    if editor.saving {
        lines.push(Line::from(Span::styled("Speichere...", Style::default().fg(Color::Cyan))));
    } else if let Some(error) = &editor.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    } else {
        lines.push(Line::default());
    }
    lines.push(Line::from(Span::styled(
        "[↑/↓] Feld  [Enter] Bearbeiten  [Leertaste] Umschalten  [s] Speichern  [Esc] Schließen",
        label_style,
    )));

    let title = if editor.is_new() {
        " Neue Regel ".to_string()
    } else {
        format!(" Regel bearbeiten: {} ", truncate(&editor.draft.name, 30))
    };
    let paragraph = Paragraph::new(lines)
        .block(panel_block(&title))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup);
}

fn render_delete_confirmation(frame: &mut Frame, area: Rect, rule: &NegotiationRule) {
    let popup = centered_rect(50, 5, area);
    frame.render_widget(Clear, popup);

    let text = vec![
        Line::from(format!("Regel „{}“ wirklich löschen?", truncate(&rule.name, 40))),
        Line::from(vec![
            Span::styled("[y] ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw("Löschen   "),
            Span::styled("[beliebige Taste] ", Style::default().fg(Color::DarkGray)),
            Span::raw("Abbrechen"),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(text).block(panel_block(" Regel löschen ")),
        popup,
    );
}
