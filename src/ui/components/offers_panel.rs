use crate::domain::money::{format_eur, format_opt_eur};
use crate::domain::timefmt::display_timestamp;
use crate::domain::{Offer, OfferFilter, OfferStatus, ResponseAction};
use crate::ui::components::{centered_rect, header_cell, panel_block, selected_style, truncate};
use crate::ui::state::{BatchView, OffersState, RespondDialog, RespondField};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame,
};

pub fn render_offers_panel(frame: &mut Frame, area: Rect, offers: &OffersState) {
    let batch_height = if offers.batch.is_some() { 4 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Filter
            Constraint::Length(batch_height), // Batch progress
            Constraint::Min(5),               // Table
        ])
        .split(area);

    render_filter_bar(frame, chunks[0], offers);
    if let Some(batch) = &offers.batch {
        render_batch_progress(frame, chunks[1], batch);
    }

    if offers.show_detail {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[2]);
        render_offer_table(frame, body[0], offers);
        render_offer_detail(frame, body[1], offers.selected_offer());
    } else {
        render_offer_table(frame, chunks[2], offers);
    }

    if let Some(dialog) = &offers.respond {
        render_respond_dialog(frame, area, dialog);
    }
}

fn status_color(status: &OfferStatus) -> Color {
    match status {
        OfferStatus::Pending => Color::Yellow,
        OfferStatus::Accepted => Color::Green,
        OfferStatus::Rejected => Color::Red,
        OfferStatus::Countered => Color::Blue,
        OfferStatus::Other(_) => Color::Gray,
    }
}

/// Share of the list price: green from 80 %, yellow from 60 %.
fn percentage_color(pct: f64) -> Color {
    if pct >= 80.0 {
        Color::Green
    } else if pct >= 60.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn render_filter_bar(frame: &mut Frame, area: Rect, offers: &OffersState) {
    let selected = OfferFilter::ALL
        .iter()
        .position(|f| *f == offers.filter)
        .unwrap_or(0);

    let mut title = String::from(" Filter [f] ");
    if offers.loading {
        title.push_str("· lädt... ");
    }
    if offers.syncing {
        title.push_str("· synchronisiert... ");
    }

    let tabs = Tabs::new(OfferFilter::ALL.iter().map(|f| f.label()).collect::<Vec<_>>())
        .select(selected)
        .block(panel_block(&title))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_batch_progress(frame: &mut Frame, area: Rect, batch: &BatchView) {
    let status = &batch.status;
    let title = if batch.running {
        " Batch-Sync läuft [x] stoppen "
    } else {
        " Batch-Sync beendet "
    };
    let block = panel_block(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let pct = status.progress_pct();
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .percent(pct)
        .label(format!(
            "{}/{} Artikel ({}%)",
            status.processed_items, status.total_items, pct
        ));
    frame.render_widget(gauge, rows[0]);

    let info = Line::from(vec![
        Span::raw(format!("Batch {}  ", status.current_batch)),
        Span::styled(
            format!("{} gefunden  ", status.found_offers),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!("{} Fehler  ", status.errors),
            Style::default().fg(if status.errors > 0 { Color::Red } else { Color::DarkGray }),
        ),
        Span::styled(status.status_message.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(info), rows[1]);
}

fn offer_row<'a>(offer: &'a Offer, analyzing: bool) -> Row<'a> {
    let pct = offer.percentage();
    let mut offer_text = vec![
        Span::raw(format_opt_eur(offer.offer_amount)),
        Span::styled(format!(" {:.1}%", pct), Style::default().fg(percentage_color(pct))),
    ];
    if let Some(counter) = offer.counter_amount {
        offer_text.push(Span::styled(
            format!(" ↺ {}", format_eur(counter)),
            Style::default().fg(Color::Blue),
        ));
    }

    let ai = if analyzing {
        "analysiert...".to_string()
    } else {
        offer
            .ai_decision
            .clone()
            .or_else(|| offer.ai_recommendation.as_ref().map(|r| r.recommendation.clone()))
            .unwrap_or_else(|| "-".to_string())
    };

    Row::new(vec![
        Cell::from(format!("{} ({})", truncate(offer.title(), 40), offer.item_id)),
        Cell::from(offer.buyer()),
        Cell::from(format_opt_eur(offer.base_price())),
        Cell::from(Line::from(offer_text)),
        Cell::from(offer.type_label()),
        Cell::from(offer.status.label())
            .style(Style::default().fg(status_color(&offer.status))),
        Cell::from(ai),
        Cell::from(display_timestamp(offer.created())),
    ])
}

fn render_offer_table(frame: &mut Frame, area: Rect, offers: &OffersState) {
    let title = format!(" Angebote ({}) ", offers.offers.len());
    let block = panel_block(&title);

    if offers.offers.is_empty() {
        let text = if offers.loading {
            "Lade Angebote..."
        } else {
            "Keine Angebote gefunden. [s] Sync, [w] Sofort-Sync, [b] Batch-Sync"
        };
        let placeholder = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(vec![
        header_cell("Artikel"),
        header_cell("Käufer"),
        header_cell("Listenpreis"),
        header_cell("Angebot"),
        header_cell("Typ"),
        header_cell("Status"),
        header_cell("KI"),
        header_cell("Datum"),
    ]);

    let rows: Vec<Row> = offers
        .offers
        .iter()
        .map(|o| offer_row(o, offers.analyzing.as_deref() == Some(o.id.as_str())))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),    // Artikel
            Constraint::Length(16), // Käufer
            Constraint::Length(12), // Listenpreis
            Constraint::Length(28), // Angebot
            Constraint::Length(13), // Typ
            Constraint::Length(13), // Status
            Constraint::Length(14), // KI
            Constraint::Length(20), // Datum
        ],
    )
    .header(header)
    .block(block)
    .highlight_style(selected_style())
    .column_spacing(1);

    let mut table_state = TableState::default().with_selected(Some(offers.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_offer_detail(frame: &mut Frame, area: Rect, offer: Option<&Offer>) {
    let block = panel_block(" Details [d] ");
    let Some(offer) = offer else {
        frame.render_widget(Paragraph::new("Kein Angebot ausgewählt").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            offer.title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![Span::styled("Artikel-ID: ", label), Span::raw(offer.item_id.clone())]),
        Line::from(vec![Span::styled("Käufer: ", label), Span::raw(offer.buyer().to_string())]),
        Line::from(vec![
            Span::styled("Preis: ", label),
            Span::raw(format!(
                "{} von {} ({:.1}%)",
                format_opt_eur(offer.offer_amount),
                format_opt_eur(offer.base_price()),
                offer.percentage()
            )),
        ]),
        Line::from(vec![
            Span::styled("Status: ", label),
            Span::styled(
                offer.status.label().to_string(),
                Style::default().fg(status_color(&offer.status)),
            ),
        ]),
    ];

    if offer.has_counter() {
        lines.push(Line::from(vec![
            Span::styled("Gegenvorschlag: ", label),
            Span::raw(format_opt_eur(offer.counter_amount)),
        ]));
        if let Some(message) = &offer.counter_message {
            lines.push(Line::from(format!("„{}“", message)));
        }
    }
    if let Some(price) = offer.counter_price {
        lines.push(Line::from(vec![
            Span::styled("Unser Gegenangebot: ", label),
            Span::raw(format_eur(price)),
        ]));
    }
    if let Some(message) = &offer.response_message {
        lines.push(Line::from(vec![Span::styled("Antwort: ", label), Span::raw(message.clone())]));
    }

    if let Some(rec) = &offer.ai_recommendation {
        lines.push(Line::default());
        let confidence = rec
            .confidence
            .map(|c| format!(" ({:.0}% sicher)", c))
            .unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!("KI-Empfehlung: {}{}", rec.recommendation, confidence),
            Style::default().fg(Color::Magenta),
        )));
        if let Some(reasoning) = &rec.reasoning {
            lines.push(Line::from(reasoning.clone()));
        }
    } else if let Some(decision) = &offer.ai_decision {
        lines.push(Line::default());
        let confidence = offer
            .ai_confidence
            .map(|c| format!(" ({:.0}% sicher)", c))
            .unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!("KI-Entscheidung: {}{}", decision, confidence),
            Style::default().fg(Color::Magenta),
        )));
        if let Some(reasoning) = &offer.ai_reasoning {
            lines.push(Line::from(reasoning.clone()));
        }
    }

    let detail = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(detail, area);
}

fn render_respond_dialog(frame: &mut Frame, area: Rect, dialog: &RespondDialog) {
    let popup = centered_rect(60, 11, area);
    frame.render_widget(Clear, popup);

    let focus_style = |field: RespondField| {
        if dialog.focus == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let field_text = |field: RespondField, text: String, input: &str| {
        if dialog.focus == field {
            text
        } else {
            input.to_string()
        }
    };

    let actions: Vec<Span> = [ResponseAction::Accept, ResponseAction::Reject, ResponseAction::Counter]
        .into_iter()
        .map(|action| {
            let style = if action == dialog.action {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Span::styled(format!(" {} ", action.label()), style)
        })
        .collect();

    let mut action_line = vec![Span::styled("Aktion:    ", focus_style(RespondField::Action))];
    action_line.extend(actions);

    let mut lines = vec![
        Line::from(truncate(&dialog.offer_title, 60)),
        Line::default(),
        Line::from(action_line),
    ];
    if dialog.action == ResponseAction::Counter {
        lines.push(Line::from(vec![
            Span::styled("Preis (€): ", focus_style(RespondField::Price)),
            Span::raw(field_text(
                RespondField::Price,
                dialog.price.with_cursor(),
                dialog.price.value(),
            )),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Nachricht: ", focus_style(RespondField::Message)),
        Span::raw(field_text(
            RespondField::Message,
            dialog.message.with_cursor(),
            dialog.message.value(),
        )),
    ]));
    lines.push(Line::default());
    if dialog.submitting {
        lines.push(Line::from(Span::styled("Sende...", Style::default().fg(Color::Cyan))));
    } else if let Some(error) = &dialog.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(Span::styled(
        "[Tab] Feld  [←/→] Aktion  [Enter] Senden  [Esc] Abbrechen",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .block(panel_block(" Manuelle Antwort "))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup);
}
