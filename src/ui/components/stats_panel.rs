use crate::domain::money::format_opt_eur;
use crate::domain::timefmt::display_timestamp;
use crate::domain::DashboardStats;
use crate::ui::components::panel_block;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Gauge, Paragraph, Sparkline},
    Frame,
};
use std::collections::VecDeque;

pub fn render_stats_panel(
    frame: &mut Frame,
    area: Rect,
    stats: &DashboardStats,
    success_rate_history: &VecDeque<u64>,
    pending_history: &VecDeque<u64>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Success rate gauge
            Constraint::Min(10),   // Chart + figures
            Constraint::Length(6), // History
        ])
        .split(area);

    render_success_gauge(frame, rows[0], stats);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    render_distribution(frame, middle[0], stats);
    render_figures(frame, middle[1], stats);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);
    render_history(frame, bottom[0], " Erfolgsquote (Verlauf) ", success_rate_history, Color::Green);
    render_history(frame, bottom[1], " Wartende Angebote (Verlauf) ", pending_history, Color::Yellow);
}

fn render_success_gauge(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let rate = if stats.success_rate.is_finite() {
        stats.success_rate.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let color = if rate >= 60.0 {
        Color::Green
    } else if rate >= 30.0 {
        Color::Yellow
    } else {
        Color::Red
    };
    let gauge = Gauge::default()
        .block(panel_block(" Erfolgsquote "))
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .ratio(rate / 100.0)
        .label(format!(
            "{:.1}% ({} von {} erfolgreich)",
            rate,
            stats.successful(),
            stats.total_offers
        ));
    frame.render_widget(gauge, area);
}

fn render_distribution(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let data = stats.distribution();
    let max = data.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);
    let chart = BarChart::default()
        .block(panel_block(" Statusverteilung "))
        .data(&data[..])
        .max(max)
        .bar_width(13)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(chart, area);
}

fn render_figures(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let label = Style::default().fg(Color::DarkGray);
    let figure = |name: &str, value: String| {
        Line::from(vec![Span::styled(format!("{:<22}", name), label), Span::raw(value)])
    };

    let mut lines = vec![
        figure("Angebote gesamt", stats.total_offers.to_string()),
        figure("Durchschn. Angebot", format_opt_eur(stats.avg_offer_price)),
        Line::default(),
        figure("Annahmequote", format!("{:.1}%", stats.acceptance_rate())),
        figure("Ablehnungsquote", format!("{:.1}%", stats.rejection_rate())),
        figure("Verhandlungsquote", format!("{:.1}%", stats.negotiation_rate())),
        Line::default(),
    ];
    let shares = stats
        .distribution_pct()
        .iter()
        .map(|(name, pct)| format!("{} {}%", name, pct))
        .collect::<Vec<_>>()
        .join(" · ");
    lines.push(Line::from(Span::styled(shares, label)));
    lines.push(Line::default());
    lines.push(figure(
        "Letzte Synchronisation",
        display_timestamp(stats.last_sync.as_deref()),
    ));
    lines.push(figure(
        "Verbindung",
        stats
            .connection_status
            .clone()
            .unwrap_or_else(|| "Unbekannt".to_string()),
    ));

    frame.render_widget(Paragraph::new(lines).block(panel_block(" Kennzahlen ")), area);
}

fn render_history(frame: &mut Frame, area: Rect, title: &str, history: &VecDeque<u64>, color: Color) {
    let data: Vec<u64> = history.iter().copied().collect();
    let sparkline = Sparkline::default()
        .block(panel_block(title))
        .data(&data)
        .style(Style::default().fg(color));
    frame.render_widget(sparkline, area);
}
