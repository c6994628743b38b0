use crate::ui::actions::Command;
use crate::ui::components::{
    render_logs_panel, render_offers_panel, render_rules_panel, render_settings_panel,
    render_stats_panel,
};
use crate::ui::keys::{dispatch, handle_key_event};
use crate::ui::state::{lock, AppState, SharedState, Tab, ToastKind};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

const TOAST_WIDTH: u16 = 50;

pub fn run_tui(state: SharedState, tx: UnboundedSender<Command>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the UI loop
    let result = run_app(&mut terminal, &state, &tx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &SharedState,
    tx: &UnboundedSender<Command>,
) -> Result<()> {
    loop {
        // Update terminal width in state for dynamic history sizing
        let terminal_size = terminal.size()?;
        lock(state).set_terminal_width(terminal_size.width);

        // Clone state for rendering
        let current_state = lock(state).clone();

        terminal.draw(|frame| draw(frame, &current_state))?;

        // Handle input with timeout to allow for periodic updates
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let commands = handle_key_event(key, &mut lock(state));
                    dispatch(tx, commands);
                }
            }
        }

        if lock(state).should_quit {
            break;
        }
    }

    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Active panel
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    render_header(frame, chunks[0], state);
    render_tabs(frame, chunks[1], state.tab);

    match state.tab {
        Tab::Offers => render_offers_panel(frame, chunks[2], &state.offers),
        Tab::Logs => render_logs_panel(frame, chunks[2], &state.logs),
        Tab::Rules => render_rules_panel(frame, chunks[2], &state.rules),
        Tab::Settings => render_settings_panel(frame, chunks[2], &state.settings),
        Tab::Stats => render_stats_panel(
            frame,
            chunks[2],
            &state.stats,
            &state.success_rate_history,
            &state.pending_history,
        ),
    }

    render_footer(frame, chunks[3], state);
    render_toasts(frame, frame.size(), state);
}

fn bordered() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let health = match &state.health {
        Some(h) if h.is_healthy() => Span::styled(
            match &h.version {
                Some(v) => format!("● Verbunden (v{})", v),
                None => "● Verbunden".to_string(),
            },
            Style::default().fg(Color::Green),
        ),
        Some(h) => Span::styled(format!("● {}", h.status), Style::default().fg(Color::Yellow)),
        None => Span::styled("● Nicht erreichbar", Style::default().fg(Color::Red)),
    };

    let updated = match (&state.stats_error, state.last_stats_update) {
        (Some(_), _) => Span::styled("Statistiken nicht verfügbar", Style::default().fg(Color::Red)),
        (None, Some(at)) => Span::styled(
            format!("Aktualisiert vor {:.1}s", at.elapsed().as_secs_f64()),
            Style::default().fg(Color::DarkGray),
        ),
        (None, None) => Span::styled("Noch nicht aktualisiert", Style::default().fg(Color::DarkGray)),
    };

    let header_text = Line::from(vec![
        Span::styled(
            "OFFERDESK",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" - {}  ", state.base_url)),
        health,
        Span::raw("  "),
        updated,
    ]);

    frame.render_widget(Paragraph::new(header_text).block(bordered()), area);
}

fn render_tabs(frame: &mut Frame, area: Rect, active: Tab) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(idx, tab)| Line::from(format!("{} {}", idx + 1, tab.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .block(bordered())
        .select(active.index())
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn key_hints(state: &AppState) -> &'static str {
    match state.tab {
        Tab::Offers if state.offers.respond.is_some() => {
            "[Tab] Feld  [←/→] Aktion  [Enter] Senden  [Esc] Abbrechen"
        }
        Tab::Offers => {
            "[j/k] Auswahl  [f] Filter  [d] Details  [a] KI-Analyse  [o] Antworten  [s] Sync  [w] Arbeits-Sync  [b] Batch  [x] Stopp"
        }
        Tab::Logs if state.logs.search_input.is_some() => "[Enter] Übernehmen  [Esc] Verwerfen",
        Tab::Logs => {
            "[j/k] Auswahl  [/] Suche  [a] Aktion  [t] Zeitraum  [c] Filter zurücksetzen  [d] Details  [e] Export"
        }
        Tab::Rules if state.rules.editor.is_some() => "[s] Speichern  [Esc] Schließen",
        Tab::Rules => "[j/k] Auswahl  [n] Neu  [e] Bearbeiten  [Leertaste] Aktivieren  [d] Löschen",
        Tab::Settings if state.settings.input.is_some() => "[Enter] Übernehmen  [Esc] Verwerfen",
        Tab::Settings => {
            "[j/k] Auswahl  [Enter] Bearbeiten  [m] Geheimnisse  [s] Speichern  [e] eBay-Test  [o] OpenAI-Test"
        }
        Tab::Stats => "[r] Aktualisieren",
    }
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let footer_text = Line::from(vec![
        Span::raw("[Q]uit  [Tab/1-5] Ansicht  "),
        Span::styled(key_hints(state), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer_text).block(bordered()), area);
}

/// Stack toasts in the top right corner, newest at the bottom.
fn render_toasts(frame: &mut Frame, area: Rect, state: &AppState) {
    let width = TOAST_WIDTH.min(area.width);
    let mut y = area.y + 1;
    for toast in &state.toasts {
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Info => Color::Cyan,
        };
        let inner_width = width.saturating_sub(2).max(1) as usize;
        let lines = (toast.text.chars().count() / inner_width + 1) as u16;
        let height = lines + 2;
        if y + height > area.bottom() {
            break;
        }
        let rect = Rect {
            x: area.right().saturating_sub(width + 1),
            y,
            width,
            height,
        };
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(toast.text.clone())
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                ),
            rect,
        );
        y += height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn rendered(state: &AppState) -> String {
        let backend = TestBackend::new(140, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| draw(frame, state)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn every_tab_renders() {
        let mut state = AppState::new("http://localhost:5000", Duration::from_secs(3));
        for tab in Tab::ALL {
            state.tab = tab;
            let screen = rendered(&state);
            assert!(screen.contains("OFFERDESK"));
            assert!(screen.contains(tab.title()));
        }
    }

    #[test]
    fn toasts_are_drawn() {
        let mut state = AppState::new("http://localhost:5000", Duration::from_secs(3));
        state.success("Regel gespeichert");
        assert!(rendered(&state).contains("Regel gespeichert"));
    }
}
