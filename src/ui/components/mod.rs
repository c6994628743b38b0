pub mod logs_panel;
pub mod offers_panel;
pub mod rules_panel;
pub mod settings_panel;
pub mod stats_panel;

pub use logs_panel::render_logs_panel;
pub use offers_panel::render_offers_panel;
pub use rules_panel::render_rules_panel;
pub use settings_panel::render_settings_panel;
pub use stats_panel::render_stats_panel;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell},
};

pub fn panel_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
}

pub fn header_cell(text: &str) -> Cell<'_> {
    Cell::from(text).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
}

pub fn selected_style() -> Style {
    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
}

/// Popup area: `percent_x` of the width, `height` lines, centered.
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x.min(100)) / 2),
            Constraint::Percentage(percent_x.min(100)),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}

/// Truncate to `max` chars, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", head)
}
