//! Network metrics table.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::types::NetworkMetrics;
use crate::ui::{theme, util::human};

fn pct_color(v: f64) -> Color {
    if v >= 90.0 {
        theme::CRITICAL
    } else if v >= 70.0 {
        theme::MEDIUM
    } else {
        Color::Reset
    }
}

pub fn metric_rows(m: &NetworkMetrics) -> Vec<(&'static str, String, Color)> {
    vec![
        ("Packets/s", format!("{:.0}", m.packets_per_sec), Color::Reset),
        ("Connections", format!("{:.0}", m.active_connections), Color::Reset),
        ("Bandwidth", format!("{}/s", human(m.bytes_per_sec)), Color::Reset),
        (
            "Dropped",
            format!("{:.0}", m.dropped_packets),
            if m.dropped_packets > 0.0 { theme::MEDIUM } else { Color::Reset },
        ),
        ("Encryption hits", format!("{:.0}", m.encryption_hits), Color::Reset),
        ("CPU", format!("{:.1}%", m.cpu_usage), pct_color(m.cpu_usage)),
        ("Memory", format!("{:.1}%", m.memory_usage), pct_color(m.memory_usage)),
        (
            "Errors",
            format!("{:.0}", m.error_count),
            if m.error_count > 0.0 { theme::HIGH } else { Color::Reset },
        ),
    ]
}

pub fn draw_metrics(f: &mut ratatui::Frame<'_>, area: Rect, m: Option<&NetworkMetrics>) {
    let block = Block::default().borders(Borders::ALL).title("Network");
    let Some(m) = m else {
        f.render_widget(block, area);
        return;
    };
    let rows = metric_rows(m).into_iter().map(|(name, value, color)| {
        Row::new(vec![
            Cell::from(name).style(Style::default().fg(theme::MUTED)),
            Cell::from(value).style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ])
    });
    let table = Table::new(rows, [Constraint::Length(16), Constraint::Min(8)]).block(block);
    f.render_widget(table, area);
}
