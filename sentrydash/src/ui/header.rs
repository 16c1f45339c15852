//! Top header with system status, risk gauge and simulation runtime, plus the
//! one-line footer with key help and degraded sources.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::clock::format_elapsed;
use crate::poll::TaskHealth;
use crate::sink::{NoticeLevel, Notification, StatusView};
use crate::types::SystemStatus;
use crate::ui::{theme, util::risk_color};

fn status_color(s: SystemStatus) -> Color {
    match s {
        SystemStatus::Critical => theme::CRITICAL,
        SystemStatus::Warning => theme::MEDIUM,
        SystemStatus::Normal | SystemStatus::Unknown => theme::LOW,
    }
}

fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    status: Option<&StatusView>,
    notice: Option<&Notification>,
    now_epoch: f64,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let mut spans = vec![Span::styled(
        "sentrydash ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    match status {
        Some(s) => {
            spans.push(Span::styled(
                s.status.label().to_uppercase(),
                Style::default()
                    .fg(status_color(s.status))
                    .add_modifier(Modifier::BOLD),
            ));
            let sim = match s.simulation.started_at {
                Some(t) if s.simulation.running => {
                    let secs = (now_epoch - t as f64).max(0.0) as u64;
                    format!("  sim running {}", format_elapsed(secs))
                }
                _ => "  sim stopped".into(),
            };
            spans.push(Span::raw(sim));
        }
        None => spans.push(Span::styled("connecting...", Style::default().fg(theme::MUTED))),
    }
    let mut lines = vec![Line::from(spans)];
    if let Some(n) = notice {
        lines.push(Line::from(Span::styled(
            n.message.clone(),
            Style::default().fg(notice_color(n.level)),
        )));
    }
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
        cols[0],
    );

    let risk = status.and_then(|s| s.risk_score).unwrap_or(0.0);
    let label = status.map(|s| s.risk_label()).unwrap_or_else(|| "-".into());
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Risk score"))
        .gauge_style(Style::default().fg(risk_color(risk)))
        .percent(risk.clamp(0.0, 100.0).round() as u16)
        .label(label);
    f.render_widget(g, cols[1]);
}

pub fn draw_footer(f: &mut ratatui::Frame<'_>, area: Rect, health: &[TaskHealth]) {
    let mut spans = vec![Span::styled(
        "s start  x stop  d ddos  r exhaust  a/m mode  t trigger  k disable  6/1/2 horizon  q quit",
        Style::default().fg(theme::MUTED),
    )];
    let degraded: Vec<&str> = health
        .iter()
        .filter(|h| h.degraded)
        .map(|h| h.kind.name())
        .collect();
    if !degraded.is_empty() {
        spans.push(Span::styled(
            format!("   degraded: {}", degraded.join(", ")),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
