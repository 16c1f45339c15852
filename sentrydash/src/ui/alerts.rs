//! Recent alerts list, newest at the bottom.

use std::time::Duration;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::alerts::{AlertFeedView, AlertItem};
use crate::ui::{theme, util::severity_color};

/// `since` is how long ago the feed was rendered; an item stays highlighted
/// until its remaining pulse time runs out.
fn highlighted(item: &AlertItem, since: Duration) -> bool {
    item.highlight_for.is_some_and(|h| since < h)
}

pub fn draw_alerts(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    feed: Option<&AlertFeedView>,
    since: Duration,
) {
    let title = match feed {
        Some(v) if v.overflow() > 0 => format!("Alerts (+{} older)", v.overflow()),
        _ => "Alerts".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let lines: Vec<Line> = match feed {
        None => vec![Line::from(Span::styled(
            "waiting for first poll...",
            Style::default().fg(theme::MUTED),
        ))],
        Some(AlertFeedView::Nominal) => vec![Line::from(Span::styled(
            "No alerts. System operating normally.",
            Style::default().fg(theme::LOW),
        ))],
        Some(AlertFeedView::Unavailable { reason }) => vec![Line::from(Span::styled(
            format!("alerts unavailable: {reason}"),
            Style::default().fg(theme::MEDIUM),
        ))],
        Some(AlertFeedView::Alerts { items, .. }) => items
            .iter()
            .map(|item| {
                let color = severity_color(item.severity);
                let mut base = Style::default();
                if highlighted(item, since) {
                    base = base.bg(theme::HIGHLIGHT_BG).add_modifier(Modifier::BOLD);
                }
                Line::from(vec![
                    Span::styled(format!("{:<20}", item.type_label), base.fg(color)),
                    Span::styled(
                        format!("{:>5.1} ", item.alert.risk_score),
                        base.fg(color),
                    ),
                    Span::styled(item.alert.message.clone(), base),
                    Span::styled(format!("  {}", item.time_ago), base.fg(theme::MUTED)),
                ])
            })
            .collect(),
    };
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true }),
        area,
    );
}
