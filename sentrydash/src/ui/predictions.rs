//! Forecast panels. Each one draws its own placeholder when its sub-fetch failed.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline, Wrap},
};

use crate::predictions::{
    HeatCell, InsightsView, Panel, PanelState, PredictionsView, ProbabilitySeries, TimelineRow,
    TimelineTier,
};
use crate::types::RiskLevel;
use crate::ui::theme;

fn placeholder<T>(panel: &Panel<T>) -> Paragraph<'static> {
    let text = match &panel.state {
        PanelState::Unavailable(reason) => format!("unavailable: {reason}"),
        _ => "loading...".into(),
    };
    Paragraph::new(Span::styled(text, Style::default().fg(theme::MUTED))).wrap(Wrap { trim: true })
}

fn level_color(level: RiskLevel) -> Color {
    match level {
        RiskLevel::High => theme::CRITICAL,
        RiskLevel::Medium => theme::MEDIUM,
        RiskLevel::Low => theme::LOW,
    }
}

fn heat_line(cells: &[HeatCell]) -> Line<'static> {
    Line::from(
        cells
            .iter()
            .map(|c| {
                let color = if c.probability.is_some() {
                    level_color(c.level)
                } else {
                    theme::MUTED
                };
                Span::styled("█", Style::default().fg(color))
            })
            .collect::<Vec<_>>(),
    )
}

fn timeline_line(r: &TimelineRow) -> Line<'static> {
    let (tag, color) = match r.tier {
        TimelineTier::High => ("HIGH  ", theme::CRITICAL),
        TimelineTier::Medium => ("MEDIUM", theme::MEDIUM),
        TimelineTier::Normal => ("NORMAL", theme::LOW),
    };
    let p = r
        .probability
        .map(|p| format!(" {p:.1}%"))
        .unwrap_or_default();
    Line::from(vec![
        Span::styled(tag, Style::default().fg(color)),
        Span::raw(format!(" {}{p}", r.when)),
    ])
}

fn insight_lines(i: &InsightsView) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(r) = i.short_term_risk {
        lines.push(Line::from(format!(
            "Short term: {r:.1}% ({})",
            i.short_term_band.unwrap_or("-")
        )));
    }
    if let Some(t) = i.trend {
        lines.push(Line::from(format!("Trend: {}", t.label())));
    }
    if let Some(c) = i.confidence_pct {
        lines.push(Line::from(format!("Confidence: {c:.0}%")));
    }
    if let Some(rec) = &i.recommendation {
        lines.push(Line::from(rec.clone()));
    }
    if lines.is_empty() {
        lines.push(Line::from("no insights yet"));
    }
    lines
}

fn draw_probability(f: &mut ratatui::Frame<'_>, area: Rect, block: Block<'_>, s: &ProbabilitySeries) {
    let data: Vec<u64> = s.values.iter().map(|v| v.clamp(0.0, 100.0).round() as u64).collect();
    let peak = s.values.iter().cloned().fold(0.0_f64, f64::max);
    let title = match s.confidence {
        Some(c) => format!("peak {peak:.1}% | confidence {:.0}%", c * 100.0),
        None => format!("peak {peak:.1}%"),
    };
    f.render_widget(
        Sparkline::default()
            .block(block.title_bottom(title))
            .data(&data)
            .max(100)
            .style(Style::default().fg(theme::FORECAST_LINE)),
        area,
    );
}

/// Panel title; while a simulation runs it also says how fresh the data is.
fn title(p: Option<&PredictionsView>, now_epoch: f64, sim_running: bool) -> String {
    let hours = p.map(|p| p.horizon_hours).unwrap_or(24);
    match p.and_then(|p| p.last_full_update) {
        Some(at) if sim_running => {
            format!("Forecast ({hours}h) | updated {}s ago", (now_epoch - at).max(0.0) as u64)
        }
        _ => format!("Forecast ({hours}h)"),
    }
}

pub fn draw_predictions(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    p: Option<&PredictionsView>,
    now_epoch: f64,
    sim_running: bool,
) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title(p, now_epoch, sim_running));
    let inner = outer.inner(area);
    f.render_widget(outer, area);
    let Some(p) = p else { return };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Length(3), Constraint::Min(4)])
        .split(inner);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);

    let prob_block = Block::default().borders(Borders::ALL).title("Attack probability");
    match p.probability.visible() {
        Some(s) => draw_probability(f, rows[0], prob_block, s),
        None => f.render_widget(placeholder(&p.probability).block(prob_block), rows[0]),
    }

    let heat_block = Block::default().borders(Borders::ALL).title("24h heatmap");
    match p.heatmap.visible() {
        Some(cells) => f.render_widget(Paragraph::new(heat_line(cells)).block(heat_block), rows[1]),
        None => f.render_widget(placeholder(&p.heatmap).block(heat_block), rows[1]),
    }

    let tl_block = Block::default().borders(Borders::ALL).title("Risk timeline");
    match p.timeline.visible() {
        Some(rows_) => f.render_widget(
            Paragraph::new(rows_.iter().map(timeline_line).collect::<Vec<_>>()).block(tl_block),
            bottom[0],
        ),
        None => f.render_widget(placeholder(&p.timeline).block(tl_block), bottom[0]),
    }

    let in_block = Block::default().borders(Borders::ALL).title("Insights");
    match p.insights.visible() {
        Some(i) => f.render_widget(
            Paragraph::new(insight_lines(i))
                .block(in_block)
                .wrap(Wrap { trim: true }),
            bottom[1],
        ),
        None => f.render_widget(placeholder(&p.insights).block(in_block), bottom[1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictions::Trend;

    #[test]
    fn insights_render_only_known_fields() {
        let v = InsightsView {
            short_term_risk: Some(72.0),
            short_term_band: Some("high risk"),
            trend: Some(Trend::Rising),
            confidence_pct: None,
            recommendation: None,
        };
        let lines = insight_lines(&v);
        assert_eq!(lines.len(), 2);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(first, "Short term: 72.0% (high risk)");
    }

    #[test]
    fn freshness_only_while_simulating() {
        let v = PredictionsView {
            horizon_hours: 6,
            last_full_update: Some(100.0),
            ..PredictionsView::default()
        };
        assert_eq!(title(Some(&v), 104.5, true), "Forecast (6h) | updated 4s ago");
        assert_eq!(title(Some(&v), 104.5, false), "Forecast (6h)");
        assert_eq!(title(None, 0.0, true), "Forecast (24h)");
    }

    #[test]
    fn heat_line_has_a_cell_per_hour() {
        let cells: Vec<HeatCell> = (0..24)
            .map(|hour| HeatCell {
                hour,
                level: RiskLevel::Low,
                probability: None,
            })
            .collect();
        assert_eq!(heat_line(&cells).spans.len(), 24);
    }
}
