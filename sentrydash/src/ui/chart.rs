//! Live chart panes: one sparkline per series, sharing the sample labels.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

/// Sparkline wants integers; keep one decimal of resolution.
fn scaled(values: &[f64]) -> Vec<u64> {
    values
        .iter()
        .map(|v| (v.max(0.0) * 10.0).round() as u64)
        .collect()
}

pub fn draw_series(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    labels: &[String],
    values: &[f64],
    color: Color,
) {
    let max_points = area.width.saturating_sub(2) as usize;
    let start = values.len().saturating_sub(max_points);
    let data = scaled(&values[start..]);

    let now = values.last().map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".into());
    let at = labels.last().map(String::as_str).unwrap_or("--:--:--");
    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{title} | now: {now} @ {at}")),
        )
        .data(&data)
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}
