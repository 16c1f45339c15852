//! AI detector panel.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ai::{AiRiskBand, AiView};
use crate::ui::theme;

pub fn draw_ai(f: &mut ratatui::Frame<'_>, area: Rect, ai: Option<&AiView>) {
    let block = Block::default().borders(Borders::ALL).title("AI detector");
    let Some(ai) = ai else {
        f.render_widget(block, area);
        return;
    };
    let (model, model_color) = if ai.model_running {
        ("running", theme::LOW)
    } else {
        ("rules only", theme::MEDIUM)
    };
    let risk = match ai.latest_risk {
        Some((score, band)) => {
            let c = match band {
                AiRiskBand::High => theme::CRITICAL,
                AiRiskBand::Medium => theme::MEDIUM,
                AiRiskBand::Normal => theme::LOW,
            };
            Span::styled(format!("{score} ({})", band.label()), Style::default().fg(c))
        }
        None => Span::styled("-", Style::default().fg(theme::MUTED)),
    };
    let lines = vec![
        Line::from(vec![
            Span::raw("Model: "),
            Span::styled(model, Style::default().fg(model_color).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(format!("Detection: {}", ai.detection_mode)),
        Line::from(vec![Span::raw("Latest risk: "), risk]),
        Line::from(format!("AI weight: {}%", ai.accuracy_pct)),
        Line::from(format!("History: {} samples", ai.history_size)),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}
