//! Defense panel: authoritative state plus which controls are live.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::defense::DefenseView;
use crate::types::DefenseMode;
use crate::ui::theme;

fn key(label: &str, enabled: bool) -> Span<'static> {
    let style = if enabled {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme::MUTED)
    };
    Span::styled(format!("[{label}] "), style)
}

pub fn draw_defense(f: &mut ratatui::Frame<'_>, area: Rect, d: Option<&DefenseView>) {
    let block = Block::default().borders(Borders::ALL).title("Defense");
    let Some(d) = d.filter(|d| !d.pending) else {
        f.render_widget(
            Paragraph::new(Span::styled("waiting for status...", Style::default().fg(theme::MUTED)))
                .block(block),
            area,
        );
        return;
    };

    let (state, color) = if d.active {
        ("ACTIVE", theme::CRITICAL)
    } else {
        ("standby", theme::LOW)
    };
    let a = d.affordances;
    let lines = vec![
        Line::from(vec![
            Span::raw("State: "),
            Span::styled(state, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw(format!("   Mode: {}", d.mode.as_str())),
        ]),
        Line::from(format!("Active rules: {}", d.active_rules)),
        Line::from(format!("Last trigger: {}", d.last_trigger)),
        Line::from(format!("Effectiveness: {}", d.effectiveness)),
        Line::from(vec![
            key("a auto", a.selected_mode != DefenseMode::Auto),
            key("m manual", a.selected_mode != DefenseMode::Manual),
            key("t trigger", a.manual_trigger_enabled),
            key("k disable", a.disable_enabled),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}
