//! Small UI helpers: human-readable rates and severity colours.

use ratatui::style::Color;

use crate::alerts::Severity;
use crate::ui::theme;

/// Byte counts as the web dashboard printed them: at most two decimals,
/// trailing zeros dropped (`1.5 KB`, `2 MB`).
pub fn human(b: f64) -> String {
    const K: f64 = 1024.0;
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if !b.is_finite() || b <= 0.0 {
        return "0 B".into();
    }
    let mut v = b;
    let mut i = 0;
    while v >= K && i < UNITS.len() - 1 {
        v /= K;
        i += 1;
    }
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    format!("{s} {}", UNITS[i])
}

pub fn severity_color(s: Severity) -> Color {
    match s {
        Severity::Critical => theme::CRITICAL,
        Severity::High => theme::HIGH,
        Severity::Medium => theme::MEDIUM,
        Severity::Low => theme::LOW,
    }
}

/// Gauge colour for a 0..100 risk score.
pub fn risk_color(score: f64) -> Color {
    severity_color(Severity::from_score(score))
}
