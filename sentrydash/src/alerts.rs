//! Alert feed: turns the server's latest alert snapshot into the render list.
//!
//! The server is the source of truth. Each snapshot replaces the previous view
//! outright; nothing is merged or accumulated client side.

use std::time::Duration;

use crate::types::Alert;

/// Most recent alerts shown.
pub const ALERT_WINDOW: usize = 5;
/// New alerts pulse for this long after their server timestamp.
pub const HIGHLIGHT_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Severity::Critical
        } else if score >= 60.0 {
            Severity::High
        } else if score >= 40.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Visual tier; `normal` alerts always render at the lowest one.
    pub fn for_alert(alert: &Alert) -> Self {
        if alert.kind == "normal" {
            Severity::Low
        } else {
            Self::from_score(alert.risk_score)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high risk",
            Severity::Medium => "medium risk",
            Severity::Low => "low risk",
        }
    }
}

pub fn type_label(kind: &str) -> &str {
    match kind {
        "normal" => "System normal",
        "ddos_attack" => "DDoS attack",
        "resource_exhaustion" => "Resource exhaustion",
        "packet_loss" => "Packet loss",
        "suspicious_behavior" => "Suspicious behavior",
        "low_risk_anomaly" => "Low-risk anomaly",
        "medium_risk_anomaly" => "Medium-risk anomaly",
        "high_risk_anomaly" => "High-risk anomaly",
        "critical_anomaly" => "Critical anomaly",
        other => other,
    }
}

pub fn time_ago(age_secs: u64) -> String {
    match age_secs {
        s if s < 60 => format!("{s}s ago"),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertItem {
    pub alert: Alert,
    pub severity: Severity,
    pub type_label: String,
    pub age_secs: u64,
    pub time_ago: String,
    /// Remaining highlight time, fixed when the item is built and never
    /// re-evaluated; the sink arms a one-shot timer with it.
    pub highlight_for: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertFeedView {
    /// The server returned an empty list.
    Nominal,
    Alerts {
        /// Oldest first, newest last, as the server ordered them.
        items: Vec<AlertItem>,
        /// Alerts older than the shown window.
        overflow: usize,
    },
    /// The last fetch failed; distinct from `Nominal`.
    Unavailable { reason: String },
}

impl AlertFeedView {
    pub fn overflow(&self) -> usize {
        match self {
            AlertFeedView::Alerts { overflow, .. } => *overflow,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertFeedProcessor {
    window: usize,
    highlight: Duration,
}

impl Default for AlertFeedProcessor {
    fn default() -> Self {
        Self::new(ALERT_WINDOW, HIGHLIGHT_WINDOW)
    }
}

impl AlertFeedProcessor {
    pub fn new(window: usize, highlight: Duration) -> Self {
        Self {
            window: window.max(1),
            highlight,
        }
    }

    pub fn process(&self, raw: &[Alert], now_epoch: f64) -> AlertFeedView {
        if raw.is_empty() {
            return AlertFeedView::Nominal;
        }
        let start = raw.len().saturating_sub(self.window);
        let items = raw[start..]
            .iter()
            .map(|a| self.item(a, now_epoch))
            .collect();
        AlertFeedView::Alerts {
            items,
            overflow: start,
        }
    }

    fn item(&self, alert: &Alert, now_epoch: f64) -> AlertItem {
        // clock skew can put server timestamps slightly in the future
        let age = (now_epoch - alert.timestamp).max(0.0);
        let highlight_for = if age < self.highlight.as_secs_f64() {
            Some(self.highlight - Duration::from_secs_f64(age))
        } else {
            None
        };
        let age_secs = age.floor() as u64;
        AlertItem {
            severity: Severity::for_alert(alert),
            type_label: type_label(&alert.kind).to_string(),
            age_secs,
            time_ago: time_ago(age_secs),
            highlight_for,
            alert: alert.clone(),
        }
    }
}
