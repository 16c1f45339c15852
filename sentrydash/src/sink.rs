//! Presentation sink: where prepared view models go.

use tracing::{info, warn};

use crate::ai::AiView;
use crate::alerts::AlertFeedView;
use crate::defense::DefenseView;
use crate::history::ChartView;
use crate::poll::TaskHealth;
use crate::predictions::PredictionsView;
use crate::types::{NetworkMetrics, SystemStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulationState {
    pub running: bool,
    /// Epoch seconds of the accepted start command.
    pub started_at: Option<i64>,
}

impl SimulationState {
    pub fn start_enabled(&self) -> bool {
        !self.running
    }

    pub fn stop_enabled(&self) -> bool {
        self.running
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusView {
    pub status: SystemStatus,
    pub risk_score: Option<f64>,
    pub metrics: Option<NetworkMetrics>,
    pub simulation: SimulationState,
}

impl StatusView {
    /// One decimal, as the gauge shows it.
    pub fn risk_label(&self) -> String {
        match self.risk_score {
            Some(r) => format!("{r:.1}"),
            None => "-".into(),
        }
    }
}

/// A risk score at gauge precision, so what is sent matches what was shown.
pub fn displayed_risk(r: f64) -> f64 {
    format!("{r:.1}").parse().unwrap_or(r)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    pub at_epoch: f64,
}

/// Receives view models as soon as the slice they describe changes.
pub trait PresentationSink {
    fn render_series(&mut self, chart: &ChartView);
    fn render_status(&mut self, status: &StatusView);
    fn render_alerts(&mut self, alerts: &AlertFeedView);
    fn render_defense(&mut self, defense: &DefenseView);
    fn render_ai(&mut self, ai: &AiView);
    fn render_predictions(&mut self, predictions: &PredictionsView);
    fn render_health(&mut self, health: &TaskHealth);
    fn notify(&mut self, notice: &Notification);
}

/// Headless sink: every update becomes a log line.
#[derive(Debug, Default)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn render_series(&mut self, chart: &ChartView) {
        tracing::debug!(points = chart.labels.len(), "chart updated");
    }

    fn render_status(&mut self, s: &StatusView) {
        let pps = s.metrics.as_ref().map(|m| m.packets_per_sec).unwrap_or(0.0);
        info!(
            status = s.status.label(),
            risk = %s.risk_label(),
            packets_per_sec = pps,
            simulation = s.simulation.running,
            "system status"
        );
    }

    fn render_alerts(&mut self, alerts: &AlertFeedView) {
        match alerts {
            AlertFeedView::Nominal => info!("alerts: none, system nominal"),
            AlertFeedView::Alerts { items, overflow } => {
                for item in items {
                    info!(
                        kind = %item.type_label,
                        severity = item.severity.label(),
                        risk = item.alert.risk_score,
                        age = %item.time_ago,
                        new = item.highlight_for.is_some(),
                        "alert: {}",
                        item.alert.message
                    );
                }
                if *overflow > 0 {
                    info!(older = overflow, "alerts: more not shown");
                }
            }
            AlertFeedView::Unavailable { reason } => warn!(%reason, "alerts unavailable"),
        }
    }

    fn render_defense(&mut self, d: &DefenseView) {
        info!(
            mode = d.mode.as_str(),
            active = d.active,
            rules = d.active_rules,
            last_trigger = %d.last_trigger,
            effectiveness = %d.effectiveness,
            "defense"
        );
    }

    fn render_ai(&mut self, ai: &AiView) {
        info!(
            running = ai.model_running,
            mode = ai.detection_mode,
            risk = ?ai.latest_risk.map(|(s, _)| s),
            accuracy = ai.accuracy_pct,
            "ai status"
        );
    }

    fn render_predictions(&mut self, p: &PredictionsView) {
        let panel = |ok: bool| if ok { "ok" } else { "unavailable" };
        info!(
            hours = p.horizon_hours,
            probability = panel(p.probability.visible().is_some()),
            heatmap = panel(p.heatmap.visible().is_some()),
            timeline = panel(p.timeline.visible().is_some()),
            insights = panel(p.insights.visible().is_some()),
            "predictions"
        );
    }

    fn render_health(&mut self, h: &TaskHealth) {
        if h.degraded {
            warn!(
                task = h.kind.name(),
                failures = h.failures,
                error = h.last_error.as_deref().unwrap_or(""),
                "source degraded"
            );
        }
    }

    fn notify(&mut self, n: &Notification) {
        match n.level {
            NoticeLevel::Error => warn!("{}", n.message),
            _ => info!("{}", n.message),
        }
    }
}

/// Keeps the latest view model of every kind; used by headless embedders and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub chart: Option<ChartView>,
    pub status: Option<StatusView>,
    pub alerts: Option<AlertFeedView>,
    pub defense: Option<DefenseView>,
    pub ai: Option<AiView>,
    pub predictions: Option<PredictionsView>,
    pub health: Vec<TaskHealth>,
    pub notices: Vec<Notification>,
    pub chart_renders: usize,
}

impl PresentationSink for RecordingSink {
    fn render_series(&mut self, chart: &ChartView) {
        self.chart_renders += 1;
        self.chart = Some(chart.clone());
    }

    fn render_status(&mut self, status: &StatusView) {
        self.status = Some(status.clone());
    }

    fn render_alerts(&mut self, alerts: &AlertFeedView) {
        self.alerts = Some(alerts.clone());
    }

    fn render_defense(&mut self, defense: &DefenseView) {
        self.defense = Some(defense.clone());
    }

    fn render_ai(&mut self, ai: &AiView) {
        self.ai = Some(ai.clone());
    }

    fn render_predictions(&mut self, predictions: &PredictionsView) {
        self.predictions = Some(predictions.clone());
    }

    fn render_health(&mut self, health: &TaskHealth) {
        match self.health.iter_mut().find(|h| h.kind == health.kind) {
            Some(h) => *h = health.clone(),
            None => self.health.push(health.clone()),
        }
    }

    fn notify(&mut self, notice: &Notification) {
        self.notices.push(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displayed_risk_matches_gauge_label() {
        let view = StatusView {
            risk_score: Some(85.234),
            ..Default::default()
        };
        assert_eq!(view.risk_label(), "85.2");
        assert_eq!(displayed_risk(85.234), 85.2);
        assert_eq!(displayed_risk(64.0), 64.0);
    }
}
