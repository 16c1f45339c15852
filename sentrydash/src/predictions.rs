//! Forecast panels fed by the composite predictions poll.
//!
//! Each of the four sub-panels succeeds or fails on its own. A failed panel
//! shows a placeholder but keeps its last good data for when it recovers.

use crate::error::{PartialDataError, TransportError};
use crate::types::{
    HeatmapReply, Insights, InsightsReply, Partial, ProbabilityReply, RiskLevel, RiskPeriod,
    TimelineReply,
};

pub const DEFAULT_HORIZON_HOURS: u32 = 24;
pub const HORIZON_CHOICES: [u32; 3] = [6, 12, 24];
/// Medium-risk periods listed after all high-risk ones.
const MEDIUM_PERIODS_SHOWN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    Empty,
    Fresh,
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel<T> {
    pub last_good: Option<T>,
    pub state: PanelState,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            last_good: None,
            state: PanelState::Empty,
        }
    }
}

impl<T> Panel<T> {
    fn update(&mut self, value: T) {
        self.last_good = Some(value);
        self.state = PanelState::Fresh;
    }

    fn fail(&mut self, reason: String) {
        self.state = PanelState::Unavailable(reason);
    }

    /// Data to draw, or `None` while the panel should show its placeholder.
    pub fn visible(&self) -> Option<&T> {
        match self.state {
            PanelState::Fresh => self.last_good.as_ref(),
            _ => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            PanelState::Unavailable(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilitySeries {
    /// `H:00` per forecast hour.
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatCell {
    pub hour: u32,
    pub level: RiskLevel,
    /// `None` renders as "no data".
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineTier {
    High,
    Medium,
    Normal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub tier: TimelineTier,
    /// `H:00`, or `all day` for the normal fallback row.
    pub when: String,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Steady,
}

impl Trend {
    pub fn parse(s: &str) -> Self {
        match s {
            "increasing" | "up" => Trend::Rising,
            "decreasing" | "down" => Trend::Falling,
            _ => Trend::Steady,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Steady => "steady",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsView {
    pub short_term_risk: Option<f64>,
    pub short_term_band: Option<&'static str>,
    pub trend: Option<Trend>,
    pub confidence_pct: Option<f64>,
    pub recommendation: Option<String>,
}

pub fn probability_series(reply: &ProbabilityReply) -> ProbabilitySeries {
    ProbabilitySeries {
        labels: reply
            .predictions
            .iter()
            .map(|p| format!("{}:00", p.hour))
            .collect(),
        values: reply
            .predictions
            .iter()
            .map(|p| p.anomaly_probability)
            .collect(),
        confidence: reply.confidence,
    }
}

/// Always 24 cells; hours the backend did not cover render as low / no data.
pub fn heatmap_cells(reply: &HeatmapReply) -> Vec<HeatCell> {
    (0..24)
        .map(|hour| match reply.heatmap_data.iter().find(|c| c.hour == hour) {
            Some(c) => HeatCell {
                hour,
                level: c.risk_level,
                probability: Some(c.probability),
            },
            None => HeatCell {
                hour,
                level: RiskLevel::Low,
                probability: None,
            },
        })
        .collect()
}

pub fn timeline_rows(reply: &TimelineReply) -> Vec<TimelineRow> {
    let row = |tier, p: &RiskPeriod| TimelineRow {
        tier,
        when: format!("{}:00", p.hour),
        probability: Some(p.probability),
    };
    let mut rows: Vec<TimelineRow> = reply
        .high_risk_periods
        .iter()
        .map(|p| row(TimelineTier::High, p))
        .collect();
    rows.extend(
        reply
            .medium_risk_periods
            .iter()
            .take(MEDIUM_PERIODS_SHOWN)
            .map(|p| row(TimelineTier::Medium, p)),
    );
    if rows.is_empty() {
        rows.push(TimelineRow {
            tier: TimelineTier::Normal,
            when: "all day".into(),
            probability: None,
        });
    }
    rows
}

pub fn insights_view(insights: &Insights) -> InsightsView {
    let short = insights.short_term_risk.map(|r| r.value());
    InsightsView {
        short_term_risk: short,
        short_term_band: short.map(|v| {
            if v > 70.0 {
                "high risk"
            } else if v > 40.0 {
                "medium risk"
            } else {
                "low risk"
            }
        }),
        trend: insights.trend().map(Trend::parse),
        confidence_pct: insights.confidence.map(|c| c * 100.0),
        recommendation: insights.first_recommendation().map(str::to_string),
    }
}

/// Raw results of one composite poll, one slot per sub-fetch.
#[derive(Debug)]
pub struct PredictionBatch {
    pub probability: Result<ProbabilityReply, TransportError>,
    pub heatmap: Result<HeatmapReply, TransportError>,
    pub timeline: Result<TimelineReply, TransportError>,
    pub insights: Result<InsightsReply, TransportError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionsView {
    pub horizon_hours: u32,
    pub probability: Panel<ProbabilitySeries>,
    pub heatmap: Panel<Vec<HeatCell>>,
    pub timeline: Panel<Vec<TimelineRow>>,
    pub insights: Panel<InsightsView>,
    /// Epoch seconds of the last poll where all four panels came back.
    pub last_full_update: Option<f64>,
}

impl Default for PredictionsView {
    fn default() -> Self {
        Self {
            horizon_hours: DEFAULT_HORIZON_HOURS,
            probability: Panel::default(),
            heatmap: Panel::default(),
            timeline: Panel::default(),
            insights: Panel::default(),
            last_full_update: None,
        }
    }
}

fn settle<R: Partial, T>(
    panel: &mut Panel<T>,
    name: &'static str,
    result: Result<R, TransportError>,
    derive: impl FnOnce(R) -> T,
    failed: &mut Vec<&'static str>,
) {
    match result {
        Ok(reply) => match reply.error() {
            Some(e) => {
                panel.fail(e.to_string());
                failed.push(name);
            }
            None => panel.update(derive(reply)),
        },
        Err(e) => {
            panel.fail(e.to_string());
            failed.push(name);
        }
    }
}

impl PredictionsView {
    /// Apply one composite poll. `Ok` only when all four sub-fetches parsed
    /// without an `error` body.
    pub fn apply(&mut self, batch: PredictionBatch, now_epoch: f64) -> Result<(), PartialDataError> {
        let mut failed = Vec::new();
        settle(
            &mut self.probability,
            "probability",
            batch.probability,
            |r| probability_series(&r),
            &mut failed,
        );
        settle(
            &mut self.heatmap,
            "heatmap",
            batch.heatmap,
            |r| heatmap_cells(&r),
            &mut failed,
        );
        settle(
            &mut self.timeline,
            "timeline",
            batch.timeline,
            |r| timeline_rows(&r),
            &mut failed,
        );
        settle(
            &mut self.insights,
            "insights",
            batch.insights,
            |r| insights_view(&r.into_insights()),
            &mut failed,
        );
        if failed.is_empty() {
            self.last_full_update = Some(now_epoch);
            Ok(())
        } else {
            Err(PartialDataError { panels: failed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HeatmapCell, HourlyPrediction};

    fn ok_batch() -> PredictionBatch {
        PredictionBatch {
            probability: Ok(ProbabilityReply {
                predictions: vec![HourlyPrediction {
                    timestamp: 0.0,
                    hour: 13,
                    anomaly_probability: 41.5,
                    risk_level: RiskLevel::Medium,
                }],
                confidence: Some(0.9),
                ..Default::default()
            }),
            heatmap: Ok(HeatmapReply {
                heatmap_data: vec![HeatmapCell {
                    hour: 3,
                    probability: 88.0,
                    risk_level: RiskLevel::High,
                }],
                error: None,
            }),
            timeline: Ok(TimelineReply::default()),
            insights: Ok(InsightsReply::default()),
        }
    }

    #[test]
    fn full_success_updates_every_panel() {
        let mut v = PredictionsView::default();
        assert!(v.apply(ok_batch(), 50.0).is_ok());
        assert_eq!(v.last_full_update, Some(50.0));
        let p = v.probability.visible().unwrap();
        assert_eq!(p.labels, vec!["13:00".to_string()]);
        let cells = v.heatmap.visible().unwrap();
        assert_eq!(cells.len(), 24);
        assert_eq!(cells[3].probability, Some(88.0));
        assert_eq!(cells[4].probability, None);
        assert_eq!(cells[4].level, RiskLevel::Low);
    }

    #[test]
    fn heatmap_failure_isolated_to_heatmap_panel() {
        let mut v = PredictionsView::default();
        v.apply(ok_batch(), 50.0).unwrap();

        let mut batch = ok_batch();
        batch.heatmap = Ok(HeatmapReply {
            heatmap_data: vec![],
            error: Some("Insufficient historical data".into()),
        });
        if let Ok(p) = batch.probability.as_mut() {
            p.predictions[0].anomaly_probability = 60.0;
        }
        let err = v.apply(batch, 55.0).unwrap_err();
        assert_eq!(err.panels, vec!["heatmap"]);

        assert!(v.heatmap.visible().is_none());
        assert_eq!(
            v.heatmap.unavailable_reason(),
            Some("Insufficient historical data")
        );
        // last good heatmap retained for recovery
        assert!(v.heatmap.last_good.is_some());
        assert_eq!(v.probability.visible().unwrap().values, vec![60.0]);
        assert!(v.timeline.visible().is_some());
        assert!(v.insights.visible().is_some());
        assert_eq!(v.last_full_update, Some(50.0));
    }

    #[test]
    fn transport_failure_marks_only_that_panel() {
        let mut v = PredictionsView::default();
        let mut batch = ok_batch();
        batch.insights = Err(TransportError::Status { code: 502 });
        let err = v.apply(batch, 1.0).unwrap_err();
        assert_eq!(err.panels, vec!["insights"]);
        assert!(v.insights.unavailable_reason().unwrap().contains("502"));
        assert!(v.probability.visible().is_some());
    }

    #[test]
    fn timeline_lists_high_then_three_medium() {
        let p = |hour| RiskPeriod {
            hour,
            probability: 50.0,
        };
        let reply = TimelineReply {
            high_risk_periods: vec![p(1), p(2)],
            medium_risk_periods: vec![p(3), p(4), p(5), p(6)],
            error: None,
        };
        let rows = timeline_rows(&reply);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].tier, TimelineTier::High);
        assert_eq!(rows[4].when, "5:00");

        let normal = timeline_rows(&TimelineReply::default());
        assert_eq!(normal.len(), 1);
        assert_eq!(normal[0].tier, TimelineTier::Normal);
        assert_eq!(normal[0].when, "all day");
    }

    #[test]
    fn insights_bands_and_trend() {
        let i: InsightsReply = serde_json::from_str(
            r#"{"short_term_risk": 72.0, "trend_direction": "decreasing", "confidence": 0.85}"#,
        )
        .unwrap();
        let v = insights_view(&i.into_insights());
        assert_eq!(v.short_term_band, Some("high risk"));
        assert_eq!(v.trend, Some(Trend::Falling));
        assert!((v.confidence_pct.unwrap() - 85.0).abs() < 1e-9);
        assert_eq!(Trend::parse("sideways"), Trend::Steady);
    }
}
