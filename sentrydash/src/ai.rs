//! AI detector status panel.

use crate::types::{AiHistory, AiStatus};

/// Window requested from `/api/ai/history`.
pub const AI_HISTORY_WINDOW: usize = 10;
const DEFAULT_AI_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiRiskBand {
    High,
    Medium,
    Normal,
}

impl AiRiskBand {
    pub fn from_score(score: i64) -> Self {
        if score > 70 {
            AiRiskBand::High
        } else if score > 50 {
            AiRiskBand::Medium
        } else {
            AiRiskBand::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AiRiskBand::High => "high risk",
            AiRiskBand::Medium => "medium risk",
            AiRiskBand::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AiView {
    /// `true` when the model is loaded, `false` when only rules run.
    pub model_running: bool,
    pub detection_mode: &'static str,
    pub latest_risk: Option<(i64, AiRiskBand)>,
    pub accuracy_pct: u32,
    pub history_size: u64,
}

pub fn detection_mode_label(mode: Option<&str>) -> &'static str {
    match mode {
        Some("hybrid") => "hybrid",
        Some("ai_only") => "AI only",
        Some("rule_only") => "rules only",
        _ => "unknown",
    }
}

pub fn ai_view(status: &AiStatus, history: &AiHistory) -> AiView {
    let latest_risk = history.history.last().map(|r| {
        let score = r.risk_score.round() as i64;
        (score, AiRiskBand::from_score(score))
    });
    AiView {
        model_running: status.ai_model_loaded,
        detection_mode: detection_mode_label(status.detection_mode.as_deref()),
        latest_risk,
        accuracy_pct: (status.ai_weight.unwrap_or(DEFAULT_AI_WEIGHT) * 100.0).round() as u32,
        history_size: status.history_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AiHistoryRecord;

    #[test]
    fn view_uses_latest_history_record() {
        let status = AiStatus {
            ai_model_loaded: true,
            detection_mode: Some("hybrid".into()),
            ai_weight: Some(0.62),
            history_size: 40,
            error: None,
        };
        let history = AiHistory {
            history: vec![
                AiHistoryRecord { risk_score: 20.0 },
                AiHistoryRecord { risk_score: 70.6 },
            ],
            error: None,
        };
        let v = ai_view(&status, &history);
        assert!(v.model_running);
        assert_eq!(v.detection_mode, "hybrid");
        assert_eq!(v.latest_risk, Some((71, AiRiskBand::High)));
        assert_eq!(v.accuracy_pct, 62);
        assert_eq!(v.history_size, 40);
    }

    #[test]
    fn defaults_when_fields_missing() {
        let v = ai_view(&AiStatus::default(), &AiHistory::default());
        assert!(!v.model_running);
        assert_eq!(v.detection_mode, "unknown");
        assert_eq!(v.latest_risk, None);
        assert_eq!(v.accuracy_pct, 70);
    }

    #[test]
    fn band_edges() {
        assert_eq!(AiRiskBand::from_score(70), AiRiskBand::Medium);
        assert_eq!(AiRiskBand::from_score(51), AiRiskBand::Medium);
        assert_eq!(AiRiskBand::from_score(50), AiRiskBand::Normal);
    }
}
