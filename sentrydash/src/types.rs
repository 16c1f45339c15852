//! Types that mirror the backend's JSON schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    #[default]
    Normal,
    Warning,
    Critical,
    // anything the backend invents later renders as normal
    #[serde(other)]
    Unknown,
}

impl SystemStatus {
    pub fn label(self) -> &'static str {
        match self {
            SystemStatus::Critical => "critical",
            SystemStatus::Warning => "warning",
            SystemStatus::Normal | SystemStatus::Unknown => "normal",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct NetworkMetrics {
    pub packets_per_sec: f64,
    pub active_connections: f64,
    pub bytes_per_sec: f64,
    pub dropped_packets: f64,
    pub encryption_hits: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub error_count: f64,
}

/// `GET /api/metrics`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MetricsReply {
    pub risk_score: f64,
    pub status: SystemStatus,
    // null before the simulator produced its first sample
    pub metrics: Option<NetworkMetrics>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Alert {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub message: String,
}

/// `GET /api/alerts`
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AlertsReply {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefenseMode {
    #[default]
    Auto,
    Manual,
}

impl DefenseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DefenseMode::Auto => "auto",
            DefenseMode::Manual => "manual",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DefenseStats {
    pub total_triggers: u64,
    pub successful_defenses: u64,
}

/// `GET /api/defense/status`. The backend answers `{active:false, rules:[], mode:"auto"}`
/// when its controller is down, so everything else defaults.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DefenseState {
    pub active: bool,
    pub mode: DefenseMode,
    pub active_rules_count: u64,
    pub last_trigger_time: Option<f64>,
    pub stats: DefenseStats,
}

/// Shared reply body of every POST command.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CommandReply {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Ddos,
    ResourceExhaustion,
}

impl AnomalyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::Ddos => "ddos",
            AnomalyKind::ResourceExhaustion => "resource_exhaustion",
        }
    }
}

/// `GET /api/ai/status`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AiStatus {
    pub ai_model_loaded: bool,
    pub detection_mode: Option<String>,
    pub ai_weight: Option<f64>,
    pub history_size: u64,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AiHistoryRecord {
    pub risk_score: f64,
}

/// `GET /api/ai/history?window_size=N`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AiHistory {
    pub history: Vec<AiHistoryRecord>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    #[default]
    #[serde(other)]
    Low,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HourlyPrediction {
    pub timestamp: f64,
    pub hour: u32,
    pub anomaly_probability: f64,
    pub risk_level: RiskLevel,
}

/// `GET /api/prediction/attack-probability?hours=H`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ProbabilityReply {
    pub predictions: Vec<HourlyPrediction>,
    pub confidence: Option<f64>,
    pub data_points_used: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HeatmapCell {
    pub hour: u32,
    pub probability: f64,
    pub risk_level: RiskLevel,
}

/// `GET /api/prediction/heatmap?hours=H`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HeatmapReply {
    pub heatmap_data: Vec<HeatmapCell>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RiskPeriod {
    pub hour: u32,
    pub probability: f64,
}

/// `GET /api/prediction/timeline?hours=H`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TimelineReply {
    pub high_risk_periods: Vec<RiskPeriod>,
    pub medium_risk_periods: Vec<RiskPeriod>,
    pub error: Option<String>,
}

/// Short-term risk arrives either as a bare percentage or as the analyzer's
/// detail object.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum ShortTermRisk {
    Score(f64),
    Detail { max_short_term_probability: f64 },
}

impl ShortTermRisk {
    pub fn value(self) -> f64 {
        match self {
            ShortTermRisk::Score(v) => v,
            ShortTermRisk::Detail {
                max_short_term_probability,
            } => max_short_term_probability,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LongTermTrend {
    pub trend_direction: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Insights {
    pub short_term_risk: Option<ShortTermRisk>,
    pub trend_direction: Option<String>,
    pub long_term_trend: Option<LongTermTrend>,
    #[serde(alias = "confidence_level")]
    pub confidence: Option<f64>,
    pub recommendation: Option<String>,
    pub recommendations: Vec<String>,
}

impl Insights {
    pub fn trend(&self) -> Option<&str> {
        self.trend_direction.as_deref().or_else(|| {
            self.long_term_trend
                .as_ref()
                .and_then(|t| t.trend_direction.as_deref())
        })
    }

    pub fn first_recommendation(&self) -> Option<&str> {
        self.recommendation
            .as_deref()
            .or_else(|| self.recommendations.first().map(String::as_str))
    }
}

/// `GET /api/prediction/insights`. Older backends wrap the fields in `insights`,
/// newer ones put them at the top level; both are accepted.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InsightsReply {
    pub insights: Option<Insights>,
    #[serde(flatten)]
    pub inline: Insights,
    pub error: Option<String>,
}

impl InsightsReply {
    pub fn into_insights(self) -> Insights {
        self.insights.unwrap_or(self.inline)
    }
}

/// Every forecast body may carry an `error` field instead of data.
pub trait Partial {
    fn error(&self) -> Option<&str>;
}

macro_rules! impl_partial {
    ($($t:ty),*) => {
        $(impl Partial for $t {
            fn error(&self) -> Option<&str> {
                self.error.as_deref()
            }
        })*
    };
}

impl_partial!(ProbabilityReply, HeatmapReply, TimelineReply, InsightsReply, AiStatus, AiHistory);
