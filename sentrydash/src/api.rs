//! HTTP client for the monitor backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::error::TransportError;
use crate::types::{
    AiHistory, AiStatus, AlertsReply, AnomalyKind, CommandReply, DefenseMode, DefenseState,
    HeatmapReply, InsightsReply, MetricsReply, ProbabilityReply, TimelineReply,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub type ApiResult<T> = Result<T, TransportError>;

/// Everything the dashboard asks of the backend, one method per endpoint.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn metrics(&self) -> ApiResult<MetricsReply>;
    async fn alerts(&self) -> ApiResult<AlertsReply>;
    async fn defense_status(&self) -> ApiResult<DefenseState>;
    async fn ai_status(&self) -> ApiResult<AiStatus>;
    async fn ai_history(&self, window_size: usize) -> ApiResult<AiHistory>;
    async fn attack_probability(&self, hours: u32) -> ApiResult<ProbabilityReply>;
    async fn heatmap(&self, hours: u32) -> ApiResult<HeatmapReply>;
    async fn timeline(&self, hours: u32) -> ApiResult<TimelineReply>;
    async fn insights(&self) -> ApiResult<InsightsReply>;

    async fn start_simulation(&self) -> ApiResult<CommandReply>;
    async fn stop_simulation(&self) -> ApiResult<CommandReply>;
    async fn trigger_anomaly(&self, kind: AnomalyKind) -> ApiResult<CommandReply>;
    async fn set_defense_mode(&self, mode: DefenseMode) -> ApiResult<CommandReply>;
    async fn manual_defense(&self, risk_score: f64) -> ApiResult<CommandReply>;
    async fn disable_defense(&self) -> ApiResult<CommandReply>;
}

pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// `base` is the backend root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base: &str, tls_ca: Option<&str>) -> Result<Self, TransportError> {
        let mut base = Url::parse(base)?;
        // keep any path prefix when joining endpoint paths
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(path) = tls_ca {
            let pem = std::fs::read(path)
                .map_err(|e| TransportError::Other(format!("read CA {path}: {e}")))?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }
        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let resp = self.client.get(self.endpoint(path)?).query(query).send().await?;
        decode(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResult<T> {
        let req = self.client.post(self.endpoint(path)?);
        // the backend expects a JSON content type even on empty commands
        let req = req.json(&body.unwrap_or_else(|| json!({})));
        decode(req.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            code: status.as_u16(),
        });
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn metrics(&self) -> ApiResult<MetricsReply> {
        self.get("api/metrics", &[]).await
    }

    async fn alerts(&self) -> ApiResult<AlertsReply> {
        self.get("api/alerts", &[]).await
    }

    async fn defense_status(&self) -> ApiResult<DefenseState> {
        self.get("api/defense/status", &[]).await
    }

    async fn ai_status(&self) -> ApiResult<AiStatus> {
        self.get("api/ai/status", &[]).await
    }

    async fn ai_history(&self, window_size: usize) -> ApiResult<AiHistory> {
        self.get("api/ai/history", &[("window_size", window_size.to_string())])
            .await
    }

    async fn attack_probability(&self, hours: u32) -> ApiResult<ProbabilityReply> {
        self.get(
            "api/prediction/attack-probability",
            &[("hours", hours.to_string())],
        )
        .await
    }

    async fn heatmap(&self, hours: u32) -> ApiResult<HeatmapReply> {
        self.get("api/prediction/heatmap", &[("hours", hours.to_string())])
            .await
    }

    async fn timeline(&self, hours: u32) -> ApiResult<TimelineReply> {
        self.get("api/prediction/timeline", &[("hours", hours.to_string())])
            .await
    }

    async fn insights(&self) -> ApiResult<InsightsReply> {
        self.get("api/prediction/insights", &[]).await
    }

    async fn start_simulation(&self) -> ApiResult<CommandReply> {
        self.post("api/simulation/start", None).await
    }

    async fn stop_simulation(&self) -> ApiResult<CommandReply> {
        self.post("api/simulation/stop", None).await
    }

    async fn trigger_anomaly(&self, kind: AnomalyKind) -> ApiResult<CommandReply> {
        self.post("api/simulation/anomaly", Some(json!({ "type": kind.as_str() })))
            .await
    }

    async fn set_defense_mode(&self, mode: DefenseMode) -> ApiResult<CommandReply> {
        self.post("api/defense/mode", Some(json!({ "mode": mode.as_str() })))
            .await
    }

    async fn manual_defense(&self, risk_score: f64) -> ApiResult<CommandReply> {
        self.post("api/defense/manual", Some(json!({ "risk_score": risk_score })))
            .await
    }

    async fn disable_defense(&self) -> ApiResult<CommandReply> {
        self.post("api/defense/disable", None).await
    }
}
