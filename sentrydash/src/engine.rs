//! Session context and controller.
//!
//! `Dashboard` is the state of one dashboard session. It applies one finished
//! fetch or command at a time and renders only the slice that outcome owns,
//! so sources never overwrite each other. `Controller` drives the schedule:
//! it spawns fetches when tasks fall due and feeds their results back into the
//! dashboard on the caller's task, which is the only place state is mutated.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ai::{ai_view, AiView, AI_HISTORY_WINDOW};
use crate::alerts::{AlertFeedProcessor, AlertFeedView, ALERT_WINDOW, HIGHLIGHT_WINDOW};
use crate::api::{ApiResult, Backend};
use crate::clock::Clock;
use crate::defense::{DefenseCommand, DefenseMachine};
use crate::error::{CommandError, PollError};
use crate::history::{ChartView, Sample, SeriesStore, DEFAULT_SERIES_CAPACITY, PACKETS_SERIES, RISK_SERIES};
use crate::poll::{Liveness, PollTask, Scheduler, TaskKind};
use crate::predictions::{PredictionBatch, PredictionsView, DEFAULT_HORIZON_HOURS, HORIZON_CHOICES};
use crate::sink::{
    displayed_risk, NoticeLevel, Notification, PresentationSink, SimulationState, StatusView,
};
use crate::types::{
    AiHistory, AiStatus, AlertsReply, AnomalyKind, CommandReply, DefenseMode, DefenseState,
    MetricsReply, Partial,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub metrics_interval: Duration,
    pub alerts_interval: Duration,
    pub defense_interval: Duration,
    pub ai_interval: Duration,
    pub predictions_interval: Duration,
    pub series_capacity: usize,
    pub alert_window: usize,
    pub highlight_window: Duration,
    pub ai_history_window: usize,
    pub prediction_hours: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metrics_interval: TaskKind::Metrics.default_interval(),
            alerts_interval: TaskKind::Alerts.default_interval(),
            defense_interval: TaskKind::DefenseStatus.default_interval(),
            ai_interval: TaskKind::AiStatus.default_interval(),
            predictions_interval: TaskKind::Predictions.default_interval(),
            series_capacity: DEFAULT_SERIES_CAPACITY,
            alert_window: ALERT_WINDOW,
            highlight_window: HIGHLIGHT_WINDOW,
            ai_history_window: AI_HISTORY_WINDOW,
            prediction_hours: DEFAULT_HORIZON_HOURS,
        }
    }
}

impl EngineConfig {
    pub fn interval(&self, kind: TaskKind) -> Duration {
        match kind {
            TaskKind::Metrics => self.metrics_interval,
            TaskKind::Alerts => self.alerts_interval,
            TaskKind::DefenseStatus => self.defense_interval,
            TaskKind::AiStatus => self.ai_interval,
            TaskKind::Predictions => self.predictions_interval,
        }
    }
}

/// User actions coming back from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    StartSimulation,
    StopSimulation,
    TriggerAnomaly(AnomalyKind),
    SetMode(DefenseMode),
    TriggerManualDefense,
    DisableDefense,
    SetPredictionHours(u32),
}

/// A request the controller sends on the user's behalf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    StartSimulation,
    StopSimulation,
    TriggerAnomaly(AnomalyKind),
    Defense(DefenseCommand),
}

impl Command {
    fn success_notice(self) -> (NoticeLevel, String) {
        match self {
            Command::StartSimulation => (NoticeLevel::Success, "Simulation started".into()),
            Command::StopSimulation => (NoticeLevel::Info, "Simulation stopped".into()),
            Command::TriggerAnomaly(kind) => (
                NoticeLevel::Warning,
                format!("Anomaly scenario {} triggered", kind.as_str()),
            ),
            Command::Defense(DefenseCommand::SetMode(mode)) => (
                NoticeLevel::Success,
                format!("Defense mode switched to {}", mode.as_str()),
            ),
            Command::Defense(DefenseCommand::ManualTrigger { .. }) => {
                (NoticeLevel::Success, "Manual defense triggered".into())
            }
            Command::Defense(DefenseCommand::Disable) => {
                (NoticeLevel::Success, "Defense system disabled".into())
            }
        }
    }

    fn failure_prefix(self) -> &'static str {
        match self {
            Command::StartSimulation => "Failed to start simulation",
            Command::StopSimulation => "Failed to stop simulation",
            Command::TriggerAnomaly(_) => "Failed to trigger anomaly",
            Command::Defense(DefenseCommand::SetMode(_)) => "Failed to set defense mode",
            Command::Defense(DefenseCommand::ManualTrigger { .. }) => {
                "Failed to trigger manual defense"
            }
            Command::Defense(DefenseCommand::Disable) => "Failed to disable defense",
        }
    }
}

/// What `Dashboard::prepare` decided for an intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prepared {
    Send(Command),
    /// Horizon changed; predictions must refresh now.
    RefreshPredictions,
}

/// A finished fetch or command, delivered back to the session.
#[derive(Debug)]
pub enum Outcome {
    Metrics(ApiResult<MetricsReply>),
    Alerts(ApiResult<AlertsReply>),
    Defense(ApiResult<DefenseState>),
    Ai(ApiResult<(AiStatus, AiHistory)>),
    Predictions { hours: u32, batch: PredictionBatch },
    Command {
        command: Command,
        result: ApiResult<CommandReply>,
    },
}

impl Outcome {
    pub fn task(&self) -> Option<TaskKind> {
        match self {
            Outcome::Metrics(_) => Some(TaskKind::Metrics),
            Outcome::Alerts(_) => Some(TaskKind::Alerts),
            Outcome::Defense(_) => Some(TaskKind::DefenseStatus),
            Outcome::Ai(_) => Some(TaskKind::AiStatus),
            Outcome::Predictions { .. } => Some(TaskKind::Predictions),
            Outcome::Command { .. } => None,
        }
    }
}

pub struct Dashboard {
    clock: Arc<dyn Clock>,
    series: SeriesStore,
    status: StatusView,
    alert_feed: AlertFeedProcessor,
    alerts: Option<AlertFeedView>,
    defense: DefenseMachine,
    ai: Option<AiView>,
    predictions: PredictionsView,
}

impl Dashboard {
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let predictions = PredictionsView {
            horizon_hours: config.prediction_hours,
            ..PredictionsView::default()
        };
        Self {
            clock,
            series: SeriesStore::new(config.series_capacity),
            status: StatusView::default(),
            alert_feed: AlertFeedProcessor::new(config.alert_window, config.highlight_window),
            alerts: None,
            defense: DefenseMachine::new(),
            ai: None,
            predictions,
        }
    }

    pub fn series(&self) -> &SeriesStore {
        &self.series
    }

    pub fn status(&self) -> &StatusView {
        &self.status
    }

    pub fn alerts(&self) -> Option<&AlertFeedView> {
        self.alerts.as_ref()
    }

    pub fn defense(&self) -> &DefenseMachine {
        &self.defense
    }

    pub fn ai(&self) -> Option<&AiView> {
        self.ai.as_ref()
    }

    pub fn predictions(&self) -> &PredictionsView {
        &self.predictions
    }

    pub fn prediction_hours(&self) -> u32 {
        self.predictions.horizon_hours
    }

    pub fn simulation(&self) -> SimulationState {
        self.status.simulation
    }

    /// Push every current view model, e.g. after a sink (re)attaches.
    pub fn render_all(&self, sink: &mut dyn PresentationSink) {
        sink.render_series(&ChartView::from_store(&self.series));
        sink.render_status(&self.status);
        if let Some(a) = &self.alerts {
            sink.render_alerts(a);
        }
        sink.render_defense(&self.defense.view());
        if let Some(ai) = &self.ai {
            sink.render_ai(ai);
        }
        sink.render_predictions(&self.predictions);
    }

    fn notify(&self, sink: &mut dyn PresentationSink, level: NoticeLevel, message: String) {
        sink.notify(&Notification {
            level,
            message,
            at_epoch: self.clock.epoch_secs(),
        });
    }

    /// Validate an intent against local state before anything is sent.
    pub fn prepare(&mut self, intent: Intent) -> Result<Prepared, CommandError> {
        let cmd = match intent {
            Intent::StartSimulation => Command::StartSimulation,
            Intent::StopSimulation => Command::StopSimulation,
            Intent::TriggerAnomaly(kind) => Command::TriggerAnomaly(kind),
            Intent::SetMode(mode) => Command::Defense(self.defense.request_mode(mode)),
            Intent::TriggerManualDefense => {
                // the value the gauge last showed, at its precision
                let last = self
                    .series
                    .latest(RISK_SERIES)
                    .map(|s| displayed_risk(s.value));
                Command::Defense(self.defense.request_manual_trigger(last)?)
            }
            Intent::DisableDefense => Command::Defense(self.defense.request_disable()),
            Intent::SetPredictionHours(h) => {
                if !HORIZON_CHOICES.contains(&h) {
                    return Err(CommandError::NotAllowed("forecast horizon must be 6, 12 or 24 hours"));
                }
                self.predictions.horizon_hours = h;
                return Ok(Prepared::RefreshPredictions);
            }
        };
        Ok(Prepared::Send(cmd))
    }

    pub fn reject(&self, sink: &mut dyn PresentationSink, err: &CommandError) {
        self.notify(sink, NoticeLevel::Error, err.to_string());
    }

    /// Apply one outcome. For poll outcomes, returns the task and how its
    /// cycle ended so the scheduler can record it.
    pub fn apply(
        &mut self,
        outcome: Outcome,
        sink: &mut dyn PresentationSink,
    ) -> Option<(TaskKind, Result<(), PollError>)> {
        let task = outcome.task();
        let result = match outcome {
            Outcome::Metrics(r) => self.apply_metrics(r, sink),
            Outcome::Alerts(r) => self.apply_alerts(r, sink),
            Outcome::Defense(r) => self.apply_defense(r, sink),
            Outcome::Ai(r) => self.apply_ai(r, sink),
            Outcome::Predictions { batch, .. } => self.apply_predictions(batch, sink),
            Outcome::Command { command, result } => {
                self.apply_command(command, result, sink);
                return None;
            }
        };
        task.map(|t| (t, result))
    }

    fn apply_metrics(
        &mut self,
        r: ApiResult<MetricsReply>,
        sink: &mut dyn PresentationSink,
    ) -> Result<(), PollError> {
        let reply = r?;
        let label = self.clock.label();
        let packets = reply
            .metrics
            .as_ref()
            .map(|m| m.packets_per_sec)
            .unwrap_or(0.0);
        self.series
            .append(RISK_SERIES, Sample::new(label.clone(), reply.risk_score));
        self.series.append(PACKETS_SERIES, Sample::new(label, packets));
        // render in the same step as the append so chart and data never diverge
        sink.render_series(&ChartView::from_store(&self.series));

        self.status.status = reply.status;
        self.status.risk_score = Some(reply.risk_score);
        if reply.metrics.is_some() {
            self.status.metrics = reply.metrics;
        }
        sink.render_status(&self.status);
        Ok(())
    }

    fn apply_alerts(
        &mut self,
        r: ApiResult<AlertsReply>,
        sink: &mut dyn PresentationSink,
    ) -> Result<(), PollError> {
        let (view, result) = match r {
            Ok(reply) => (
                self.alert_feed.process(&reply.alerts, self.clock.epoch_secs()),
                Ok(()),
            ),
            Err(e) => (
                AlertFeedView::Unavailable {
                    reason: e.to_string(),
                },
                Err(e.into()),
            ),
        };
        sink.render_alerts(&view);
        self.alerts = Some(view);
        result
    }

    fn apply_defense(
        &mut self,
        r: ApiResult<DefenseState>,
        sink: &mut dyn PresentationSink,
    ) -> Result<(), PollError> {
        self.defense.apply_snapshot(r?);
        sink.render_defense(&self.defense.view());
        Ok(())
    }

    fn apply_ai(
        &mut self,
        r: ApiResult<(AiStatus, AiHistory)>,
        sink: &mut dyn PresentationSink,
    ) -> Result<(), PollError> {
        let (status, history) = r?;
        if let Some(e) = status.error().or_else(|| history.error()) {
            return Err(PollError::Backend(e.to_string()));
        }
        let view = ai_view(&status, &history);
        sink.render_ai(&view);
        self.ai = Some(view);
        Ok(())
    }

    fn apply_predictions(
        &mut self,
        batch: PredictionBatch,
        sink: &mut dyn PresentationSink,
    ) -> Result<(), PollError> {
        let result = self.predictions.apply(batch, self.clock.epoch_secs());
        sink.render_predictions(&self.predictions);
        result.map_err(PollError::from)
    }

    fn apply_command(
        &mut self,
        command: Command,
        result: ApiResult<CommandReply>,
        sink: &mut dyn PresentationSink,
    ) {
        match result {
            Ok(reply) if reply.success => {
                info!(?command, "command accepted");
                match command {
                    Command::StartSimulation => {
                        self.status.simulation = SimulationState {
                            running: true,
                            started_at: Some(self.clock.epoch_secs().floor() as i64),
                        };
                        sink.render_status(&self.status);
                    }
                    Command::StopSimulation => {
                        self.status.simulation = SimulationState::default();
                        sink.render_status(&self.status);
                    }
                    Command::Defense(DefenseCommand::SetMode(mode)) => {
                        self.defense.acknowledge_mode(mode);
                        sink.render_defense(&self.defense.view());
                    }
                    // active/stats arrive with the next defense-status poll
                    _ => {}
                }
                let (level, message) = command.success_notice();
                self.notify(sink, level, message);
            }
            Ok(reply) => {
                let err = CommandError::Rejected(
                    reply
                        .message
                        .unwrap_or_else(|| command.failure_prefix().to_string()),
                );
                warn!(?command, %err, "command rejected");
                self.notify(sink, NoticeLevel::Error, err.to_string());
            }
            Err(e) => {
                let err = CommandError::from(e);
                warn!(?command, error = %err, "command failed");
                self.notify(
                    sink,
                    NoticeLevel::Error,
                    format!("{}: {err}", command.failure_prefix()),
                );
            }
        }
    }
}

async fn fetch_ai(backend: &dyn Backend, window: usize) -> ApiResult<(AiStatus, AiHistory)> {
    let status = backend.ai_status().await?;
    let history = backend.ai_history(window).await?;
    Ok((status, history))
}

async fn fetch_predictions(backend: &dyn Backend, hours: u32) -> PredictionBatch {
    let (probability, heatmap, timeline, insights) = tokio::join!(
        backend.attack_probability(hours),
        backend.heatmap(hours),
        backend.timeline(hours),
        backend.insights(),
    );
    PredictionBatch {
        probability,
        heatmap,
        timeline,
        insights,
    }
}

async fn run_command(backend: &dyn Backend, command: Command) -> ApiResult<CommandReply> {
    match command {
        Command::StartSimulation => backend.start_simulation().await,
        Command::StopSimulation => backend.stop_simulation().await,
        Command::TriggerAnomaly(kind) => backend.trigger_anomaly(kind).await,
        Command::Defense(DefenseCommand::SetMode(mode)) => backend.set_defense_mode(mode).await,
        Command::Defense(DefenseCommand::ManualTrigger { risk_score }) => {
            backend.manual_defense(risk_score).await
        }
        Command::Defense(DefenseCommand::Disable) => backend.disable_defense().await,
    }
}

enum Wake {
    Shutdown,
    Outcome(Tagged),
    Tick,
}

/// An outcome stamped with the session that launched it.
#[derive(Debug)]
struct Tagged {
    session: u64,
    outcome: Outcome,
}

pub struct Controller {
    backend: Arc<dyn Backend>,
    config: EngineConfig,
    dashboard: Dashboard,
    scheduler: Scheduler,
    liveness: Liveness,
    tx: mpsc::UnboundedSender<Tagged>,
    rx: mpsc::UnboundedReceiver<Tagged>,
    started: Option<Instant>,
    session: u64,
}

impl Controller {
    pub fn new(backend: Arc<dyn Backend>, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new();
        for kind in TaskKind::ALL {
            scheduler.register(PollTask::new(kind, config.interval(kind)));
        }
        Self {
            backend,
            dashboard: Dashboard::new(&config, clock),
            config,
            scheduler,
            liveness: Liveness::new(),
            tx,
            rx,
            started: None,
            session: 0,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn start(&mut self) {
        if self.started.is_some() {
            return;
        }
        self.liveness.renew();
        self.session += 1;
        self.scheduler.reset();
        self.started = Some(Instant::now());
        info!("dashboard session started");
    }

    /// Cancel the schedule. Fetches already on the wire finish on their own,
    /// but whatever they return is dropped.
    pub fn stop(&mut self) {
        if self.started.take().is_none() {
            return;
        }
        self.liveness.set(false);
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        info!(dropped, "dashboard session stopped");
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Non-blocking step: launch due fetches and apply everything that has
    /// finished since the last call.
    pub fn pump(&mut self, sink: &mut dyn PresentationSink) {
        if self.started.is_none() {
            return;
        }
        self.launch_due();
        while let Ok(tagged) = self.rx.try_recv() {
            self.handle(tagged, sink);
        }
    }

    /// Drive the session until `shutdown` resolves, then stop it.
    pub async fn run<F>(&mut self, sink: &mut dyn PresentationSink, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.start();
        tokio::pin!(shutdown);
        loop {
            self.launch_due();
            let deadline = match (self.started, self.scheduler.next_deadline()) {
                (Some(s), Some(d)) => s + d,
                _ => Instant::now() + Duration::from_millis(100),
            };
            let wake = tokio::select! {
                _ = &mut shutdown => Wake::Shutdown,
                Some(o) = self.rx.recv() => Wake::Outcome(o),
                _ = tokio::time::sleep_until(deadline) => Wake::Tick,
            };
            match wake {
                Wake::Shutdown => break,
                Wake::Outcome(o) => self.handle(o, sink),
                Wake::Tick => {}
            }
        }
        self.stop();
    }

    fn launch_due(&mut self) {
        let now = self.elapsed();
        for kind in self.scheduler.due(now) {
            self.spawn_fetch(kind);
        }
    }

    fn handle(&mut self, tagged: Tagged, sink: &mut dyn PresentationSink) {
        if tagged.session != self.session {
            // slipped past the liveness check of an earlier session
            debug!(task = ?tagged.outcome.task(), "result from a previous session dropped");
            return;
        }
        let outcome = tagged.outcome;
        if let Outcome::Predictions { hours, .. } = &outcome {
            if *hours != self.dashboard.prediction_hours() {
                // horizon changed while this batch was on the wire
                debug!(hours, "stale forecast batch dropped");
                self.scheduler.complete(TaskKind::Predictions, Ok(()));
                self.scheduler
                    .expedite(TaskKind::Predictions, self.elapsed());
                return;
            }
        }
        if let Some((kind, result)) = self.dashboard.apply(outcome, sink) {
            if let Err(e) = &result {
                warn!(task = kind.name(), error = %e, "poll failed");
            }
            if let Some(health) = self.scheduler.complete(kind, result.map_err(|e| e.to_string())) {
                sink.render_health(&health);
            }
        }
    }

    /// Handle a user action from the presentation layer.
    pub fn dispatch(&mut self, intent: Intent, sink: &mut dyn PresentationSink) {
        if self.started.is_none() {
            self.dashboard
                .reject(sink, &CommandError::NotAllowed("dashboard session is not running"));
            return;
        }
        match self.dashboard.prepare(intent) {
            Ok(Prepared::Send(command)) => self.spawn_command(command),
            Ok(Prepared::RefreshPredictions) => {
                info!(hours = self.dashboard.prediction_hours(), "forecast horizon changed");
                self.scheduler
                    .expedite(TaskKind::Predictions, self.elapsed());
                self.launch_due();
            }
            Err(e) => {
                debug!(?intent, error = %e, "intent refused");
                self.dashboard.reject(sink, &e);
            }
        }
    }

    fn deliver(
        live: &Liveness,
        tx: &mpsc::UnboundedSender<Tagged>,
        session: u64,
        outcome: Outcome,
    ) {
        if live.is_live() {
            let _ = tx.send(Tagged { session, outcome });
        } else {
            debug!(task = ?outcome.task(), "result arrived after stop, dropped");
        }
    }

    fn spawn_fetch(&self, kind: TaskKind) {
        let backend = Arc::clone(&self.backend);
        let live = self.liveness.clone();
        let tx = self.tx.clone();
        let session = self.session;
        let hours = self.dashboard.prediction_hours();
        let window = self.config.ai_history_window;
        tokio::spawn(async move {
            let outcome = match kind {
                TaskKind::Metrics => Outcome::Metrics(backend.metrics().await),
                TaskKind::Alerts => Outcome::Alerts(backend.alerts().await),
                TaskKind::DefenseStatus => Outcome::Defense(backend.defense_status().await),
                TaskKind::AiStatus => Outcome::Ai(fetch_ai(backend.as_ref(), window).await),
                TaskKind::Predictions => Outcome::Predictions {
                    hours,
                    batch: fetch_predictions(backend.as_ref(), hours).await,
                },
            };
            Self::deliver(&live, &tx, session, outcome);
        });
    }

    fn spawn_command(&self, command: Command) {
        let backend = Arc::clone(&self.backend);
        let live = self.liveness.clone();
        let tx = self.tx.clone();
        let session = self.session;
        debug!(?command, "sending command");
        tokio::spawn(async move {
            let result = run_command(backend.as_ref(), command).await;
            Self::deliver(&live, &tx, session, Outcome::Command { command, result });
        });
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.liveness.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::TransportError;
    use crate::predictions::PanelState;
    use crate::sink::RecordingSink;
    use crate::types::{
        Alert, DefenseStats, HeatmapReply, InsightsReply, NetworkMetrics, ProbabilityReply,
        SystemStatus, TimelineReply,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    const T0: f64 = 1_700_000_000.0;

    fn critical_metrics(risk: f64) -> MetricsReply {
        MetricsReply {
            risk_score: risk,
            status: SystemStatus::Critical,
            metrics: Some(NetworkMetrics {
                packets_per_sec: 1500.0,
                ..Default::default()
            }),
            timestamp: None,
        }
    }

    fn defense(mode: DefenseMode, active: bool) -> DefenseState {
        DefenseState {
            active,
            mode,
            active_rules_count: 1,
            last_trigger_time: None,
            stats: DefenseStats::default(),
        }
    }

    fn ok_reply() -> ApiResult<CommandReply> {
        Ok(CommandReply {
            success: true,
            message: None,
        })
    }

    fn dashboard() -> (Dashboard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (Dashboard::new(&EngineConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn metrics_fill_both_series_and_evict_at_capacity() {
        let (mut d, clock) = dashboard();
        let mut sink = RecordingSink::default();
        for i in 0..31 {
            let risk = if i == 30 { 85.2 } else { i as f64 };
            let done = d.apply(Outcome::Metrics(Ok(critical_metrics(risk))), &mut sink);
            assert!(matches!(done, Some((TaskKind::Metrics, Ok(())))));
            clock.advance(1.0);
        }
        let risk = d.series().get(RISK_SERIES).unwrap();
        let packets = d.series().get(PACKETS_SERIES).unwrap();
        assert_eq!(risk.len(), 30);
        assert_eq!(packets.len(), 30);
        // sample 0 evicted
        assert_eq!(risk.snapshot()[0].value, 1.0);
        assert_eq!(risk.latest().unwrap().value, 85.2);

        let chart = sink.chart.as_ref().unwrap();
        assert_eq!(chart.labels.len(), chart.risk.len());
        assert_eq!(chart.risk.len(), chart.packets.len());
        assert_eq!(sink.chart_renders, 31);

        let status = sink.status.as_ref().unwrap();
        assert_eq!(status.status, SystemStatus::Critical);
        assert_eq!(status.risk_label(), "85.2");
        assert_eq!(status.metrics.as_ref().unwrap().packets_per_sec, 1500.0);
    }

    #[test]
    fn failed_metrics_poll_leaves_series_alone() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(Outcome::Metrics(Ok(critical_metrics(10.0))), &mut sink);
        let done = d.apply(
            Outcome::Metrics(Err(TransportError::Status { code: 500 })),
            &mut sink,
        );
        assert!(matches!(done, Some((TaskKind::Metrics, Err(_)))));
        assert_eq!(d.series().get(RISK_SERIES).unwrap().len(), 1);
        assert_eq!(sink.chart_renders, 1);
    }

    #[test]
    fn alerts_failure_is_not_nominal() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(Outcome::Alerts(Ok(AlertsReply::default())), &mut sink);
        assert_eq!(sink.alerts, Some(AlertFeedView::Nominal));

        let done = d.apply(
            Outcome::Alerts(Err(TransportError::Other("connection reset".into()))),
            &mut sink,
        );
        assert!(matches!(done, Some((TaskKind::Alerts, Err(_)))));
        assert!(matches!(
            sink.alerts,
            Some(AlertFeedView::Unavailable { ref reason }) if reason.contains("connection reset")
        ));
    }

    #[test]
    fn alerts_show_newest_five() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        let alerts = (0..7)
            .map(|i| Alert {
                timestamp: T0 - 100.0 + i as f64,
                kind: "ddos".into(),
                risk_score: 90.0,
                message: format!("alert {i}"),
            })
            .collect();
        d.apply(Outcome::Alerts(Ok(AlertsReply { alerts })), &mut sink);
        match sink.alerts.as_ref().unwrap() {
            AlertFeedView::Alerts { items, overflow } => {
                assert_eq!(items.len(), 5);
                assert_eq!(*overflow, 2);
                assert_eq!(items[4].alert.message, "alert 6");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn manual_trigger_refused_in_auto_then_allowed_after_ack() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(Outcome::Defense(Ok(defense(DefenseMode::Auto, false))), &mut sink);
        d.apply(Outcome::Metrics(Ok(critical_metrics(64.0))), &mut sink);

        assert!(matches!(
            d.prepare(Intent::TriggerManualDefense),
            Err(CommandError::NotAllowed(_))
        ));

        d.apply(
            Outcome::Command {
                command: Command::Defense(DefenseCommand::SetMode(DefenseMode::Manual)),
                result: ok_reply(),
            },
            &mut sink,
        );
        assert!(sink.defense.as_ref().unwrap().affordances.manual_trigger_enabled);
        assert_eq!(
            d.prepare(Intent::TriggerManualDefense).unwrap(),
            Prepared::Send(Command::Defense(DefenseCommand::ManualTrigger {
                risk_score: 64.0
            }))
        );
    }

    #[test]
    fn manual_trigger_success_only_notifies() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(Outcome::Defense(Ok(defense(DefenseMode::Manual, false))), &mut sink);
        let renders_before = sink.defense.clone();
        d.apply(
            Outcome::Command {
                command: Command::Defense(DefenseCommand::ManualTrigger { risk_score: 70.0 }),
                result: ok_reply(),
            },
            &mut sink,
        );
        let last = sink.notices.last().unwrap();
        assert_eq!(last.level, NoticeLevel::Success);
        assert_eq!(last.message, "Manual defense triggered");
        assert!(!d.defense().snapshot().unwrap().active);
        assert_eq!(sink.defense, renders_before);
    }

    #[test]
    fn manual_trigger_sends_the_gauge_value() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(Outcome::Defense(Ok(defense(DefenseMode::Manual, false))), &mut sink);
        d.apply(Outcome::Metrics(Ok(critical_metrics(85.234))), &mut sink);
        assert_eq!(sink.status.as_ref().unwrap().risk_label(), "85.2");
        assert_eq!(
            d.prepare(Intent::TriggerManualDefense).unwrap(),
            Prepared::Send(Command::Defense(DefenseCommand::ManualTrigger {
                risk_score: 85.2
            }))
        );
    }

    #[test]
    fn unreachable_backend_on_command_is_an_error_notice() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(
            Outcome::Command {
                command: Command::Defense(DefenseCommand::Disable),
                result: Err(TransportError::Status { code: 502 }),
            },
            &mut sink,
        );
        let last = sink.notices.last().unwrap();
        assert_eq!(last.level, NoticeLevel::Error);
        assert_eq!(
            last.message,
            "Failed to disable defense: backend answered HTTP 502"
        );
    }

    #[test]
    fn rejected_command_surfaces_backend_message() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(
            Outcome::Command {
                command: Command::StartSimulation,
                result: Ok(CommandReply {
                    success: false,
                    message: Some("Simulation already running".into()),
                }),
            },
            &mut sink,
        );
        let last = sink.notices.last().unwrap();
        assert_eq!(last.level, NoticeLevel::Error);
        assert_eq!(last.message, "Simulation already running");
        assert!(!d.simulation().running);
    }

    #[test]
    fn start_and_stop_flip_simulation_state() {
        let (mut d, clock) = dashboard();
        let mut sink = RecordingSink::default();
        d.apply(
            Outcome::Command {
                command: Command::StartSimulation,
                result: ok_reply(),
            },
            &mut sink,
        );
        let sim = sink.status.as_ref().unwrap().simulation;
        assert!(sim.running && !sim.start_enabled() && sim.stop_enabled());
        assert_eq!(sim.started_at, Some(T0 as i64));

        clock.advance(30.0);
        d.apply(
            Outcome::Command {
                command: Command::StopSimulation,
                result: ok_reply(),
            },
            &mut sink,
        );
        assert_eq!(sink.status.as_ref().unwrap().simulation, SimulationState::default());
        assert_eq!(sink.notices.last().unwrap().level, NoticeLevel::Info);
    }

    #[test]
    fn ai_error_body_degrades_task_without_render() {
        let (mut d, _) = dashboard();
        let mut sink = RecordingSink::default();
        let status = AiStatus {
            error: Some("detector not initialised".into()),
            ..Default::default()
        };
        let done = d.apply(Outcome::Ai(Ok((status, AiHistory::default()))), &mut sink);
        assert!(matches!(done, Some((TaskKind::AiStatus, Err(PollError::Backend(_))))));
        assert!(sink.ai.is_none());
    }

    #[test]
    fn horizon_must_be_a_known_choice() {
        let (mut d, _) = dashboard();
        assert!(d.prepare(Intent::SetPredictionHours(8)).is_err());
        assert_eq!(d.prediction_hours(), 24);
        assert_eq!(
            d.prepare(Intent::SetPredictionHours(12)).unwrap(),
            Prepared::RefreshPredictions
        );
        assert_eq!(d.prediction_hours(), 12);
    }

    /// Backend stand-in with canned replies and a call log.
    #[derive(Default)]
    struct Fake {
        heatmap_error: Option<String>,
        defense_mode: Mutex<DefenseMode>,
        // metrics fetches wait here when set
        gate: Option<Semaphore>,
        metrics_calls: AtomicUsize,
        hours_seen: Mutex<Vec<u32>>,
        sent: Mutex<Vec<&'static str>>,
    }

    impl Fake {
        fn record(&self, what: &'static str) -> ApiResult<CommandReply> {
            self.sent.lock().unwrap().push(what);
            ok_reply()
        }
    }

    #[async_trait::async_trait]
    impl Backend for Fake {
        async fn metrics(&self) -> ApiResult<MetricsReply> {
            self.metrics_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await;
            }
            Ok(critical_metrics(85.2))
        }
        async fn alerts(&self) -> ApiResult<AlertsReply> {
            Ok(AlertsReply::default())
        }
        async fn defense_status(&self) -> ApiResult<DefenseState> {
            Ok(defense(*self.defense_mode.lock().unwrap(), false))
        }
        async fn ai_status(&self) -> ApiResult<AiStatus> {
            Ok(AiStatus {
                ai_model_loaded: true,
                detection_mode: Some("hybrid".into()),
                ..Default::default()
            })
        }
        async fn ai_history(&self, _window_size: usize) -> ApiResult<AiHistory> {
            Ok(AiHistory::default())
        }
        async fn attack_probability(&self, hours: u32) -> ApiResult<ProbabilityReply> {
            self.hours_seen.lock().unwrap().push(hours);
            Ok(ProbabilityReply::default())
        }
        async fn heatmap(&self, _hours: u32) -> ApiResult<HeatmapReply> {
            Ok(HeatmapReply {
                heatmap_data: vec![],
                error: self.heatmap_error.clone(),
            })
        }
        async fn timeline(&self, _hours: u32) -> ApiResult<TimelineReply> {
            Ok(TimelineReply::default())
        }
        async fn insights(&self) -> ApiResult<InsightsReply> {
            Ok(InsightsReply::default())
        }
        async fn start_simulation(&self) -> ApiResult<CommandReply> {
            self.record("start")
        }
        async fn stop_simulation(&self) -> ApiResult<CommandReply> {
            self.record("stop")
        }
        async fn trigger_anomaly(&self, _kind: AnomalyKind) -> ApiResult<CommandReply> {
            self.record("anomaly")
        }
        async fn set_defense_mode(&self, _mode: DefenseMode) -> ApiResult<CommandReply> {
            self.record("mode")
        }
        async fn manual_defense(&self, _risk_score: f64) -> ApiResult<CommandReply> {
            self.record("manual")
        }
        async fn disable_defense(&self) -> ApiResult<CommandReply> {
            self.record("disable")
        }
    }

    fn controller(fake: Arc<Fake>, config: EngineConfig) -> Controller {
        Controller::new(fake, config, Arc::new(ManualClock::new(T0)))
    }

    async fn drive(c: &mut Controller, sink: &mut RecordingSink, rounds: usize) {
        for _ in 0..rounds {
            c.pump(sink);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        c.pump(sink);
    }

    #[tokio::test]
    async fn first_cycle_renders_every_panel() {
        let fake = Arc::new(Fake {
            heatmap_error: Some("Insufficient historical data".into()),
            ..Default::default()
        });
        let mut c = controller(fake.clone(), EngineConfig::default());
        let mut sink = RecordingSink::default();
        c.start();
        drive(&mut c, &mut sink, 10).await;

        assert_eq!(sink.status.as_ref().unwrap().risk_label(), "85.2");
        assert_eq!(sink.alerts, Some(AlertFeedView::Nominal));
        assert!(!sink.defense.as_ref().unwrap().pending);
        assert_eq!(sink.ai.as_ref().unwrap().detection_mode, "hybrid");

        let p = sink.predictions.as_ref().unwrap();
        assert!(p.probability.visible().is_some());
        assert!(p.timeline.visible().is_some());
        assert_eq!(
            p.heatmap.state,
            PanelState::Unavailable("Insufficient historical data".into())
        );
        let degraded: Vec<_> = sink
            .health
            .iter()
            .filter(|h| h.degraded)
            .map(|h| h.kind)
            .collect();
        assert_eq!(degraded, vec![TaskKind::Predictions]);
        assert_eq!(*fake.hours_seen.lock().unwrap(), vec![24]);
    }

    #[tokio::test]
    async fn slow_fetch_skips_ticks_instead_of_stacking() {
        let fake = Arc::new(Fake {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        });
        let config = EngineConfig {
            metrics_interval: Duration::from_millis(10),
            ..EngineConfig::default()
        };
        let mut c = controller(fake.clone(), config);
        let mut sink = RecordingSink::default();
        c.start();
        drive(&mut c, &mut sink, 12).await;

        assert_eq!(fake.metrics_calls.load(Ordering::SeqCst), 1);
        let task = c.scheduler().task(TaskKind::Metrics).unwrap();
        assert!(task.in_flight);
        assert!(task.skipped >= 2);
        assert!(sink.status.is_none());

        if let Some(gate) = &fake.gate {
            gate.add_permits(100);
        }
        drive(&mut c, &mut sink, 6).await;
        assert!(sink.status.is_some());
        c.stop();
    }

    #[tokio::test]
    async fn results_after_stop_are_dropped() {
        let fake = Arc::new(Fake::default());
        let mut c = controller(fake.clone(), EngineConfig::default());
        let mut sink = RecordingSink::default();
        c.start();
        c.pump(&mut sink);
        c.stop();
        tokio::time::sleep(Duration::from_millis(30)).await;
        c.pump(&mut sink);

        assert!(!c.is_running());
        assert!(sink.status.is_none());
        assert!(sink.chart.is_none());
        assert!(sink.predictions.is_none());
    }

    #[tokio::test]
    async fn late_result_from_previous_session_is_ignored() {
        let fake = Arc::new(Fake {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        });
        let mut c = controller(fake.clone(), EngineConfig::default());
        let mut sink = RecordingSink::default();
        c.start();
        c.pump(&mut sink);
        let first = c.session;
        c.stop();

        c.start();
        c.pump(&mut sink);
        assert!(c.scheduler().task(TaskKind::Metrics).unwrap().in_flight);

        // a fetch from the first session that got past its liveness check
        c.tx
            .send(Tagged {
                session: first,
                outcome: Outcome::Metrics(Ok(critical_metrics(10.0))),
            })
            .unwrap();
        drive(&mut c, &mut sink, 4).await;

        assert!(sink.status.is_none());
        assert!(c.scheduler().task(TaskKind::Metrics).unwrap().in_flight);
        assert!(c.dashboard().series().get(RISK_SERIES).map_or(true, |s| s.is_empty()));
    }

    #[tokio::test]
    async fn manual_trigger_in_auto_mode_is_never_sent() {
        let fake = Arc::new(Fake::default());
        let mut c = controller(fake.clone(), EngineConfig::default());
        let mut sink = RecordingSink::default();
        c.start();
        drive(&mut c, &mut sink, 6).await;

        c.dispatch(Intent::TriggerManualDefense, &mut sink);
        drive(&mut c, &mut sink, 4).await;
        assert!(fake.sent.lock().unwrap().is_empty());
        assert_eq!(sink.notices.last().unwrap().level, NoticeLevel::Error);

        c.dispatch(Intent::SetMode(DefenseMode::Manual), &mut sink);
        drive(&mut c, &mut sink, 4).await;
        c.dispatch(Intent::TriggerManualDefense, &mut sink);
        drive(&mut c, &mut sink, 4).await;
        assert_eq!(*fake.sent.lock().unwrap(), vec!["mode", "manual"]);
        assert_eq!(
            sink.notices.last().unwrap().message,
            "Manual defense triggered"
        );
    }

    #[tokio::test]
    async fn dispatch_without_session_is_refused() {
        let fake = Arc::new(Fake::default());
        let mut c = controller(fake.clone(), EngineConfig::default());
        let mut sink = RecordingSink::default();
        c.dispatch(Intent::StartSimulation, &mut sink);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(fake.sent.lock().unwrap().is_empty());
        assert_eq!(sink.notices.len(), 1);
        assert_eq!(sink.notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn horizon_change_refetches_with_new_hours() {
        let fake = Arc::new(Fake::default());
        let mut c = controller(fake.clone(), EngineConfig::default());
        let mut sink = RecordingSink::default();
        c.start();
        drive(&mut c, &mut sink, 6).await;

        c.dispatch(Intent::SetPredictionHours(6), &mut sink);
        drive(&mut c, &mut sink, 6).await;
        assert_eq!(*fake.hours_seen.lock().unwrap(), vec![24, 6]);
        assert_eq!(sink.predictions.as_ref().unwrap().horizon_hours, 6);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let fake = Arc::new(Fake::default());
        let mut c = controller(fake.clone(), EngineConfig::default());
        let mut sink = RecordingSink::default();
        c.run(&mut sink, tokio::time::sleep(Duration::from_millis(50)))
            .await;
        assert!(!c.is_running());
        assert_eq!(sink.status.as_ref().unwrap().status, SystemStatus::Critical);
    }
}
