//! App state and main loop: input handling, driving the controller, and drawing.

use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::time::sleep;
use tracing::info;

use crate::ai::AiView;
use crate::alerts::AlertFeedView;
use crate::clock::Clock;
use crate::defense::DefenseView;
use crate::engine::{Controller, Intent};
use crate::history::ChartView;
use crate::poll::TaskHealth;
use crate::predictions::PredictionsView;
use crate::sink::{Notification, PresentationSink, StatusView};
use crate::types::{AnomalyKind, DefenseMode};
use crate::ui::{
    ai::draw_ai,
    alerts::draw_alerts,
    chart::draw_series,
    defense::draw_defense,
    header::{draw_footer, draw_header},
    metrics::draw_metrics,
    predictions::draw_predictions,
    theme,
};

/// How long a toast stays in the header.
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(3);
const FRAME: Duration = Duration::from_millis(100);

/// Latest view models, as the terminal front end sees them.
#[derive(Default)]
pub struct TuiSink {
    chart: ChartView,
    status: Option<StatusView>,
    alerts: Option<(AlertFeedView, Instant)>,
    defense: Option<DefenseView>,
    ai: Option<AiView>,
    predictions: Option<PredictionsView>,
    health: Vec<TaskHealth>,
    notice: Option<(Notification, Instant)>,
}

impl TuiSink {
    /// The current toast, if it has not expired.
    pub fn notice(&self) -> Option<&Notification> {
        self.notice
            .as_ref()
            .filter(|(_, at)| at.elapsed() < NOTICE_LIFETIME)
            .map(|(n, _)| n)
    }

    fn expire(&mut self) {
        if self.notice().is_none() {
            self.notice = None;
        }
    }
}

impl PresentationSink for TuiSink {
    fn render_series(&mut self, chart: &ChartView) {
        self.chart = chart.clone();
    }

    fn render_status(&mut self, status: &StatusView) {
        self.status = Some(status.clone());
    }

    fn render_alerts(&mut self, alerts: &AlertFeedView) {
        self.alerts = Some((alerts.clone(), Instant::now()));
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
        // a newer toast replaces the visible one
        self.notice = Some((notice.clone(), Instant::now()));
    }
}

/// Key bindings. `None` for keys the dashboard ignores.
pub fn key_intent(code: KeyCode) -> Option<Intent> {
    let intent = match code {
        KeyCode::Char('s') => Intent::StartSimulation,
        KeyCode::Char('x') => Intent::StopSimulation,
        KeyCode::Char('d') => Intent::TriggerAnomaly(AnomalyKind::Ddos),
        KeyCode::Char('r') => Intent::TriggerAnomaly(AnomalyKind::ResourceExhaustion),
        KeyCode::Char('a') => Intent::SetMode(DefenseMode::Auto),
        KeyCode::Char('m') => Intent::SetMode(DefenseMode::Manual),
        KeyCode::Char('t') => Intent::TriggerManualDefense,
        KeyCode::Char('k') => Intent::DisableDefense,
        KeyCode::Char('6') => Intent::SetPredictionHours(6),
        KeyCode::Char('1') => Intent::SetPredictionHours(12),
        KeyCode::Char('2') => Intent::SetPredictionHours(24),
        _ => return None,
    };
    Some(intent)
}

pub struct App {
    controller: Controller,
    clock: std::sync::Arc<dyn Clock>,
    view: TuiSink,
    should_quit: bool,
}

impl App {
    pub fn new(controller: Controller, clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            controller,
            clock,
            view: TuiSink::default(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        self.controller.start();
        let res = self.event_loop(&mut terminal).await;
        self.controller.stop();

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    match k.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                            self.should_quit = true;
                        }
                        code => {
                            if let Some(intent) = key_intent(code) {
                                self.controller.dispatch(intent, &mut self.view);
                            }
                        }
                    }
                }
            }
            if self.should_quit {
                info!("quit requested");
                break;
            }

            self.controller.pump(&mut self.view);
            self.view.expire();

            terminal.draw(|f| self.draw(f))?;

            sleep(FRAME).await;
        }
        Ok(())
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let v = &self.view;

        // header, charts, panels, alerts + forecast, footer
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Ratio(1, 4),
                Constraint::Length(10),
                Constraint::Min(10),
                Constraint::Length(1),
            ])
            .split(area);

        draw_header(
            f,
            rows[0],
            v.status.as_ref(),
            v.notice(),
            self.clock.epoch_secs(),
        );

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        draw_series(
            f,
            charts[0],
            "Risk score",
            &v.chart.labels,
            &v.chart.risk,
            theme::RISK_LINE,
        );
        draw_series(
            f,
            charts[1],
            "Packets/s",
            &v.chart.labels,
            &v.chart.packets,
            theme::PACKETS_LINE,
        );

        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ])
            .split(rows[2]);
        draw_metrics(
            f,
            panels[0],
            v.status.as_ref().and_then(|s| s.metrics.as_ref()),
        );
        draw_defense(f, panels[1], v.defense.as_ref());
        draw_ai(f, panels[2], v.ai.as_ref());

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[3]);
        let (feed, since) = match &v.alerts {
            Some((feed, at)) => (Some(feed), at.elapsed()),
            None => (None, Duration::ZERO),
        };
        draw_alerts(f, bottom[0], feed, since);
        let running = v.status.as_ref().is_some_and(|s| s.simulation.running);
        draw_predictions(
            f,
            bottom[1],
            v.predictions.as_ref(),
            self.clock.epoch_secs(),
            running,
        );

        draw_footer(f, rows[4], &v.health);
    }
}
