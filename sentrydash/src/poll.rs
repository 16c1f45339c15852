//! Poll task registry.
//!
//! Pure bookkeeping over an injected elapsed time: which tasks are due, which
//! are still waiting on a fetch, and how each one last ended. The controller
//! owns the real timers and the network; this keeps the schedule testable
//! without either.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskKind {
    Metrics,
    Alerts,
    DefenseStatus,
    AiStatus,
    Predictions,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Metrics,
        TaskKind::Alerts,
        TaskKind::DefenseStatus,
        TaskKind::AiStatus,
        TaskKind::Predictions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Metrics => "metrics",
            TaskKind::Alerts => "alerts",
            TaskKind::DefenseStatus => "defense-status",
            TaskKind::AiStatus => "ai-status",
            TaskKind::Predictions => "predictions",
        }
    }

    pub fn default_interval(self) -> Duration {
        match self {
            TaskKind::Metrics | TaskKind::Alerts | TaskKind::DefenseStatus => {
                Duration::from_millis(1000)
            }
            TaskKind::AiStatus => Duration::from_millis(3000),
            TaskKind::Predictions => Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollTask {
    pub kind: TaskKind,
    pub interval: Duration,
    next_due: Duration,
    pub in_flight: bool,
    pub last_error: Option<String>,
    /// Consecutive failed cycles; reset on success.
    pub failures: u32,
    /// Ticks dropped because the previous fetch was still pending.
    pub skipped: u64,
    pub completed: u64,
}

impl PollTask {
    pub fn new(kind: TaskKind, interval: Duration) -> Self {
        Self {
            kind,
            interval,
            // first fetch fires immediately
            next_due: Duration::ZERO,
            in_flight: false,
            last_error: None,
            failures: 0,
            skipped: 0,
            completed: 0,
        }
    }

    pub fn health(&self) -> TaskHealth {
        TaskHealth {
            kind: self.kind,
            degraded: self.last_error.is_some(),
            last_error: self.last_error.clone(),
            failures: self.failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHealth {
    pub kind: TaskKind,
    pub degraded: bool,
    pub last_error: Option<String>,
    pub failures: u32,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<PollTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a kind twice replaces its interval and resets its timer.
    pub fn register(&mut self, task: PollTask) {
        match self.tasks.iter_mut().find(|t| t.kind == task.kind) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    pub fn task(&self, kind: TaskKind) -> Option<&PollTask> {
        self.tasks.iter().find(|t| t.kind == kind)
    }

    fn task_mut(&mut self, kind: TaskKind) -> Option<&mut PollTask> {
        self.tasks.iter_mut().find(|t| t.kind == kind)
    }

    /// Tasks whose timer fired by `now`, marked in flight. A task whose
    /// previous fetch is still outstanding loses this tick instead of queueing.
    pub fn due(&mut self, now: Duration) -> Vec<TaskKind> {
        let mut fire = Vec::new();
        for t in &mut self.tasks {
            if now < t.next_due {
                continue;
            }
            // collapse ticks missed while the loop was busy into one
            let interval = t.interval.max(Duration::from_millis(1));
            while t.next_due <= now {
                t.next_due += interval;
            }
            if t.in_flight {
                t.skipped += 1;
                debug!(task = t.kind.name(), "tick skipped, previous fetch still pending");
                continue;
            }
            t.in_flight = true;
            fire.push(t.kind);
        }
        fire
    }

    /// Fire a task on the next `due` call regardless of its timer.
    pub fn expedite(&mut self, kind: TaskKind, now: Duration) {
        if let Some(t) = self.task_mut(kind) {
            t.next_due = now;
        }
    }

    pub fn complete(&mut self, kind: TaskKind, result: Result<(), String>) -> Option<TaskHealth> {
        let t = self.task_mut(kind)?;
        t.in_flight = false;
        t.completed += 1;
        match result {
            Ok(()) => {
                t.last_error = None;
                t.failures = 0;
            }
            Err(e) => {
                t.last_error = Some(e);
                t.failures = t.failures.saturating_add(1);
            }
        }
        Some(t.health())
    }

    /// Earliest instant any task becomes due.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.tasks.iter().map(|t| t.next_due).min()
    }

    pub fn health(&self) -> Vec<TaskHealth> {
        self.tasks.iter().map(PollTask::health).collect()
    }

    pub fn reset(&mut self) {
        for t in &mut self.tasks {
            t.in_flight = false;
            t.next_due = Duration::ZERO;
        }
    }
}

/// Cleared when a session stops; fetches finishing afterwards drop their result.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, live: bool) {
        self.0.store(live, Ordering::Release);
    }

    /// Fresh flag for a new session; previous holders stay dead.
    pub fn renew(&mut self) {
        self.0.store(false, Ordering::Release);
        self.0 = Arc::new(AtomicBool::new(true));
    }
}
