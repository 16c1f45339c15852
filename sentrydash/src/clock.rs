//! Wall-clock access, injectable so the engine can run against virtual time.

use chrono::{Local, TimeZone};

pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn epoch_secs(&self) -> f64;

    /// Local `HH:MM:SS` marker for chart samples.
    fn label(&self) -> String {
        format_time_of_day(self.epoch_secs())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> f64 {
        Local::now().timestamp_millis() as f64 / 1000.0
    }
}

/// Fixed instant, advanced by hand in tests.
#[derive(Debug)]
pub struct ManualClock(std::sync::Mutex<f64>);

impl ManualClock {
    pub fn new(epoch_secs: f64) -> Self {
        Self(std::sync::Mutex::new(epoch_secs))
    }

    pub fn set(&self, epoch_secs: f64) {
        if let Ok(mut t) = self.0.lock() {
            *t = epoch_secs;
        }
    }

    pub fn advance(&self, secs: f64) {
        if let Ok(mut t) = self.0.lock() {
            *t += secs;
        }
    }
}

impl Clock for ManualClock {
    fn epoch_secs(&self) -> f64 {
        self.0.lock().map(|t| *t).unwrap_or(0.0)
    }
}

pub fn format_time_of_day(epoch_secs: f64) -> String {
    match Local.timestamp_opt(epoch_secs.floor() as i64, 0).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => "--:--:--".into(),
    }
}

/// `HH:MM:SS` for an elapsed duration in whole seconds.
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
