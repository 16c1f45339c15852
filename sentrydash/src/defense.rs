//! Defense control: authoritative snapshot plus the control affordances.
//!
//! `active`, `mode` and `stats` only ever change through a polled snapshot.
//! Commands are fire-and-forget; the one local shortcut is that an
//! acknowledged mode switch flips the button state before the next poll.

use crate::clock::format_time_of_day;
use crate::error::CommandError;
use crate::types::{DefenseMode, DefenseState};

/// What the presentation layer may offer the user right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub selected_mode: DefenseMode,
    pub manual_trigger_enabled: bool,
    pub disable_enabled: bool,
}

impl Default for Affordances {
    fn default() -> Self {
        // the backend starts in auto mode
        Self::for_mode(DefenseMode::Auto, false)
    }
}

impl Affordances {
    fn for_mode(mode: DefenseMode, active: bool) -> Self {
        Self {
            selected_mode: mode,
            manual_trigger_enabled: mode == DefenseMode::Manual,
            disable_enabled: active,
        }
    }
}

/// A command the controller should send.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefenseCommand {
    SetMode(DefenseMode),
    ManualTrigger { risk_score: f64 },
    Disable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefenseView {
    pub mode: DefenseMode,
    pub active: bool,
    pub active_rules: u64,
    pub last_trigger: String,
    pub effectiveness: String,
    pub affordances: Affordances,
    /// No snapshot has arrived yet.
    pub pending: bool,
}

#[derive(Debug, Default, Clone)]
pub struct DefenseMachine {
    snapshot: Option<DefenseState>,
    affordances: Affordances,
}

impl DefenseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&DefenseState> {
        self.snapshot.as_ref()
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    /// Replace local state wholesale with the server's view.
    pub fn apply_snapshot(&mut self, state: DefenseState) {
        self.affordances = Affordances::for_mode(state.mode, state.active);
        self.snapshot = Some(state);
    }

    pub fn request_mode(&self, mode: DefenseMode) -> DefenseCommand {
        DefenseCommand::SetMode(mode)
    }

    /// The server accepted a mode switch. Only the affordances move; the
    /// snapshot keeps the last polled `mode` until the next poll replaces it.
    pub fn acknowledge_mode(&mut self, mode: DefenseMode) {
        self.affordances.selected_mode = mode;
        self.affordances.manual_trigger_enabled = mode == DefenseMode::Manual;
    }

    pub fn request_manual_trigger(
        &self,
        last_risk: Option<f64>,
    ) -> Result<DefenseCommand, CommandError> {
        if self.affordances.selected_mode != DefenseMode::Manual {
            return Err(CommandError::NotAllowed(
                "manual defense is only available in manual mode",
            ));
        }
        Ok(DefenseCommand::ManualTrigger {
            risk_score: last_risk.filter(|v| v.is_finite()).unwrap_or(0.0),
        })
    }

    /// Always allowed; the button is only offered while defense is active.
    pub fn request_disable(&self) -> DefenseCommand {
        DefenseCommand::Disable
    }

    /// `successful / total × 100`, or `None` before the first trigger.
    pub fn effectiveness(&self) -> Option<f64> {
        let stats = self.snapshot.as_ref()?.stats;
        if stats.total_triggers == 0 {
            return None;
        }
        Some(stats.successful_defenses as f64 / stats.total_triggers as f64 * 100.0)
    }

    pub fn effectiveness_label(&self) -> String {
        match self.effectiveness() {
            Some(pct) => format!("{pct:.1}%"),
            None => "0%".into(),
        }
    }

    pub fn view(&self) -> DefenseView {
        let s = self.snapshot.clone().unwrap_or_default();
        DefenseView {
            mode: s.mode,
            active: s.active,
            active_rules: s.active_rules_count,
            last_trigger: s
                .last_trigger_time
                // the backend resets this to 0 when nothing has fired
                .filter(|t| *t > 0.0)
                .map(format_time_of_day)
                .unwrap_or_else(|| "-".into()),
            effectiveness: self.effectiveness_label(),
            affordances: self.affordances,
            pending: self.snapshot.is_none(),
        }
    }
}
