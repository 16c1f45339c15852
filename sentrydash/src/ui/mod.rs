//! UI module root: exposes drawing functions for individual panels.

pub mod ai;
pub mod alerts;
pub mod chart;
pub mod defense;
pub mod header;
pub mod metrics;
pub mod predictions;
pub mod theme;
pub mod util;
