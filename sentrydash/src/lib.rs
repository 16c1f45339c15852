//! sentrydash: terminal dashboard for a network-defense monitor.
//!
//! The engine polls the monitor's HTTP API on independent cadences, keeps
//! bounded chart history, and hands prepared view models to a
//! [`sink::PresentationSink`]. The binary wires it to a ratatui front end or,
//! with `--headless`, to structured log output.

pub mod ai;
pub mod alerts;
pub mod api;
pub mod app;
pub mod clock;
pub mod defense;
pub mod engine;
pub mod error;
pub mod history;
pub mod poll;
pub mod predictions;
pub mod profiles;
pub mod sink;
pub mod types;
pub mod ui;
