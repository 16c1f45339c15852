//! Shared UI colours.

use ratatui::style::Color;

pub const CRITICAL: Color = Color::Red;
pub const HIGH: Color = Color::LightRed;
pub const MEDIUM: Color = Color::Yellow;
pub const LOW: Color = Color::Green;

pub const RISK_LINE: Color = Color::Red;
pub const PACKETS_LINE: Color = Color::Cyan;
pub const FORECAST_LINE: Color = Color::Magenta;

pub const MUTED: Color = Color::DarkGray;
pub const HIGHLIGHT_BG: Color = Color::Rgb(60, 40, 40);
