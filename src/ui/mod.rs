//! UI rendering module for the CPI dashboard
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components.

pub mod dashboard;
pub mod data_table;
pub mod help_overlay;
pub mod widgets;

pub use dashboard::render as render_dashboard;
pub use help_overlay::render as render_help_overlay;
