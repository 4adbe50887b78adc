//! cpiwatch library
//!
//! Turkey's year-over-year CPI: scraped series, a 10-year autoregressive forecast,
//! atomic on-disk artifacts and the orchestration shared by both binaries.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod forecast;
pub mod present;
pub mod refresh;
pub mod schedule;
pub mod store;
pub mod ui;
