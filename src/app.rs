//! Application state for the CPI dashboard
//!
//! This module holds the snapshot being displayed, the derived chart traces and table
//! rows, and the view toggles driven by keyboard input.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};

use crate::data::CpiSource;
use crate::forecast::Forecaster;
use crate::present::{build_traces, headline, table_rows, Headline, TableRow, Traces};
use crate::refresh::{Orchestrator, Outcome, Snapshot};

/// Application state enum representing the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Initial loading state while obtaining data
    Loading,
    /// Chart, headline and optional table
    Dashboard,
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// Data being displayed, once loaded
    pub snapshot: Option<Snapshot>,
    /// Chart traces derived from the snapshot
    pub traces: Traces,
    /// Raw-data rows derived from the snapshot
    pub rows: Vec<TableRow>,
    /// Headline metrics derived from the snapshot
    pub headline: Option<Headline>,
    /// Whether the raw-data table is expanded
    pub show_table: bool,
    /// First visible table row
    pub table_scroll: usize,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// When the snapshot was obtained
    pub loaded_at: Option<DateTime<Local>>,
}

impl App {
    pub fn new() -> Self {
        Self {
            state: AppState::Loading,
            snapshot: None,
            traces: Traces::default(),
            rows: Vec::new(),
            headline: None,
            show_table: false,
            table_scroll: 0,
            show_help: false,
            should_quit: false,
            loaded_at: None,
        }
    }

    /// Obtains a snapshot through `orchestrator` and switches to the dashboard
    pub async fn load<S: CpiSource, M: Forecaster>(
        &mut self,
        orchestrator: &Orchestrator<'_, S, M>,
        horizon: usize,
    ) {
        let snapshot = orchestrator.obtain(horizon).await;
        self.set_snapshot(snapshot);
    }

    /// Replaces the displayed snapshot and rebuilds everything derived from it
    pub fn set_snapshot(&mut self, snapshot: Snapshot) {
        self.traces = build_traces(&snapshot.series, &snapshot.forecast);
        self.rows = table_rows(&snapshot.series, &snapshot.forecast);
        self.headline = headline(&snapshot.series, snapshot.source);
        self.snapshot = Some(snapshot);
        self.table_scroll = 0;
        self.loaded_at = Some(Local::now());
        self.state = AppState::Dashboard;
    }

    /// Outcome of the displayed snapshot, if loaded
    pub fn outcome(&self) -> Option<Outcome> {
        self.snapshot.as_ref().map(Snapshot::outcome)
    }

    /// Handles keyboard input and updates state accordingly
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Help overlay swallows everything except its close keys and quit
        if self.show_help {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('?') => self.show_help = false,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            KeyCode::Char('t') if self.state == AppState::Dashboard => {
                self.toggle_table();
            }
            KeyCode::Up | KeyCode::Char('k') if self.show_table => {
                self.scroll_up();
            }
            KeyCode::Down | KeyCode::Char('j') if self.show_table => {
                self.scroll_down();
            }
            _ => {}
        }
    }

    pub fn toggle_table(&mut self) {
        self.show_table = !self.show_table;
        self.table_scroll = 0;
    }

    /// Scrolls the table up, stopping at the first row
    pub fn scroll_up(&mut self) {
        self.table_scroll = self.table_scroll.saturating_sub(1);
    }

    /// Scrolls the table down, stopping at the last row
    pub fn scroll_down(&mut self) {
        let max = self.rows.len().saturating_sub(1);
        if self.table_scroll < max {
            self.table_scroll += 1;
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
