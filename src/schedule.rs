//! Schedule gate for the unattended refresh
//!
//! This module decides whether a scheduled invocation should run the joint refresh.
//! The decision only looks at the calendar date, the override flag, the date of the
//! last successful run and the configured policy, so it can be tested without a clock.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default minimum number of days between two successful runs
pub const DEFAULT_INTERVAL_DAYS: u32 = 30;

/// Day of month used by the legacy fixed-date trigger
pub const LEGACY_TRIGGER_DAY: u32 = 30;

/// When a scheduled invocation is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Due only on this calendar day. Months without that day never trigger.
    DayOfMonth(u32),
    /// Due when no run ever succeeded, or at least `days` days passed since the last one.
    MinInterval { days: u32 },
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        SchedulePolicy::MinInterval {
            days: DEFAULT_INTERVAL_DAYS,
        }
    }
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulePolicy::DayOfMonth(day) => write!(f, "day:{}", day),
            SchedulePolicy::MinInterval { days } => write!(f, "interval:{}", days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePolicyError {
    #[error("Invalid schedule '{0}'. Expected 'interval:<days>' or 'day:<1-31>'")]
    Format(String),
}

impl FromStr for SchedulePolicy {
    type Err = ParsePolicyError;

    /// Parses `interval:<days>` (days ≥ 1) or `day:<n>` (1 ≤ n ≤ 31)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParsePolicyError::Format(s.to_string());
        let (kind, value) = s.trim().split_once(':').ok_or_else(invalid)?;
        let value: u32 = value.trim().parse().map_err(|_| invalid())?;

        match kind.trim().to_lowercase().as_str() {
            "interval" if value >= 1 => Ok(SchedulePolicy::MinInterval { days: value }),
            "day" if (1..=31).contains(&value) => Ok(SchedulePolicy::DayOfMonth(value)),
            _ => Err(invalid()),
        }
    }
}

/// Gate state after a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Running,
}

/// Why the gate reached its state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The override flag was set
    Forced,
    /// Today is the configured day of month
    ScheduledDay,
    /// No successful run was ever recorded
    NeverRun,
    /// The minimum interval has elapsed since the last successful run
    IntervalElapsed,
    /// The recorded run lies in the future, so the ledger cannot be trusted
    LedgerAhead,
    /// Nothing is due
    NotDue,
}

impl Trigger {
    pub fn describe(&self) -> &'static str {
        match self {
            Trigger::Forced => "forced by override flag",
            Trigger::ScheduledDay => "scheduled day of month",
            Trigger::NeverRun => "no previous successful run",
            Trigger::IntervalElapsed => "minimum interval elapsed",
            Trigger::LedgerAhead => "last recorded run is in the future",
            Trigger::NotDue => "not due",
        }
    }
}

/// Outcome of [`decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: GateState,
    pub trigger: Trigger,
}

impl Decision {
    fn running(trigger: Trigger) -> Self {
        Self {
            state: GateState::Running,
            trigger,
        }
    }

    fn idle() -> Self {
        Self {
            state: GateState::Idle,
            trigger: Trigger::NotDue,
        }
    }

    pub fn should_run(&self) -> bool {
        self.state == GateState::Running
    }
}

/// Decides whether the joint refresh runs today.
///
/// # Arguments
/// * `today` - Current calendar date
/// * `force` - Override flag; always wins
/// * `last_success` - Date of the last successful run, if any
/// * `policy` - Schedule policy
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use cpiwatch::schedule::{decide, GateState, SchedulePolicy};
///
/// let today = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
/// let decision = decide(today, false, None, SchedulePolicy::DayOfMonth(30));
/// assert_eq!(decision.state, GateState::Running);
/// ```
pub fn decide(
    today: NaiveDate,
    force: bool,
    last_success: Option<NaiveDate>,
    policy: SchedulePolicy,
) -> Decision {
    if force {
        return Decision::running(Trigger::Forced);
    }

    match policy {
        SchedulePolicy::DayOfMonth(day) => {
            if today.day() == day {
                Decision::running(Trigger::ScheduledDay)
            } else {
                Decision::idle()
            }
        }
        SchedulePolicy::MinInterval { days } => {
            let Some(last) = last_success else {
                return Decision::running(Trigger::NeverRun);
            };
            let elapsed = (today - last).num_days();
            if elapsed < 0 {
                Decision::running(Trigger::LedgerAhead)
            } else if elapsed >= i64::from(days) {
                Decision::running(Trigger::IntervalElapsed)
            } else {
                Decision::idle()
            }
        }
    }
}
