//! Core data models for cpiwatch
//!
//! This module contains the monthly CPI series, the forecast table derived from it,
//! and the provenance tag attached to every retrieval.

pub mod tcmb;

pub use tcmb::{CpiSource, SourceError, TcmbClient};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns the first day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Returns the first day of the month `n` months after `date`'s month
pub fn add_months(date: NaiveDate, n: u32) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(n))
}

/// One calendar month's year-over-year CPI change, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// First day of the month
    pub date: NaiveDate,
    /// YoY change in percent
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date: month_start(date),
            value,
        }
    }
}

/// A monthly series ordered by date, with unique dates
///
/// Gaps between months are tolerated and never filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<TimeSeriesPoint>,
}

impl Series {
    /// An empty series, used as the explicit "nothing fetched" state
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a series from points in any order.
    ///
    /// Points are sorted ascending; when a month appears twice the first occurrence wins.
    pub fn from_unordered(mut points: Vec<TimeSeriesPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self { points }
    }

    /// Builds a series from points that must already be strictly increasing by date.
    ///
    /// Returns the index of the first offending point otherwise.
    pub fn from_ordered(points: Vec<TimeSeriesPoint>) -> Result<Self, usize> {
        if let Some(i) = points.windows(2).position(|w| w[0].date >= w[1].date) {
            return Err(i + 1);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&TimeSeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimeSeriesPoint> {
        self.points.last()
    }

    /// Values in chronological order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// BLAKE3 digest over every (date, value) pair, in order.
    ///
    /// Two series share a fingerprint iff they hold the same months with bit-identical values.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for point in &self.points {
            hasher.update(point.date.to_string().as_bytes());
            hasher.update(&point.value.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Forecast for a single future month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// First day of the forecast month
    pub date: NaiveDate,
    /// Point estimate
    pub forecast: f64,
    /// Lower interval bound (10% quantile)
    pub lower: f64,
    /// Upper interval bound (90% quantile)
    pub upper: f64,
}

impl ForecastPoint {
    /// Whether the bounds are finite and bracket the point estimate
    pub fn is_well_formed(&self) -> bool {
        self.forecast.is_finite()
            && self.lower.is_finite()
            && self.upper.is_finite()
            && self.lower <= self.forecast
            && self.forecast <= self.upper
    }
}

/// An ordered forecast covering `horizon` consecutive months
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastTable {
    points: Vec<ForecastPoint>,
}

impl ForecastTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks that this table is a well-formed forecast of `series` over `horizon` months:
    /// exactly `horizon` points, dated on the consecutive months right after the series
    /// ends, each with finite, ordered bounds.
    pub fn validate_against(&self, series: &Series, horizon: usize) -> Result<(), String> {
        let last = series
            .last()
            .ok_or_else(|| "cannot validate a forecast of an empty series".to_string())?;

        if self.points.len() != horizon {
            return Err(format!(
                "expected {} forecast points, got {}",
                horizon,
                self.points.len()
            ));
        }

        for (i, point) in self.points.iter().enumerate() {
            let expected = add_months(last.date, i as u32 + 1)
                .ok_or_else(|| "forecast date out of range".to_string())?;
            if point.date != expected {
                return Err(format!(
                    "forecast point {} is dated {}, expected {}",
                    i, point.date, expected
                ));
            }
            if !point.is_well_formed() {
                return Err(format!(
                    "forecast point {} has malformed bounds ({} <= {} <= {})",
                    point.date, point.lower, point.forecast, point.upper
                ));
            }
        }

        Ok(())
    }
}

/// Where a retrieved series came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Loaded from the local series artifact
    Cached,
    /// Fetched from the remote source during this call
    Live,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Cached => write!(f, "Cached"),
            DataSource::Live => write!(f, "Live"),
        }
    }
}
