//! Presentation adapter
//!
//! Pure transformations from a series and its forecast into what the dashboard
//! draws: chart traces, raw-data table rows and headline metrics. Nothing here
//! touches the terminal, so all of it is unit tested.

use chrono::{Datelike, NaiveDate};

use crate::data::{DataSource, ForecastTable, Series};

/// One plotted point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl ChartPoint {
    /// Chart coordinates: x is the month ordinal, y the value
    pub fn xy(&self) -> (f64, f64) {
        (month_ordinal(self.date), self.value)
    }
}

/// Months since year 0, so consecutive months are one unit apart on the x axis
pub fn month_ordinal(date: NaiveDate) -> f64 {
    f64::from(date.year()) * 12.0 + f64::from(date.month0())
}

/// Inverse of [`month_ordinal`] for axis labels
pub fn date_from_ordinal(x: f64) -> Option<NaiveDate> {
    let ordinal = x.round() as i64;
    let year = i32::try_from(ordinal.div_euclid(12)).ok()?;
    let month = u32::try_from(ordinal.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// The three chart traces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traces {
    /// Historical series, chronological
    pub historical: Vec<ChartPoint>,
    /// Forecast points strictly after the last historical date
    pub forecast: Vec<ChartPoint>,
    /// Closed outline of the interval: upper bounds forward, then lower bounds reversed
    pub interval: Vec<ChartPoint>,
}

impl Traces {
    /// Smallest and largest y across all traces
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        self.historical
            .iter()
            .chain(&self.forecast)
            .chain(&self.interval)
            .map(|p| p.value)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// First and last x across all traces
    pub fn date_bounds(&self) -> Option<(f64, f64)> {
        let first = self.historical.first().or(self.forecast.first())?;
        let last = self.forecast.last().or(self.historical.last())?;
        Some((first.xy().0, last.xy().0))
    }
}

pub fn build_traces(series: &Series, forecast: &ForecastTable) -> Traces {
    let historical: Vec<ChartPoint> = series
        .points()
        .iter()
        .map(|p| ChartPoint {
            date: p.date,
            value: p.value,
        })
        .collect();

    let cutoff = series.last().map(|p| p.date);
    let future: Vec<_> = forecast
        .points()
        .iter()
        .filter(|p| cutoff.map_or(true, |last| p.date > last))
        .collect();

    let forecast_trace = future
        .iter()
        .map(|p| ChartPoint {
            date: p.date,
            value: p.forecast,
        })
        .collect();

    let upper = future.iter().map(|p| ChartPoint {
        date: p.date,
        value: p.upper,
    });
    let lower = future.iter().rev().map(|p| ChartPoint {
        date: p.date,
        value: p.lower,
    });
    let interval = upper.chain(lower).collect();

    Traces {
        historical,
        forecast: forecast_trace,
        interval,
    }
}

/// Whether a table row is observed or forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Historical,
    Forecast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub kind: RowKind,
    pub date: NaiveDate,
    pub value: f64,
    /// Interval bounds, forecast rows only
    pub bounds: Option<(f64, f64)>,
}

impl TableRow {
    /// Cells as displayed: date, value, lower, upper
    pub fn cells(&self) -> [String; 4] {
        let (lower, upper) = match self.bounds {
            Some((lo, hi)) => (format!("{:.2}", lo), format!("{:.2}", hi)),
            None => (String::new(), String::new()),
        };
        [
            self.date.format("%Y-%m").to_string(),
            format!("{:.2}", self.value),
            lower,
            upper,
        ]
    }
}

/// Raw-data rows: historical newest-first, then forecast ascending
pub fn table_rows(series: &Series, forecast: &ForecastTable) -> Vec<TableRow> {
    let historical = series.points().iter().rev().map(|p| TableRow {
        kind: RowKind::Historical,
        date: p.date,
        value: p.value,
        bounds: None,
    });
    let future = forecast.points().iter().map(|p| TableRow {
        kind: RowKind::Forecast,
        date: p.date,
        value: p.forecast,
        bounds: Some((p.lower, p.upper)),
    });
    historical.chain(future).collect()
}

/// Values shown above the chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    /// Latest observed month, e.g. "March 2025"
    pub latest_month: String,
    /// Latest observed value, e.g. "38.10%"
    pub latest_value: String,
    /// "Cached" or "Live"
    pub source: String,
}

/// Headline metrics, or `None` for an empty series
pub fn headline(series: &Series, source: DataSource) -> Option<Headline> {
    let latest = series.last()?;
    Some(Headline {
        latest_month: latest.date.format("%B %Y").to_string(),
        latest_value: format!("{:.2}%", latest.value),
        source: source.to_string(),
    })
}
