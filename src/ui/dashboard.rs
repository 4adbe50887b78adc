//! Dashboard screen rendering
//!
//! Renders the headline metrics, the CPI chart with its forecast and interval, the
//! optional raw-data table and a status line. An empty series gets its own error
//! screen instead of an empty chart.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap},
    Frame,
};

use super::data_table;
use super::widgets::TrendSparkline;
use crate::app::App;
use crate::present::{date_from_ordinal, ChartPoint};
use crate::refresh::Outcome;

/// Months shown in the header sparkline
const SPARKLINE_MONTHS: usize = 36;

/// Number of labels on the time axis
const X_LABELS: usize = 5;

const HISTORICAL_COLOR: Color = Color::Cyan;
const FORECAST_COLOR: Color = Color::Yellow;
const INTERVAL_COLOR: Color = Color::DarkGray;

/// Renders the dashboard for a loaded snapshot
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(6),    // Chart / table
            Constraint::Length(1), // Status line
        ])
        .split(area);

    if app.outcome() == Some(Outcome::NoData) {
        render_title(frame, chunks[0]);
        render_no_data(frame, app, chunks[1]);
    } else {
        render_header(frame, app, chunks[0]);
        render_body(frame, app, chunks[1]);
    }
    render_status(frame, app, chunks[2]);
}

fn title_span() -> Span<'static> {
    Span::styled(
        "TURKEY CPI",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_title(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        title_span(),
        Span::styled("  year-over-year %", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Renders the title, headline metrics and recent-trend sparkline
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let separator = "─".repeat((area.width as usize).saturating_sub(2));

    let mut lines = vec![Line::from(vec![
        title_span(),
        Span::styled("  year-over-year %", Style::default().fg(Color::DarkGray)),
    ])];

    if let Some(headline) = &app.headline {
        lines.push(Line::from(vec![
            Span::styled("Latest: ", Style::default().fg(Color::White)),
            Span::styled(
                headline.latest_month.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                headline.latest_value.clone(),
                Style::default()
                    .fg(FORECAST_COLOR)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("Source: {}", headline.source),
                Style::default().fg(Color::Gray),
            ),
        ]));
    }
    lines.push(Line::from(Span::styled(
        separator,
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Paragraph::new(lines), area);

    // Sparkline on the title row, right-aligned
    let width = (SPARKLINE_MONTHS as u16).min(area.width / 3);
    if width > 0 {
        let spark_area = Rect::new(area.x + area.width - width, area.y, width, 1);
        let recent: Vec<f64> = app.traces.historical.iter().map(|p| p.value).collect();
        frame.render_widget(TrendSparkline::new(&recent), spark_area);
    }
}

/// Renders the chart, and the table next to it when expanded
fn render_body(frame: &mut Frame, app: &App, area: Rect) {
    if app.show_table {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        render_chart(frame, app, chunks[0]);
        data_table::render(frame, app, chunks[1]);
    } else {
        render_chart(frame, app, area);
    }
}

fn xy(points: &[ChartPoint]) -> Vec<(f64, f64)> {
    points.iter().map(ChartPoint::xy).collect()
}

fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let traces = &app.traces;
    let historical = xy(&traces.historical);
    let forecast = xy(&traces.forecast);
    let interval = xy(&traces.interval);

    let mut datasets = Vec::with_capacity(3);
    if !interval.is_empty() {
        datasets.push(
            Dataset::default()
                .name("80% interval")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(INTERVAL_COLOR))
                .data(&interval),
        );
    }
    datasets.push(
        Dataset::default()
            .name("Historical")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(HISTORICAL_COLOR))
            .data(&historical),
    );
    if !forecast.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Forecast")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(FORECAST_COLOR))
                .data(&forecast),
        );
    }

    let (x_min, x_max) = traces.date_bounds().unwrap_or((0.0, 1.0));
    let (y_min, y_max) = padded(traces.value_bounds().unwrap_or((0.0, 1.0)));

    let title = if app.outcome() == Some(Outcome::HistoryOnly) {
        Line::from(vec![
            Span::raw(" CPI YoY % "),
            Span::styled(
                "(forecast unavailable) ",
                Style::default().fg(Color::Red),
            ),
        ])
    } else {
        Line::from(" CPI YoY % with 10-year forecast ")
    };

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, x_max])
                .labels(x_labels(x_min, x_max)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{:.0}", y_min)),
                    Span::raw(format!("{:.0}", (y_min + y_max) / 2.0)),
                    Span::raw(format!("{:.0}", y_max)),
                ]),
        );

    frame.render_widget(chart, area);
}

/// Adds 5% headroom above and below, and widens a flat range
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    let span = hi - lo;
    if span <= f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - span * 0.05, hi + span * 0.05)
}

/// Evenly spaced year labels between the first and last month
fn x_labels(x_min: f64, x_max: f64) -> Vec<Span<'static>> {
    (0..X_LABELS)
        .map(|i| {
            let x = x_min + (x_max - x_min) * i as f64 / (X_LABELS - 1) as f64;
            let label = date_from_ordinal(x)
                .map(|d| d.format("%Y").to_string())
                .unwrap_or_default();
            Span::raw(label)
        })
        .collect()
}

/// Renders the explicit error state for an empty series
fn render_no_data(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "No CPI data available",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("No stored series was found and the live source returned nothing."),
        Line::from("Run cpiwatch-refresh --force once the source is reachable."),
    ];

    if let Some(snapshot) = &app.snapshot {
        if !snapshot.issues.is_empty() {
            lines.push(Line::from(""));
            for issue in &snapshot.issues {
                lines.push(Line::from(Span::styled(
                    issue.to_string(),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Error "))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Renders key hints, the first non-fatal issue and data freshness
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("t", Style::default().fg(Color::Yellow)),
        Span::raw(" Table  "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Scroll  "),
        Span::styled("?", Style::default().fg(Color::Yellow)),
        Span::raw(" Help  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ];

    let issues = app
        .snapshot
        .as_ref()
        .map(|s| s.issues.as_slice())
        .unwrap_or_default();
    if let Some(first) = issues.first() {
        let more = if issues.len() > 1 {
            format!(" (+{} more)", issues.len() - 1)
        } else {
            String::new()
        };
        spans.push(Span::styled(
            format!(" │ ⚠ {}{}", first, more),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(loaded_at) = app.loaded_at {
        spans.push(Span::styled(
            format!(" │ Loaded {}", loaded_at.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
