//! Raw-data table: observations newest-first, then forecast months

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Row, Table},
    Frame,
};

use crate::app::App;
use crate::present::RowKind;

const HEADER: [&str; 4] = ["Month", "YoY %", "Lower", "Upper"];

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = app
        .rows
        .iter()
        .skip(app.table_scroll)
        .map(|row| {
            let style = match row.kind {
                RowKind::Historical => Style::default().fg(Color::White),
                RowKind::Forecast => Style::default().fg(Color::Yellow),
            };
            Row::new(row.cells()).style(style)
        })
        .collect();

    let header = Row::new(HEADER).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let title = format!(
        " Raw data {}/{} ",
        (app.table_scroll + 1).min(app.rows.len()),
        app.rows.len()
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL));

    frame.render_widget(table, area);
}
