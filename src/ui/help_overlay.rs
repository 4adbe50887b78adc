//! Key help drawn over the dashboard

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Dashboard keys and what they do
const KEYS: [(&str, &str); 4] = [
    ("t", "Show / hide raw data"),
    ("↑/k, ↓/j", "Scroll table"),
    ("?", "Toggle this help"),
    ("q, Esc", "Quit"),
];

const OVERLAY_WIDTH: u16 = 52;

/// Renders the key help centered on the frame, clipped to small terminals
pub fn render(frame: &mut Frame) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            "cpiwatch keys",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(KEYS.iter().map(|(key, action)| {
        Line::from(vec![
            Span::styled(format!("  {:<12}", key), Style::default().fg(Color::Yellow)),
            Span::raw(*action),
        ])
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Data refreshes run separately: cpiwatch-refresh",
        dim,
    )));

    let height = lines.len() as u16 + 2;
    let area = overlay_area(frame.area(), OVERLAY_WIDTH, height);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        area,
    );
}

fn overlay_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
