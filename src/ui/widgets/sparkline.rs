//! Inline sparkline of the most recent CPI readings

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Block characters for different value levels (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A one-row sparkline scaled between the smallest and largest value shown.
///
/// When there are more values than columns, the most recent ones are kept.
pub struct TrendSparkline<'a> {
    values: &'a [f64],
    /// Style for the sparkline
    style: Style,
    /// Style for the latest value
    latest_style: Style,
}

impl<'a> TrendSparkline<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Self {
            values,
            style: Style::default().fg(Color::Cyan),
            latest_style: Style::default().fg(Color::Yellow),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    fn value_to_block(value: f64, min: f64, max: f64) -> char {
        let span = max - min;
        let normalized = if span > f64::EPSILON {
            ((value - min) / span).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let index = ((normalized * 7.0).round() as usize).min(7);
        BLOCKS[index]
    }
}

impl<'a> Widget for TrendSparkline<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.values.is_empty() {
            return;
        }

        let width = area.width as usize;
        let visible = &self.values[self.values.len().saturating_sub(width)..];
        let min = visible.iter().copied().fold(f64::INFINITY, f64::min);
        let max = visible.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        for (i, value) in visible.iter().enumerate() {
            let block = Self::value_to_block(*value, min, max);
            let x = area.x + i as u16;
            let style = if i + 1 == visible.len() {
                self.latest_style
            } else {
                self.style
            };

            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(block).set_style(style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(values: &[f64], width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        TrendSparkline::new(values).render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_minimum_and_maximum_blocks() {
        assert_eq!(TrendSparkline::value_to_block(10.0, 10.0, 80.0), '▁');
        assert_eq!(TrendSparkline::value_to_block(80.0, 10.0, 80.0), '█');
    }

    #[test]
    fn test_flat_values_use_middle_block() {
        let block = TrendSparkline::value_to_block(5.0, 5.0, 5.0);
        assert!(BLOCKS[3..=4].contains(&block));
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(TrendSparkline::value_to_block(-1.0, 0.0, 1.0), '▁');
        assert_eq!(TrendSparkline::value_to_block(9.0, 0.0, 1.0), '█');
    }

    #[test]
    fn test_render_scales_to_visible_values() {
        assert_eq!(rendered(&[1.0, 2.0, 3.0], 3), "▁▅█");
    }

    #[test]
    fn test_render_keeps_most_recent_values() {
        // Only the last two values fit; 100.0 must not affect scaling
        assert_eq!(rendered(&[100.0, 1.0, 2.0], 2), "▁█");
    }

    #[test]
    fn test_render_empty_is_blank() {
        assert_eq!(rendered(&[], 4), "    ");
    }
}
