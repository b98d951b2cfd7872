use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Sparkline, Widget};

/// Best and mean fitness per generation, side by side.
pub struct FitnessSparklines<'a> {
    pub best: &'a [u64],
    pub mean: &'a [u64],
}

impl<'a> FitnessSparklines<'a> {
    /// Sparklines take integers; fitness is scaled to hundredths.
    #[must_use]
    pub fn scale(history: &[f64]) -> Vec<u64> {
        history
            .iter()
            .map(|f| (f.max(0.0) * 100.0).round() as u64)
            .collect()
    }
}

impl<'a> Widget for FitnessSparklines<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        // Show the most recent generations that fit.
        let tail = |data: &'a [u64], width: u16| {
            let keep = usize::from(width).min(data.len());
            &data[data.len() - keep..]
        };

        Sparkline::default()
            .block(Block::default().title(" Best fitness "))
            .data(tail(self.best, halves[0].width))
            .style(Style::default().fg(Color::Green))
            .render(halves[0], buf);

        Sparkline::default()
            .block(Block::default().title(" Mean fitness "))
            .data(tail(self.mean, halves[1].width))
            .style(Style::default().fg(Color::Cyan))
            .render(halves[1], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_clamps_and_rounds() {
        assert_eq!(FitnessSparklines::scale(&[0.014, 1.5, -2.0]), vec![1, 150, 0]);
    }
}
