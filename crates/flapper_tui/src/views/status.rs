use flapper_core::snapshot::FrameSnapshot;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudMode {
    Human,
    Training,
    Replay,
}

pub struct StatusWidget<'a> {
    pub snapshot: &'a FrameSnapshot,
    pub mode: HudMode,
    pub paused: bool,
    /// Best result of earlier rounds: obstacles passed in human play, fitness otherwise.
    pub best_so_far: Option<f64>,
}

impl<'a> StatusWidget<'a> {
    /// The counters shown on the first line.
    #[must_use]
    pub fn hud_line(&self) -> String {
        let snap = self.snapshot;
        match self.mode {
            HudMode::Human => {
                let mut line = format!("Score: {}", snap.obstacles_passed);
                if let Some(best) = self.best_so_far {
                    line.push_str(&format!("  Best: {best:.0}"));
                }
                line
            }
            HudMode::Training | HudMode::Replay => {
                let mut line = format!(
                    "Gen: {}  Birds Alive: {}  Score: {:.2}",
                    snap.generation.unwrap_or(0),
                    snap.alive,
                    snap.best_score
                );
                if let Some(best) = self.best_so_far {
                    line.push_str(&format!("  Best: {best:.2}"));
                }
                line
            }
        }
    }

    fn legend(&self) -> &'static str {
        match self.mode {
            HudMode::Human => " [Space] Flap | [P] Pause | [R] Restart | [Q] Quit ",
            HudMode::Training => " [P] Pause | [L] Sight lines | [Q] Quit ",
            HudMode::Replay => " [P] Pause | [R] Restart | [Q] Quit ",
        }
    }
}

impl<'a> Widget for StatusWidget<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let lines = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let mut spans = vec![Span::styled(
            self.hud_line(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )];
        spans.push(Span::raw(format!("  Tick: {}", self.snapshot.tick)));
        if self.paused {
            spans.push(Span::styled("  PAUSED", Style::default().fg(Color::Yellow)));
        }
        Paragraph::new(Line::from(spans)).render(lines[0], buf);

        Paragraph::new(self.legend())
            .style(Style::default().fg(Color::DarkGray))
            .render(lines[1], buf);
    }
}
