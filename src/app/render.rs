use crate::app::state::{App, Session};
use flapper_tui::{FitnessSparklines, GameOverWidget, HudMode, PauseWidget, PlayfieldWidget, StatusWidget};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

impl App {
    fn hud_mode(&self) -> HudMode {
        match self.session {
            Session::Human { .. } => HudMode::Human,
            Session::Watch { .. } => HudMode::Training,
            Session::Replay { .. } => HudMode::Replay,
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let snapshot = match &self.latest_snapshot {
            Some(s) => s,
            None => return,
        };
        let mode = self.hud_mode();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Status
                if mode == HudMode::Training {
                    Constraint::Length(4)
                } else {
                    Constraint::Length(0)
                },
                Constraint::Min(0), // Field
            ])
            .split(f.area());

        f.render_widget(
            StatusWidget {
                snapshot,
                mode,
                paused: self.paused,
                best_so_far: self.best_so_far,
            },
            layout[0],
        );

        if mode == HudMode::Training {
            f.render_widget(
                FitnessSparklines {
                    best: &self.best_fitness_history,
                    mean: &self.mean_fitness_history,
                },
                layout[1],
            );
        }

        let field = layout[2];
        f.render_widget(
            PlayfieldWidget::new(snapshot).sight_lines(self.show_sight_lines),
            field,
        );

        if let Some(obstacles_passed) = self.game_over() {
            f.render_widget(
                GameOverWidget {
                    obstacles_passed,
                    best: self.best_obstacles_passed,
                },
                field,
            );
        } else if self.training_finished() {
            render_notice(f, field, " Training finished. [Q] Quit ");
        } else if self.paused {
            f.render_widget(PauseWidget, field);
        }
    }
}

fn render_notice(f: &mut Frame, area: Rect, text: &str) {
    let width = (text.chars().count() as u16 + 2).min(area.width);
    let height = 3.min(area.height);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL)),
        popup,
    );
}
