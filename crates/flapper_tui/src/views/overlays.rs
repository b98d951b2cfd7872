use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Shown after the player's agent dies.
pub struct GameOverWidget {
    pub obstacles_passed: u64,
    pub best: u64,
}

impl Widget for GameOverWidget {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let popup = centered(area, 30, 7);
        Clear.render(popup, buf);
        let text = vec![
            Line::styled(
                " Game Over ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Line::from(""),
            Line::from(format!(" Score: {}", self.obstacles_passed)),
            Line::from(format!(" Best:  {}", self.best)),
            Line::from(" [R] Restart  [Q] Quit"),
        ];
        Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .render(popup, buf);
    }
}

pub struct PauseWidget;

impl Widget for PauseWidget {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let popup = centered(area, 20, 3);
        Clear.render(popup, buf);
        Paragraph::new(" Paused [P] ")
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL))
            .render(popup, buf);
    }
}
