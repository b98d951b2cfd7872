use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::{Block, Borders, Widget};

use flapper_core::snapshot::{FrameSnapshot, SightLines};

const AGENT_SYMBOL: &str = "●";
const LEADER_SYMBOL: &str = "◉";
const OBSTACLE_SYMBOL: &str = "█";
const SIGHT_SYMBOL: &str = "·";

/// Draws the play-field scaled down to the terminal cell grid.
pub struct PlayfieldWidget<'a> {
    snapshot: &'a FrameSnapshot,
    show_sight_lines: bool,
}

impl<'a> PlayfieldWidget<'a> {
    pub fn new(snapshot: &'a FrameSnapshot) -> Self {
        Self {
            snapshot,
            show_sight_lines: true,
        }
    }

    #[must_use]
    pub fn sight_lines(mut self, show: bool) -> Self {
        self.show_sight_lines = show;
        self
    }

    pub fn inner_area(area: Rect) -> Rect {
        Block::default().borders(Borders::ALL).inner(area)
    }

    /// Maps a field position onto a cell of `inner`, `None` when off-field.
    pub fn field_to_cell(
        x: f64,
        y: f64,
        inner: Rect,
        field_width: f64,
        field_height: f64,
    ) -> Option<(u16, u16)> {
        if inner.width == 0 || inner.height == 0 {
            return None;
        }
        if !(0.0..field_width).contains(&x) || !(0.0..field_height).contains(&y) {
            return None;
        }
        let col = ((x / field_width) * f64::from(inner.width)).floor() as u16;
        let row = ((y / field_height) * f64::from(inner.height)).floor() as u16;
        Some((
            inner.x + col.min(inner.width - 1),
            inner.y + row.min(inner.height - 1),
        ))
    }

    /// Cell columns covered by the horizontal span `[x0, x1)`, clipped to `inner`.
    pub fn column_span(x0: f64, x1: f64, inner: Rect, field_width: f64) -> Option<(u16, u16)> {
        let scale = f64::from(inner.width) / field_width;
        let start = (x0 * scale).floor().max(0.0);
        let end = (x1 * scale).ceil().min(f64::from(inner.width));
        if end <= start {
            return None;
        }
        Some((inner.x + start as u16, inner.x + end as u16))
    }

    fn draw_obstacles(&self, inner: Rect, buf: &mut Buffer) {
        let snap = self.snapshot;
        let row_height = snap.field_height / f64::from(inner.height);

        for pair in &snap.obstacles {
            let Some((c0, c1)) =
                Self::column_span(pair.x, pair.trailing_edge(), inner, snap.field_width)
            else {
                continue;
            };
            for row in 0..inner.height {
                let y = (f64::from(row) + 0.5) * row_height;
                if y >= pair.gap_top() && y <= pair.gap_bottom() {
                    continue;
                }
                for col in c0..c1 {
                    if let Some(cell) = buf.cell_mut((col, inner.y + row)) {
                        cell.set_symbol(OBSTACLE_SYMBOL);
                        cell.set_fg(Color::Green);
                    }
                }
            }
        }
    }

    fn draw_sight_lines(&self, sight: &SightLines, inner: Rect, buf: &mut Buffer) {
        let snap = self.snapshot;
        let to_cell = |(x, y): (f64, f64)| {
            Self::field_to_cell(x, y, inner, snap.field_width, snap.field_height)
        };
        let Some(origin) = to_cell(sight.origin) else {
            return;
        };
        for target in [sight.gap_top, sight.gap_bottom] {
            if let Some(end) = to_cell(target) {
                for (x, y) in line_cells(origin, end) {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        if cell.symbol() == " " {
                            cell.set_symbol(SIGHT_SYMBOL);
                            cell.set_fg(Color::Red);
                        }
                    }
                }
            }
        }
    }

    fn draw_agents(&self, inner: Rect, buf: &mut Buffer) {
        let snap = self.snapshot;
        let leader = snap
            .live_agents()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|a| a.index);

        for agent in snap.live_agents() {
            let (x, y) = (agent.body.center_x(), agent.body.center_y());
            if let Some(pos) = Self::field_to_cell(x, y, inner, snap.field_width, snap.field_height)
            {
                if let Some(cell) = buf.cell_mut(pos) {
                    if Some(agent.index) == leader {
                        cell.set_symbol(LEADER_SYMBOL);
                        cell.set_fg(Color::LightYellow);
                    } else {
                        cell.set_symbol(AGENT_SYMBOL);
                        cell.set_fg(Color::Yellow);
                    }
                }
            }
        }
    }
}

impl<'a> Widget for PlayfieldWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Block::default()
            .title(format!(" Field (Tick: {}) ", self.snapshot.tick))
            .borders(Borders::ALL)
            .render(area, buf);

        let inner = Self::inner_area(area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        self.draw_obstacles(inner, buf);
        if self.show_sight_lines {
            if let Some(sight) = &self.snapshot.sight {
                self.draw_sight_lines(sight, inner, buf);
            }
        }
        self.draw_agents(inner, buf);
    }
}

/// Bresenham cells from `from` to `to`, excluding `from` itself.
fn line_cells(from: (u16, u16), to: (u16, u16)) -> Vec<(u16, u16)> {
    let (mut x0, mut y0) = (i32::from(from.0), i32::from(from.1));
    let (x1, y1) = (i32::from(to.0), i32::from(to.1));
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut cells = Vec::new();

    while x0 != x1 || y0 != y1 {
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
        cells.push((x0 as u16, y0 as u16));
    }
    cells
}
