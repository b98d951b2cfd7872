use crate::app::state::App;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const MAX_TICKS_PER_FRAME: u32 = 64;

impl App {
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false
            }
            KeyCode::Char(' ') | KeyCode::Up | KeyCode::Char('w') => {
                if self.game_over().is_some() {
                    self.restart();
                } else {
                    self.pending_flap = true;
                }
            }
            KeyCode::Char('p') => self.paused = !self.paused,
            KeyCode::Char('r') | KeyCode::Enter => self.restart(),
            KeyCode::Char('l') => self.show_sight_lines = !self.show_sight_lines,
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.ticks_per_frame = (self.ticks_per_frame * 2).min(MAX_TICKS_PER_FRAME)
            }
            KeyCode::Char('-') | KeyCode::Char('_') => {
                self.ticks_per_frame = (self.ticks_per_frame / 2).max(1)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapper_core::config::AppConfig;
    use flapper_core::telemetry::NullTelemetry;
    use std::sync::Arc;

    fn human_app() -> App {
        let mut config = AppConfig::default();
        config.seed = Some(3);
        App::new_human(config, Arc::new(NullTelemetry)).expect("human app")
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_space_queues_a_flap_once() {
        let mut app = human_app();
        press(&mut app, KeyCode::Char(' '));
        assert!(app.take_input().flap_held);
        assert!(!app.take_input().flap_held);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = human_app();
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);

        let mut app = human_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.running);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut app = human_app();
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.ticks_per_frame, 1);
        for _ in 0..10 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(app.ticks_per_frame, MAX_TICKS_PER_FRAME);
    }

    #[test]
    fn test_toggles() {
        let mut app = human_app();
        press(&mut app, KeyCode::Char('p'));
        press(&mut app, KeyCode::Char('l'));
        assert!(app.paused);
        assert!(!app.show_sight_lines);
    }
}
