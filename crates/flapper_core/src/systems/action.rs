//! Simulation Step for a single agent.

use crate::config::AppConfig;
use crate::lifecycle::retire_agent;
use flapper_data::{Agent, ObstaclePair};

/// Physics constants applied every tick, copied out of [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub gravity: f64,
    pub max_fall_speed: f64,
    pub jump_speed: f64,
    pub flap_cooldown_frames: u32,
    pub per_tick_increment: f64,
    pub field_height: f64,
}

impl Kinematics {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gravity: config.agent.gravity,
            max_fall_speed: config.agent.max_fall_speed,
            jump_speed: config.agent.jump_speed,
            flap_cooldown_frames: config.agent.flap_cooldown_frames,
            per_tick_increment: config.scoring.per_tick_increment,
            field_height: config.field.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Survived,
    /// Collided or left the field on this tick.
    Died,
    /// Was already dead; nothing changed.
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// A flap was requested and accepted.
    pub flapped: bool,
    pub outcome: StepOutcome,
}

/// Advances one live agent by one tick.
///
/// An accepted flap sets the velocity to `jump_speed` and the cooldown to
/// `flap_cooldown_frames`; neither is touched again on that tick. Otherwise
/// gravity accelerates the agent up to `max_fall_speed` and a positive
/// cooldown counts down. After moving, the agent dies on any obstacle overlap
/// or when it leaves the field; only survivors earn the per-tick increment.
pub fn step_agent(
    agent: &mut Agent,
    flap: bool,
    obstacles: &[ObstaclePair],
    kinematics: &Kinematics,
) -> StepResult {
    if !agent.is_alive() {
        return StepResult {
            flapped: false,
            outcome: StepOutcome::Inactive,
        };
    }

    let flapped = flap && agent.flap_cooldown == 0;
    if flapped {
        agent.velocity = kinematics.jump_speed;
        agent.flap_cooldown = kinematics.flap_cooldown_frames;
    } else {
        agent.velocity = (agent.velocity + kinematics.gravity).min(kinematics.max_fall_speed);
    }

    agent.body.translate(0.0, agent.velocity);

    if !flapped && agent.flap_cooldown > 0 {
        agent.flap_cooldown -= 1;
    }

    let collided = obstacles.iter().any(|pair| pair.intersects(&agent.body))
        || agent.body.is_out_of_bounds(kinematics.field_height);
    if collided {
        retire_agent(agent);
        return StepResult {
            flapped,
            outcome: StepOutcome::Died,
        };
    }

    agent.score += kinematics.per_tick_increment;
    agent.ticks_alive += 1;
    StepResult {
        flapped,
        outcome: StepOutcome::Survived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::spawn_agent;

    fn setup() -> (Agent, Kinematics) {
        let config = AppConfig::default();
        (spawn_agent(&config), Kinematics::new(&config))
    }

    #[test]
    fn test_gravity_without_flap() {
        let (mut agent, k) = setup();
        let y0 = agent.body.y;
        let result = step_agent(&mut agent, false, &[], &k);

        assert_eq!(result.outcome, StepOutcome::Survived);
        assert!(!result.flapped);
        assert_eq!(agent.velocity, k.gravity);
        assert_eq!(agent.body.y, y0 + k.gravity);
        assert_eq!(agent.score, k.per_tick_increment);
        assert_eq!(agent.ticks_alive, 1);
    }

    #[test]
    fn test_velocity_clamped_to_max_fall_speed() {
        let (mut agent, k) = setup();
        agent.velocity = k.max_fall_speed - 0.1;
        step_agent(&mut agent, false, &[], &k);
        assert_eq!(agent.velocity, k.max_fall_speed);
        step_agent(&mut agent, false, &[], &k);
        assert_eq!(agent.velocity, k.max_fall_speed);
    }

    #[test]
    fn test_flap_then_cooldown_blocks() {
        let (mut agent, k) = setup();
        let first = step_agent(&mut agent, true, &[], &k);
        assert!(first.flapped);
        assert_eq!(agent.velocity, k.jump_speed);
        assert_eq!(agent.flap_cooldown, k.flap_cooldown_frames);

        let second = step_agent(&mut agent, true, &[], &k);
        assert!(!second.flapped);
        assert_eq!(agent.velocity, k.jump_speed + k.gravity);
        assert_eq!(agent.flap_cooldown, k.flap_cooldown_frames - 1);
    }

    #[test]
    fn test_cooldown_expires() {
        let (mut agent, k) = setup();
        step_agent(&mut agent, true, &[], &k);
        for _ in 0..k.flap_cooldown_frames {
            assert!(!step_agent(&mut agent, true, &[], &k).flapped);
        }
        assert_eq!(agent.flap_cooldown, 0);
        assert!(step_agent(&mut agent, true, &[], &k).flapped);
    }

    #[test]
    fn test_collision_freezes_score() {
        let (mut agent, k) = setup();
        step_agent(&mut agent, false, &[], &k);
        let score = agent.score;

        let pair = ObstaclePair {
            id: 0,
            x: agent.body.x - 10.0,
            width: 60.0,
            top_height: 400.0,
            bottom_height: 50.0,
            field_height: k.field_height,
            passed: false,
        };
        let result = step_agent(&mut agent, false, std::slice::from_ref(&pair), &k);
        assert_eq!(result.outcome, StepOutcome::Died);
        assert!(!agent.is_alive());
        assert_eq!(agent.score, score);

        let after = step_agent(&mut agent, true, &[], &k);
        assert_eq!(after.outcome, StepOutcome::Inactive);
        assert_eq!(agent.score, score);
    }

    #[test]
    fn test_floor_kills() {
        let (mut agent, k) = setup();
        agent.body.y = k.field_height - agent.body.height - 0.1;
        let result = step_agent(&mut agent, false, &[], &k);
        assert_eq!(result.outcome, StepOutcome::Died);
    }

    #[test]
    fn test_ceiling_kills() {
        let (mut agent, k) = setup();
        agent.body.y = 1.0;
        let result = step_agent(&mut agent, true, &[], &k);
        assert!(result.flapped);
        assert_eq!(result.outcome, StepOutcome::Died);
    }
}
