//! Agent Controller: what an agent can see of the obstacles ahead.

use flapper_data::{Agent, ObstaclePair, Observation};

/// The pair with the smallest non-negative distance from the agent's leading
/// edge to the pair's leading edge. Pairs already reached or behind the agent
/// are ignored. Ties go to the earliest pair in `obstacles`.
#[must_use]
pub fn nearest_obstacle<'a>(agent: &Agent, obstacles: &'a [ObstaclePair]) -> Option<&'a ObstaclePair> {
    let edge = agent.leading_edge();
    let mut nearest: Option<(&ObstaclePair, f64)> = None;
    for pair in obstacles {
        let distance = pair.leading_edge() - edge;
        if distance < 0.0 {
            continue;
        }
        match nearest {
            Some((_, best)) if best <= distance => {}
            _ => nearest = Some((pair, distance)),
        }
    }
    nearest.map(|(pair, _)| pair)
}

/// Distance and vertical clearances to `nearest`, or the `field_width`
/// sentinel in every slot when nothing lies ahead.
#[must_use]
pub fn observation(agent: &Agent, nearest: Option<&ObstaclePair>, field_width: f64) -> Observation {
    match nearest {
        Some(pair) => Observation {
            distance: pair.leading_edge() - agent.leading_edge(),
            clearance_above: agent.body.top() - pair.gap_top(),
            clearance_below: pair.gap_bottom() - agent.body.bottom(),
        },
        None => Observation::sentinel(field_width),
    }
}

/// Shorthand for `observation(agent, nearest_obstacle(agent, obstacles), field_width)`.
#[must_use]
pub fn observe(agent: &Agent, obstacles: &[ObstaclePair], field_width: f64) -> Observation {
    observation(agent, nearest_obstacle(agent, obstacles), field_width)
}
