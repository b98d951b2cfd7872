use crate::config::AppConfig;
use flapper_data::{Agent, AgentState, Rect};

/// Creates a live agent at rest in the centre of the field.
#[must_use]
pub fn spawn_agent(config: &AppConfig) -> Agent {
    let body = Rect::centered(
        config.field.width / 2.0,
        config.field.height / 2.0,
        config.agent.width,
        config.agent.height,
    );
    Agent::new(body)
}

/// Retires an agent. Its score stays at whatever it was before the call.
pub fn retire_agent(agent: &mut Agent) {
    agent.state = AgentState::Dead;
    agent.velocity = 0.0;
    agent.flap_cooldown = 0;
}
