//! Decision Source: who decides whether an agent flaps this tick.
//!
//! Both variants answer the same question from the same context, so a single
//! Simulation Step serves human play, training and replay.

use flapper_data::{Activations, Agent, Genome, Observation};
use flapper_neat::GenomeLogic;

/// Input devices sampled once per tick by the frontend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    /// The flap key is currently held down.
    pub flap_held: bool,
}

pub struct DecisionContext<'a> {
    pub agent: &'a Agent,
    pub observation: &'a Observation,
    pub input: &'a InputState,
}

pub trait DecisionSource {
    /// Returns true to request a flap on this tick.
    fn decide(&mut self, ctx: &DecisionContext<'_>) -> bool;
}

/// Flaps on the tick the flap key goes from released to pressed.
///
/// Holding the key does not repeat, and a press during cooldown is dropped
/// rather than queued.
#[derive(Debug, Clone, Default)]
pub struct HumanInput {
    was_held: bool,
}

impl HumanInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionSource for HumanInput {
    fn decide(&mut self, ctx: &DecisionContext<'_>) -> bool {
        let pressed = ctx.input.flap_held && !self.was_held;
        self.was_held = ctx.input.flap_held;
        pressed && ctx.agent.flap_cooldown == 0
    }
}

/// An evolved network. Flaps when output 0 is the largest output.
#[derive(Debug, Clone)]
pub struct NeuralPolicy {
    genome: Genome,
    activations: Activations,
    outputs: Vec<f32>,
}

impl NeuralPolicy {
    #[must_use]
    pub fn new(genome: Genome) -> Self {
        let outputs = Vec::with_capacity(genome.output_count());
        Self {
            genome,
            activations: Activations::default(),
            outputs,
        }
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// Outputs of the most recent decision.
    #[must_use]
    pub fn last_outputs(&self) -> &[f32] {
        &self.outputs
    }
}

impl DecisionSource for NeuralPolicy {
    fn decide(&mut self, ctx: &DecisionContext<'_>) -> bool {
        self.genome.forward_internal(
            &ctx.observation.to_inputs(),
            &mut self.activations,
            &mut self.outputs,
        );
        flap_from_outputs(&self.outputs)
    }
}

/// Index-of-max encoding: flap iff the first maximal output is index 0.
/// NaN outputs never win; an empty slice never flaps.
#[must_use]
pub fn flap_from_outputs(outputs: &[f32]) -> bool {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in outputs.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if b >= value => {}
            _ => best = Some((i, value)),
        }
    }
    matches!(best, Some((0, _)))
}

/// Never flaps. Useful for baselines and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFlap;

impl DecisionSource for NeverFlap {
    fn decide(&mut self, _ctx: &DecisionContext<'_>) -> bool {
        false
    }
}
