use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Simulation clock. Advanced by a fixed step each update so a run is
/// reproducible regardless of wall-clock frame timing.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SimClock {
    pub now_ms: f64,
    pub step_ms: f64,
}

impl SimClock {
    pub fn new(step_secs: f32) -> Self {
        Self {
            now_ms: 0.0,
            step_ms: step_secs as f64 * 1000.0,
        }
    }

    pub fn step_secs(&self) -> f32 {
        (self.step_ms / 1000.0) as f32
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(0.1)
    }
}

/// Seeded randomness shared by every agent decision.
#[derive(Resource, Debug, Clone)]
pub struct AgentRng(pub ChaCha8Rng);

impl AgentRng {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Default for AgentRng {
    fn default() -> Self {
        Self::seeded(0)
    }
}

/// Running totals for the current match.
#[derive(Resource, Debug, Clone, Default)]
pub struct MatchStats {
    pub ticks: u32,
    pub decisions: u32,
    pub failed_decisions: u32,
    pub agent_shots: u32,
    pub opponent_shots: u32,
}
