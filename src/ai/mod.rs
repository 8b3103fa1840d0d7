//! Opponent AI. Each difficulty tier has its own decider; [`decide`] is the
//! single per-tick entry point.

pub mod agent;
pub mod aim;
pub mod behavior;
pub mod elite;
pub mod memory;
pub mod novice;
pub mod search;
pub mod steering;
pub mod threat;
pub mod veteran;

use bevy::prelude::*;
use rand::Rng;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grid::ArenaGrid;
use agent::AgentState;
use memory::ShotEvent;
use search::next_waypoint;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    /// Uniform-cost search, flees when close.
    Novice,
    /// A*, physics aim, closes in when near.
    Veteran,
    /// Memory, threat assessment and the behavior state machine.
    #[default]
    Elite,
}

impl DifficultyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Novice => "novice",
            Self::Veteran => "veteran",
            Self::Elite => "elite",
        }
    }
}

/// Position, velocity and facing of a body as the host sees it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
}

/// What the host tells the engine each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    pub opponent_pos: Vec2,
    pub opponent_vel: Vec2,
    pub shot: Option<ShotEvent>,
    pub me: Kinematics,
    pub now_ms: f64,
}

/// One tick's output. The host applies `movement * speed` as velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AiDecision {
    pub speed: f32,
    /// Radians.
    pub fire_angle: f32,
    /// Unit vector, or zero.
    pub movement: Vec2,
    pub should_fire: bool,
}

/// Decide one agent's move for this tick. Call exactly once per tick per
/// agent: the elite tier folds the observation into the agent's memory.
pub fn decide<R: Rng + ?Sized>(
    grid: &ArenaGrid,
    tier: DifficultyTier,
    input: &TickInput,
    agent: &mut AgentState,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<AiDecision, EngineError> {
    for p in [input.me.position, input.opponent_pos] {
        if !grid.contains_world(p) {
            return Err(EngineError::OutOfBounds { x: p.x, y: p.y });
        }
    }

    let decision = match tier {
        DifficultyTier::Novice => novice::decide(grid, input, config, rng)?,
        DifficultyTier::Veteran => veteran::decide(grid, input, config)?,
        DifficultyTier::Elite => elite::decide(grid, input, agent, config, rng)?,
    };

    Ok(AiDecision {
        should_fire: grid.line_of_sight(input.me.position, input.opponent_pos),
        ..decision
    })
}

/// Heading toward the next waypoint, or straight at `fallback` when there is
/// no path to follow.
pub fn path_direction(path: &[Vec2], me: Vec2, fallback: Vec2) -> Vec2 {
    match next_waypoint(path, me) {
        Some(waypoint) => waypoint - me,
        None => fallback - me,
    }
}
