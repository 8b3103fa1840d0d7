use bevy::prelude::*;

use crate::ai::{AiDecision, DifficultyTier};

// ---------------------------------------------------------------------------
// Kinematics
// ---------------------------------------------------------------------------

/// World position in arena units (one cell is `CELL_SIZE` units).
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(pub Vec2);

/// World units per second.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity(pub Vec2);

/// Facing in radians. For agents this is the last fire angle.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Facing(pub f32);

// ---------------------------------------------------------------------------
// Entity markers
// ---------------------------------------------------------------------------

/// The player-controlled body every agent is hunting.
#[derive(Component, Debug)]
pub struct Opponent;

/// An AI-driven body and its difficulty tier.
#[derive(Component, Debug, Clone, Copy)]
pub struct AiAgent {
    pub tier: DifficultyTier,
}

/// The most recent successful decision. Kept as-is when a tick fails.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Decision(pub AiDecision);

/// Time of the last shot, in simulation milliseconds.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LastShot(pub Option<f64>);

impl LastShot {
    pub fn ready(&self, now_ms: f64, interval_ms: f64) -> bool {
        self.0.is_none_or(|t| now_ms - t >= interval_ms)
    }
}
