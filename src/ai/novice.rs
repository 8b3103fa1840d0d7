//! Novice tier: uniform-cost search toward the opponent, backs off when
//! close, and shoots with a little jitter.

use bevy::prelude::*;
use micromegas_tracing::prelude::span_scope;
use rand::Rng;

use super::search::uniform_cost_path;
use super::steering::{wall_aware_velocity, wall_repulsion};
use super::{path_direction, AiDecision, TickInput};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grid::{to_world_center, ArenaGrid};

const AIM_JITTER: f32 = 0.1;

pub fn decide<R: Rng + ?Sized>(
    grid: &ArenaGrid,
    input: &TickInput,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<AiDecision, EngineError> {
    span_scope!("novice_decide");
    let me = input.me.position;
    let to_opponent = input.opponent_pos - me;
    let avoidance = wall_repulsion(grid, me);

    if to_opponent.length() < config.engage_distance {
        return Ok(AiDecision {
            speed: config.novice_speed,
            fire_angle: to_opponent.y.atan2(to_opponent.x),
            movement: wall_aware_velocity(-to_opponent * 0.4, avoidance),
            should_fire: false,
        });
    }

    let path: Vec<Vec2> = uniform_cost_path(grid, me, input.opponent_pos)?
        .into_iter()
        .map(to_world_center)
        .collect();
    let heading = path_direction(&path, me, input.opponent_pos);
    let jitter = rng.gen_range(-AIM_JITTER..=AIM_JITTER);

    Ok(AiDecision {
        speed: config.novice_speed,
        fire_angle: to_opponent.y.atan2(to_opponent.x) + jitter,
        movement: wall_aware_velocity(heading, avoidance),
        should_fire: false,
    })
}
