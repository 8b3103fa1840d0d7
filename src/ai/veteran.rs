//! Veteran tier: A* toward the opponent, closes in when near, aims at the
//! physics prediction.

use micromegas_tracing::prelude::*;

use super::aim::physics_prediction;
use super::search::{find_path, SearchOptions};
use super::steering::{wall_aware_velocity, wall_repulsion};
use super::{path_direction, AiDecision, TickInput};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grid::ArenaGrid;

#[span_fn]
pub fn decide(grid: &ArenaGrid, input: &TickInput, config: &EngineConfig) -> Result<AiDecision, EngineError> {
    let me = input.me.position;
    let to_opponent = input.opponent_pos - me;
    let distance = to_opponent.length();
    let avoidance = wall_repulsion(grid, me);

    let predicted = physics_prediction(input.opponent_pos, input.opponent_vel, me, config.bullet_speed);
    let aim = predicted - me;

    let movement = if distance < config.engage_distance {
        wall_aware_velocity(to_opponent * (distance / 500.0), avoidance)
    } else {
        let options = SearchOptions::from_settings(&config.search).at(input.now_ms);
        let path = find_path(grid, me, input.opponent_pos, &options)?;
        wall_aware_velocity(path_direction(&path, me, input.opponent_pos), avoidance)
    };

    Ok(AiDecision {
        speed: config.veteran_speed,
        fire_angle: aim.y.atan2(aim.x),
        movement,
        should_fire: false,
    })
}
