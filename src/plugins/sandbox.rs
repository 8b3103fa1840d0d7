//! Scripted demo match: a procedural arena, an opponent that strafes between
//! random points and shoots at the nearest agent, and body integration with
//! wall blocking.

use bevy::prelude::*;
use micromegas_tracing::prelude::{info, span_fn, span_scope, warn};
use rand::Rng;

use crate::ai::search::{find_path, Path, SearchOptions};
use crate::ai::steering::normalize;
use crate::ai::path_direction;
use crate::components::*;
use crate::config::{EngineConfig, SandboxConfig};
use crate::events::ShotFired;
use crate::grid::{to_world_center, ArenaGrid, Cell};
use crate::plugins::agents::{agent_bundle, AgentSet};
use crate::resources::{AgentRng, MatchStats, SimClock};

/// How long the opponent follows one strafe route before picking another.
const STRAFE_RETARGET_MS: f64 = 4000.0;
const STRAFE_ATTEMPTS: usize = 20;

pub struct SandboxPlugin;

impl Plugin for SandboxPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SandboxConfig>();
        app.add_systems(Startup, setup_arena);
        app.add_systems(
            Update,
            (steer_opponent, opponent_fire).chain().before(AgentSet),
        );
        app.add_systems(
            Update,
            (integrate_motion, end_of_match).chain().after(AgentSet),
        );
    }
}

/// The opponent's current strafe route.
#[derive(Component, Debug, Default)]
pub struct Strafe {
    path: Path,
    retarget_at: f64,
}

#[span_fn]
fn setup_arena(mut commands: Commands, config: Res<SandboxConfig>, mut rng: ResMut<AgentRng>) {
    let grid = match ArenaGrid::generate(config.grid_size, &mut rng.0) {
        Ok(grid) => grid,
        Err(err) => {
            warn!("arena generation failed: {}", err);
            return;
        }
    };

    let last = config.grid_size as i32 - 2;
    let middle = config.grid_size as i32 / 2;
    if let Some(cell) = grid.nearest_free(Cell::new(middle, middle)) {
        commands.spawn((
            Opponent,
            Position(to_world_center(cell)),
            Velocity::default(),
            LastShot::default(),
            Strafe::default(),
        ));
    }

    let corners = [
        Cell::new(1, 1),
        Cell::new(last, last),
        Cell::new(last, 1),
        Cell::new(1, last),
    ];
    for i in 0..config.agents {
        let Some(cell) = grid.nearest_free(corners[i % corners.len()]) else {
            continue;
        };
        commands.spawn(agent_bundle(config.tier, to_world_center(cell)));
    }

    info!(
        "sandbox arena {}x{} seed={} tier={} agents={}",
        grid.width(),
        grid.height(),
        config.seed,
        config.tier.as_str(),
        config.agents
    );
    commands.insert_resource(grid);
}

/// Walk the opponent along its strafe route, picking a new random
/// destination when the route runs out or goes stale.
fn steer_opponent(
    grid: Option<Res<ArenaGrid>>,
    clock: Res<SimClock>,
    config: Res<SandboxConfig>,
    engine: Res<EngineConfig>,
    mut rng: ResMut<AgentRng>,
    mut opponent: Query<(&Position, &mut Velocity, &mut Strafe), With<Opponent>>,
) {
    span_scope!("steer_opponent");
    let Some(grid) = grid else {
        return;
    };
    let Ok((pos, mut vel, mut strafe)) = opponent.single_mut() else {
        return;
    };
    let now = clock.now_ms;

    let arrived = strafe.path.last().is_none_or(|end| end.distance(pos.0) < 10.0);
    if arrived || now >= strafe.retarget_at {
        let options = SearchOptions::from_settings(&engine.search).at(now);
        let (w, h) = (grid.width() as i32, grid.height() as i32);
        strafe.path.clear();
        for _ in 0..STRAFE_ATTEMPTS {
            let cell = Cell::new(rng.0.gen_range(1..w - 1), rng.0.gen_range(1..h - 1));
            if grid.is_wall_cell(cell) {
                continue;
            }
            match find_path(&grid, pos.0, to_world_center(cell), &options) {
                Ok(path) if !path.is_empty() => {
                    strafe.path = path;
                    break;
                }
                Ok(_) => {}
                Err(err) => warn!("opponent strafe search failed: {}", err),
            }
        }
        strafe.retarget_at = now + STRAFE_RETARGET_MS;
    }

    vel.0 = normalize(path_direction(&strafe.path, pos.0, pos.0)) * config.opponent_speed;
}

/// The opponent shoots at the nearest agent every `fire_interval_ms`.
fn opponent_fire(
    clock: Res<SimClock>,
    config: Res<SandboxConfig>,
    mut stats: ResMut<MatchStats>,
    mut shots: MessageWriter<ShotFired>,
    mut opponent: Query<(Entity, &Position, &mut LastShot), With<Opponent>>,
    agents: Query<&Position, With<AiAgent>>,
) {
    let Ok((entity, pos, mut last_shot)) = opponent.single_mut() else {
        return;
    };
    if !last_shot.ready(clock.now_ms, config.fire_interval_ms) {
        return;
    }
    let Some(target) = agents
        .iter()
        .map(|p| p.0)
        .min_by(|a, b| a.distance(pos.0).total_cmp(&b.distance(pos.0)))
    else {
        return;
    };

    let aim = target - pos.0;
    last_shot.0 = Some(clock.now_ms);
    stats.opponent_shots += 1;
    shots.write(ShotFired {
        shooter: entity,
        origin: pos.0,
        angle: aim.y.atan2(aim.x),
        time: clock.now_ms,
    });
}

/// Move every body by its velocity. Each axis is blocked separately so
/// bodies slide along walls.
fn integrate_motion(
    grid: Option<Res<ArenaGrid>>,
    clock: Res<SimClock>,
    mut bodies: Query<(&mut Position, &Velocity)>,
) {
    let Some(grid) = grid else {
        return;
    };
    let dt = clock.step_secs();
    for (mut pos, vel) in &mut bodies {
        let step = vel.0 * dt;
        let mut next = pos.0;
        if grid.is_free_at(next + Vec2::new(step.x, 0.0)) {
            next.x += step.x;
        }
        if grid.is_free_at(next + Vec2::new(0.0, step.y)) {
            next.y += step.y;
        }
        pos.0 = grid.clamp_world(next);
    }
}

fn end_of_match(
    clock: Res<SimClock>,
    config: Res<SandboxConfig>,
    stats: Res<MatchStats>,
    agents: Query<(&AiAgent, &crate::ai::agent::AgentState)>,
    mut exit: MessageWriter<AppExit>,
    mut reported: Local<bool>,
) {
    if *reported || clock.now_ms < config.duration_secs as f64 * 1000.0 {
        return;
    }
    *reported = true;
    for (agent, state) in &agents {
        info!(
            "{} agent finished in {}",
            agent.tier.as_str(),
            state.behavior_state().as_str()
        );
    }
    info!(
        "match over after {} ticks: {} decisions, {} failed, {} agent shots, {} opponent shots",
        stats.ticks,
        stats.decisions,
        stats.failed_decisions,
        stats.agent_shots,
        stats.opponent_shots
    );
    exit.write(AppExit::Success);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walls_block_each_axis_separately() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(ArenaGrid::bordered(10, 10).unwrap());
        app.insert_resource(SimClock::new(1.0));
        app.add_systems(Update, integrate_motion);
        let body = app
            .world_mut()
            .spawn((Position(Vec2::new(30.0, 100.0)), Velocity(Vec2::new(-40.0, 15.0))))
            .id();

        app.update();

        // x would land in the left border wall; y still moves.
        let pos = app.world().get::<Position>(body).unwrap().0;
        assert_eq!(pos, Vec2::new(30.0, 115.0));
    }
}
