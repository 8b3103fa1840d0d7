//! Agent tick: gathers what each agent can observe, runs the engine, and
//! turns the decision into velocity, facing and shots.

use bevy::prelude::*;
use micromegas_tracing::prelude::{imetric, span_scope, warn};

use crate::ai::agent::AgentState;
use crate::ai::memory::ShotEvent;
use crate::ai::{self, DifficultyTier, Kinematics, TickInput};
use crate::components::*;
use crate::config::EngineConfig;
use crate::events::ShotFired;
use crate::grid::ArenaGrid;
use crate::resources::{AgentRng, MatchStats, SimClock};

/// World units per second for each unit of decided speed.
pub const UNITS_PER_SPEED: f32 = 10.0;

/// Minimum time between two shots from the same agent.
pub const AGENT_FIRE_INTERVAL_MS: f64 = 500.0;

/// Systems that advance the clock and run every agent's decision.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentSet;

pub struct AgentPlugin;

impl Plugin for AgentPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ShotFired>();
        app.init_resource::<EngineConfig>();
        app.init_resource::<SimClock>();
        app.init_resource::<AgentRng>();
        app.init_resource::<MatchStats>();
        app.add_systems(
            Update,
            (advance_clock, decide_agents, apply_decisions)
                .chain()
                .in_set(AgentSet),
        );
    }
}

fn advance_clock(mut clock: ResMut<SimClock>, mut stats: ResMut<MatchStats>) {
    clock.now_ms += clock.step_ms;
    stats.ticks += 1;
}

/// Run the engine once for every agent. A failed tick keeps the agent's
/// previous decision.
#[allow(clippy::type_complexity)]
pub fn decide_agents(
    grid: Option<Res<ArenaGrid>>,
    config: Res<EngineConfig>,
    clock: Res<SimClock>,
    mut rng: ResMut<AgentRng>,
    mut stats: ResMut<MatchStats>,
    mut shots: MessageReader<ShotFired>,
    opponent: Query<(Entity, &Position, &Velocity), With<Opponent>>,
    mut agents: Query<
        (
            Entity,
            &AiAgent,
            &Position,
            &Velocity,
            &Facing,
            &mut AgentState,
            &mut Decision,
        ),
        Without<Opponent>,
    >,
) {
    span_scope!("decide_agents");

    let Some(grid) = grid else {
        return;
    };
    let Ok((opponent_entity, opponent_pos, opponent_vel)) = opponent.single() else {
        return;
    };

    // Every opponent shot since the last tick; the newest rides in the tick
    // input and the rest go straight to elite memory.
    let mut fired: Vec<ShotEvent> = shots
        .read()
        .filter(|s| s.shooter == opponent_entity)
        .map(ShotFired::event)
        .collect();
    let shot = fired.pop();

    for (entity, agent, pos, vel, facing, mut state, mut decision) in &mut agents {
        let _tick = tracing::info_span!("agent_tick", tier = agent.tier.as_str()).entered();
        if agent.tier == DifficultyTier::Elite {
            for earlier in &fired {
                state.memory_mut().remember_shot(*earlier, clock.now_ms);
            }
        }
        let input = TickInput {
            opponent_pos: opponent_pos.0,
            opponent_vel: opponent_vel.0,
            shot,
            me: Kinematics {
                position: pos.0,
                velocity: vel.0,
                rotation: facing.0,
            },
            now_ms: clock.now_ms,
        };
        match ai::decide(&grid, agent.tier, &input, &mut state, &config, &mut rng.0) {
            Ok(next) => {
                decision.0 = next;
                stats.decisions += 1;
            }
            Err(err) => {
                stats.failed_decisions += 1;
                warn!("agent {:?} kept its last decision: {}", entity, err);
            }
        }
    }
    imetric!("agent_decisions", "count", stats.decisions as u64);
}

/// Velocity and facing follow the decision; agents with a clear line fire
/// at most once per `AGENT_FIRE_INTERVAL_MS`.
fn apply_decisions(
    clock: Res<SimClock>,
    mut stats: ResMut<MatchStats>,
    mut shots: MessageWriter<ShotFired>,
    mut agents: Query<
        (Entity, &Decision, &Position, &mut Velocity, &mut Facing, &mut LastShot),
        With<AiAgent>,
    >,
) {
    for (entity, decision, pos, mut vel, mut facing, mut last_shot) in &mut agents {
        let d = decision.0;
        vel.0 = d.movement * d.speed * UNITS_PER_SPEED;
        facing.0 = d.fire_angle;
        if d.should_fire && last_shot.ready(clock.now_ms, AGENT_FIRE_INTERVAL_MS) {
            last_shot.0 = Some(clock.now_ms);
            stats.agent_shots += 1;
            shots.write(ShotFired {
                shooter: entity,
                origin: pos.0,
                angle: d.fire_angle,
                time: clock.now_ms,
            });
        }
    }
}

/// Components every agent entity needs.
pub fn agent_bundle(tier: DifficultyTier, position: Vec2) -> impl Bundle {
    (
        AiAgent { tier },
        Position(position),
        Velocity::default(),
        Facing::default(),
        AgentState::new(),
        Decision::default(),
        LastShot::default(),
    )
}
