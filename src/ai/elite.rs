//! Elite tier: the full stack. Memory update, threat assessment, the
//! behavior state machine for pathing, and blended predictive aim.

use bevy::prelude::*;
use micromegas_tracing::prelude::{debug, fmetric, span_scope};
use rand::Rng;

use super::agent::AgentState;
use super::aim::{hybrid_prediction, memory_prediction, physics_prediction, predictive_aim, AimInput};
use super::behavior::PlanContext;
use super::search::SearchOptions;
use super::steering::{normalize, wall_repulsion};
use super::threat::{assess_threats, bullet_threat_level, suppression_level};
use super::{path_direction, AiDecision, TickInput};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grid::{to_cell, ArenaGrid};

/// Below this distance the agent slows down proportionally.
const CLOSE_QUARTERS: f32 = 100.0;

pub fn decide<R: Rng + ?Sized>(
    grid: &ArenaGrid,
    input: &TickInput,
    agent: &mut AgentState,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<AiDecision, EngineError> {
    span_scope!("elite_decide");
    let now = input.now_ms;
    let me = input.me.position;
    let opponent = input.opponent_pos;
    let distance = me.distance(opponent);

    let engagement_ms = agent.engagement_ms(now);
    let here = to_cell(me);
    agent.visit(here, config.search.recent_cells);
    let mut search = SearchOptions::from_settings(&config.search).at(now);
    search.excluded = agent.recent_cells_except(here);

    let (memory, behavior) = agent.minds(now);
    memory.record(opponent, input.opponent_vel, input.shot, now);

    let threat = bullet_threat_level(memory, me, now, config.bullet_speed);
    let suppression = suppression_level(memory, me, now, config.bullet_speed);
    let dodge = assess_threats(grid, memory, me, input.me.velocity, now, config.bullet_speed, rng)?;

    let physics = physics_prediction(opponent, input.opponent_vel, me, config.bullet_speed);
    let target = grid.clamp_world(hybrid_prediction(physics, memory_prediction(memory, now), engagement_ms));

    let ctx = PlanContext {
        grid,
        memory,
        me,
        target,
        opponent,
        suppression,
        now_ms: now,
        search: &search,
    };
    let path = behavior.plan(&ctx, &config.behavior, rng)?;
    let state = behavior.state();

    let fire_angle = predictive_aim(
        memory,
        &AimInput {
            me,
            opponent,
            opponent_velocity: input.opponent_vel,
            engagement_ms,
            bullet_threat: threat,
            bullet_speed: config.bullet_speed,
            now_ms: now,
        },
    );

    let heading = normalize(path_direction(&path, me, target));
    let raw = heading * (1.2 - 0.5 * threat)
        + dodge.dodge_vector * (0.8 + 0.7 * threat).min(1.5)
        + wall_repulsion(grid, me) * (1.0 - 0.3 * threat);
    let smoothing = config.smoothing * (1.0 - 0.5 * threat);
    agent.smoothed_velocity = agent.smoothed_velocity.lerp(raw, smoothing);

    let mut speed = config.elite_base_speed * (1.0 + 0.5 * threat);
    if distance < CLOSE_QUARTERS {
        speed *= distance / 200.0;
    }

    fmetric!("elite_suppression", "level", suppression as f64);
    debug!(
        "elite {} threat={:.2} waypoints={}",
        state.as_str(),
        threat,
        path.len()
    );

    Ok(AiDecision {
        speed,
        fire_angle,
        movement: normalize(agent.smoothed_velocity),
        should_fire: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::memory::ShotEvent;
    use crate::ai::Kinematics;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn input(me: Vec2, opponent: Vec2, shot: Option<ShotEvent>, now_ms: f64) -> TickInput {
        TickInput {
            opponent_pos: opponent,
            opponent_vel: Vec2::ZERO,
            shot,
            me: Kinematics {
                position: me,
                ..default()
            },
            now_ms,
        }
    }

    #[test]
    fn first_tick_moves_and_remembers() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let mut agent = AgentState::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let d = decide(
            &grid,
            &input(Vec2::new(250.0, 250.0), Vec2::new(450.0, 450.0), None, 1_000.0),
            &mut agent,
            &EngineConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(agent.memory().map(|m| m.positions().len()), Some(1));
        assert!((d.movement.length() - 1.0).abs() < 1e-4);
        assert_eq!(d.speed, 10.0);
    }

    #[test]
    fn point_blank_shots_push_the_agent_into_cover() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let mut agent = AgentState::new();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let config = EngineConfig::default();
        let me = Vec2::new(250.0, 250.0);
        let opponent = Vec2::new(250.0, 400.0);
        for i in 0..8 {
            let now = 1_000.0 + i as f64 * 50.0;
            let shot = ShotEvent {
                origin: Vec2::new(250.0, 300.0),
                angle: -std::f32::consts::FRAC_PI_2,
                time: now,
            };
            let d = decide(&grid, &input(me, opponent, Some(shot), now), &mut agent, &config, &mut rng).unwrap();
            assert!(d.speed > config.elite_base_speed);
        }
        assert_eq!(agent.behavior_state(), crate::ai::behavior::BehaviorState::Cover);
    }

    #[test]
    fn slows_down_at_close_quarters() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let mut agent = AgentState::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let d = decide(
            &grid,
            &input(Vec2::new(250.0, 250.0), Vec2::new(300.0, 250.0), None, 0.0),
            &mut agent,
            &EngineConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert!((d.speed - 2.5).abs() < 1e-5);
    }
}
