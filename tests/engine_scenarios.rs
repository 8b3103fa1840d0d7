use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sentinel::ai::agent::AgentState;
use sentinel::ai::behavior::BehaviorState;
use sentinel::ai::memory::ShotEvent;
use sentinel::ai::{AiDecision, DifficultyTier, Kinematics, TickInput, decide};
use sentinel::config::EngineConfig;
use sentinel::grid::{ArenaGrid, Cell, to_world_center};

const TICK_MS: f64 = 100.0;

/// Host-side integration: move along the decision, one axis at a time,
/// never into a wall.
fn step(grid: &ArenaGrid, me: Vec2, decision: &AiDecision) -> Vec2 {
    let delta = decision.movement * decision.speed * 1.5;
    let mut next = me;
    if grid.is_free_at(next + Vec2::new(delta.x, 0.0)) {
        next.x += delta.x;
    }
    if grid.is_free_at(next + Vec2::new(0.0, delta.y)) {
        next.y += delta.y;
    }
    grid.clamp_world(next)
}

fn assert_sane(decision: &AiDecision, config: &EngineConfig) {
    assert!(decision.fire_angle.is_finite());
    assert!(decision.speed.is_finite() && decision.speed >= 0.0);
    assert!(decision.speed <= config.elite_base_speed.max(config.veteran_speed) * 1.5 + 1e-4);
    let len = decision.movement.length();
    assert!(len < 1e-6 || (len - 1.0).abs() < 1e-3, "movement length {len}");
}

// ---------------------------------------------------------------------------
// Elite vs a camping opponent
// ---------------------------------------------------------------------------

#[test]
fn elite_leaves_patrol_and_closes_on_a_camper() {
    let grid = ArenaGrid::bordered(25, 25).unwrap();
    let config = EngineConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut agent = AgentState::new();
    let opponent = Vec2::new(450.0, 450.0);
    let mut me = Vec2::new(50.0, 50.0);
    let start_distance = me.distance(opponent);

    let mut seen = Vec::new();
    let mut closest = start_distance;
    for tick in 0..300 {
        let input = TickInput {
            opponent_pos: opponent,
            opponent_vel: Vec2::ZERO,
            shot: None,
            me: Kinematics {
                position: me,
                ..default()
            },
            now_ms: tick as f64 * TICK_MS,
        };
        let decision = decide(&grid, DifficultyTier::Elite, &input, &mut agent, &config, &mut rng).unwrap();
        assert_sane(&decision, &config);
        me = step(&grid, me, &decision);
        assert!(grid.is_free_at(me));
        closest = closest.min(me.distance(opponent));
        let state = agent.behavior_state();
        if !seen.contains(&state) {
            seen.push(state);
        }
    }

    println!("states visited: {:?}", seen);
    assert!(seen.iter().any(|s| *s != BehaviorState::Patrol));
    assert!(closest < start_distance * 0.8, "closest approach {closest}");
}

// ---------------------------------------------------------------------------
// Every tier under fire on procedural arenas
// ---------------------------------------------------------------------------

#[test]
fn every_tier_keeps_deciding_under_fire() {
    let config = EngineConfig::default();
    for seed in 0..4u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = ArenaGrid::generate(25, &mut rng).unwrap();
        let me_start = to_world_center(grid.nearest_free(Cell::new(2, 2)).unwrap());
        let opponent_start = to_world_center(grid.nearest_free(Cell::new(20, 20)).unwrap());

        for tier in [DifficultyTier::Novice, DifficultyTier::Veteran, DifficultyTier::Elite] {
            let mut agent = AgentState::new();
            let mut me = me_start;
            for tick in 0..80 {
                let now = tick as f64 * TICK_MS;
                let to_me = me - opponent_start;
                let shot = (tick % 5 == 0).then(|| ShotEvent {
                    origin: opponent_start,
                    angle: to_me.y.atan2(to_me.x),
                    time: now,
                });
                let input = TickInput {
                    opponent_pos: opponent_start,
                    opponent_vel: Vec2::new(0.0, 40.0),
                    shot,
                    me: Kinematics {
                        position: me,
                        ..default()
                    },
                    now_ms: now,
                };
                let decision = decide(&grid, tier, &input, &mut agent, &config, &mut rng)
                    .unwrap_or_else(|e| panic!("seed {seed} {}: {e}", tier.as_str()));
                assert_sane(&decision, &config);
                me = step(&grid, me, &decision);
            }
            let remembered = agent.memory().map(|m| m.positions().len()).unwrap_or(0);
            match tier {
                DifficultyTier::Elite => assert_eq!(remembered, 80),
                _ => assert_eq!(remembered, 0),
            }
        }
    }
}
