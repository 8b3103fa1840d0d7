//! Projectile threat scoring and the dodge direction.

use std::f32::consts::FRAC_PI_4;

use bevy::prelude::*;
use micromegas_tracing::prelude::{debug, fmetric};
use rand::Rng;

use super::memory::{OpponentMemory, ShotEvent};
use super::search::bounded_path;
use super::steering::{normalize, rotate, wall_repulsion};
use crate::error::EngineError;
use crate::grid::ArenaGrid;

/// Danger above which a shot contributes to the dodge.
const DANGER_FLOOR: f32 = 0.3;
/// Danger above which the dodge direction is checked against the map.
const LOOKAHEAD_DANGER: f32 = 0.7;
/// Seconds of bullet travel considered when projecting a trajectory.
const TRAJECTORY_SECS: f32 = 2.0;
const PROXIMITY_RADIUS: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThreatAssessment {
    /// Sum of per-shot danger for shots above the floor.
    pub immediate_danger: f32,
    /// Unit vector, or zero when nothing threatens the agent.
    pub dodge_vector: Vec2,
}

/// Where a shot's bullet is now, assuming constant speed.
pub fn bullet_position(shot: &ShotEvent, now_ms: f64, bullet_speed: f32) -> Vec2 {
    let age_secs = ((now_ms - shot.time) / 1000.0) as f32;
    shot.origin + shot.direction() * bullet_speed * age_secs
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Highest proximity threat across tracked shots, in [0, 1].
pub fn bullet_threat_level(memory: &OpponentMemory, me: Vec2, now_ms: f64, bullet_speed: f32) -> f32 {
    memory
        .shots()
        .map(|shot| {
            let age_secs = ((now_ms - shot.time) / 1000.0) as f32;
            let distance = bullet_position(shot, now_ms, bullet_speed).distance(me);
            (1.0 - distance / PROXIMITY_RADIUS) * (1.0 - age_secs.min(1.0))
        })
        .fold(0.0f32, f32::max)
        .min(1.0)
}

/// Shot volume plus proximity threat, capped at 1.
pub fn suppression_level(memory: &OpponentMemory, me: Vec2, now_ms: f64, bullet_speed: f32) -> f32 {
    (memory.shot_count() as f32 / 10.0 + bullet_threat_level(memory, me, now_ms, bullet_speed)).min(1.0)
}

/// Score every tracked shot against the agent and derive a dodge direction.
///
/// The opponent's aggression, clamped to [0, 1], sets the personality: a
/// higher value weights threats and momentum more and jitter less.
pub fn assess_threats<R: Rng + ?Sized>(
    grid: &ArenaGrid,
    memory: &OpponentMemory,
    me: Vec2,
    my_velocity: Vec2,
    now_ms: f64,
    bullet_speed: f32,
    rng: &mut R,
) -> Result<ThreatAssessment, EngineError> {
    let personality = memory.aggression().clamp(0.0, 1.0);
    let mut danger = 0.0;
    let mut dodge = Vec2::ZERO;

    for shot in memory.shots() {
        let dir = shot.direction();
        let current = bullet_position(shot, now_ms, bullet_speed);
        if (me - current).dot(dir) < 0.0 {
            continue;
        }
        let end = current + dir * bullet_speed * TRAJECTORY_SECS;
        let time_to_impact = distance_to_segment(me, current, end) / bullet_speed;
        let impact_danger = (1.0 - time_to_impact / 1.5).max(0.0);
        if impact_danger > DANGER_FLOOR {
            dodge += dir.perp() * impact_danger * (1.0 + personality);
            danger += impact_danger;
        }
    }

    if danger <= 0.0 {
        return Ok(ThreatAssessment::default());
    }

    dodge += normalize(my_velocity) * 0.7 * personality;
    let jitter = rng.gen_range(-1.0f32..=1.0) * FRAC_PI_4 * (1.0 - personality);
    dodge = rotate(dodge, jitter);

    let mut combined = dodge * (1.5 + danger) + wall_repulsion(grid, me) * 0.5;

    if danger > LOOKAHEAD_DANGER {
        let lookahead_goal = grid.clamp_world(me + normalize(combined) * 200.0);
        let lookahead = bounded_path(grid, me, lookahead_goal, 3)?;
        if lookahead.len() < 3 {
            debug!("dodge lookahead blocked, falling back to retreat scan");
            combined = safe_retreat_direction(grid, me)?;
        }
    }

    fmetric!("threat_danger", "level", danger as f64);
    Ok(ThreatAssessment {
        immediate_danger: danger,
        dodge_vector: normalize(combined),
    })
}

/// Compass direction whose short bounded search gets furthest.
pub fn safe_retreat_direction(grid: &ArenaGrid, me: Vec2) -> Result<Vec2, EngineError> {
    const COMPASS: [(f32, f32); 8] = [
        (1.0, 0.0),
        (-1.0, 0.0),
        (0.0, 1.0),
        (0.0, -1.0),
        (1.0, 1.0),
        (-1.0, 1.0),
        (1.0, -1.0),
        (-1.0, -1.0),
    ];
    let mut best = (0usize, Vec2::ZERO);
    for (dx, dy) in COMPASS {
        let dir = Vec2::new(dx, dy);
        let goal = grid.clamp_world(me + dir * 100.0);
        let reach = bounded_path(grid, me, goal, 5)?.len();
        if reach > best.0 {
            best = (reach, dir);
        }
    }
    Ok(normalize(best.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn memory_with_shot(shot: ShotEvent, now: f64) -> OpponentMemory {
        let mut memory = OpponentMemory::new();
        memory.record(Vec2::new(400.0, 250.0), Vec2::ZERO, Some(shot), now);
        memory
    }

    #[test]
    fn no_shots_no_threat() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let memory = OpponentMemory::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let t = assess_threats(&grid, &memory, Vec2::new(250.0, 250.0), Vec2::ZERO, 0.0, 200.0, &mut rng).unwrap();
        assert_eq!(t, ThreatAssessment::default());
        assert_eq!(bullet_threat_level(&memory, Vec2::ZERO, 0.0, 200.0), 0.0);
    }

    #[test]
    fn incoming_shot_yields_unit_dodge() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        // Fired along +x, passing 120 units from the agent.
        let shot = ShotEvent {
            origin: Vec2::new(50.0, 100.0),
            angle: 0.0,
            time: 0.0,
        };
        let memory = memory_with_shot(shot, 0.0);
        for seed in 0..8 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let t = assess_threats(&grid, &memory, Vec2::new(250.0, 220.0), Vec2::ZERO, 0.0, 200.0, &mut rng)
                .unwrap();
            assert!((t.immediate_danger - 0.6).abs() < 1e-4);
            assert!((t.dodge_vector.length() - 1.0).abs() < 1e-4);
            // Mostly sideways relative to the bullet.
            assert!(t.dodge_vector.y.abs() > t.dodge_vector.x.abs());
        }
    }

    #[test]
    fn point_blank_shot_still_yields_unit_dodge() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let shot = ShotEvent {
            origin: Vec2::new(150.0, 250.0),
            angle: 0.0,
            time: 0.0,
        };
        let memory = memory_with_shot(shot, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let t = assess_threats(&grid, &memory, Vec2::new(250.0, 250.0), Vec2::new(0.0, 3.0), 0.0, 200.0, &mut rng)
            .unwrap();
        assert!(t.immediate_danger > 0.7);
        assert!((t.dodge_vector.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn passed_bullets_are_ignored() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let shot = ShotEvent {
            origin: Vec2::new(300.0, 250.0),
            angle: 0.0,
            time: 0.0,
        };
        let memory = memory_with_shot(shot, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let t = assess_threats(&grid, &memory, Vec2::new(250.0, 250.0), Vec2::ZERO, 0.0, 200.0, &mut rng).unwrap();
        assert_eq!(t.immediate_danger, 0.0);
    }

    #[test]
    fn threat_level_fades_with_age_and_distance() {
        let shot = ShotEvent {
            origin: Vec2::new(200.0, 250.0),
            angle: 0.0,
            time: 0.0,
        };
        let memory = memory_with_shot(shot, 0.0);
        let me = Vec2::new(250.0, 250.0);
        let fresh = bullet_threat_level(&memory, me, 0.0, 200.0);
        assert!((fresh - (1.0 - 50.0 / 150.0)).abs() < 1e-5);
        assert_eq!(bullet_threat_level(&memory, me, 1500.0, 200.0), 0.0);
        let s = suppression_level(&memory, me, 0.0, 200.0);
        assert!((s - (0.1 + fresh)).abs() < 1e-5);
    }

    #[test]
    fn retreat_prefers_open_side() {
        let grid = ArenaGrid::bordered(25, 25).unwrap();
        let corner = Vec2::new(30.0, 30.0);
        let dir = safe_retreat_direction(&grid, corner).unwrap();
        assert!(dir.x >= 0.0 && dir.y >= 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }
}
