//! Fire-angle prediction from physics extrapolation and opponent memory.

use bevy::prelude::*;

use super::memory::OpponentMemory;

/// Engagement time after which physics dominates the blend.
const SETTLED_ENGAGEMENT_MS: f64 = 5_000.0;
/// Bullet threat above which the aim ignores the live physics estimate.
const PANIC_THREAT: f32 = 0.7;

/// Where the opponent will be when a bullet fired now reaches it.
pub fn physics_prediction(opponent: Vec2, opponent_velocity: Vec2, me: Vec2, bullet_speed: f32) -> Vec2 {
    let time_to_reach = opponent.distance(me) / bullet_speed;
    opponent + opponent_velocity * time_to_reach
}

/// Memory extrapolation, pushed further out when the opponent sits in one of
/// its favorite zones.
pub fn memory_prediction(memory: &OpponentMemory, now_ms: f64) -> Vec2 {
    let predicted = memory.predict(now_ms);
    let Some(last) = memory.last_sample() else {
        return predicted;
    };
    match memory.favorite_zones().first() {
        Some(zone) if memory.is_in_favorite_zone(last.pos) => predicted + (predicted - zone.origin()) * 0.3,
        _ => predicted,
    }
}

/// Physics share of the blend: even at first, 0.8 once settled.
pub fn physics_weight(engagement_ms: f64) -> f32 {
    if engagement_ms < SETTLED_ENGAGEMENT_MS { 0.5 } else { 0.8 }
}

pub fn hybrid_prediction(physics: Vec2, remembered: Vec2, engagement_ms: f64) -> Vec2 {
    let w = physics_weight(engagement_ms);
    physics * w + remembered * (1.0 - w)
}

#[derive(Debug, Clone, Copy)]
pub struct AimInput {
    pub me: Vec2,
    pub opponent: Vec2,
    pub opponent_velocity: Vec2,
    pub engagement_ms: f64,
    pub bullet_threat: f32,
    pub bullet_speed: f32,
    pub now_ms: f64,
}

/// Blended aim point led by the opponent's remembered velocity, as an angle
/// in radians.
pub fn predictive_aim(memory: &OpponentMemory, input: &AimInput) -> f32 {
    let remembered = memory_prediction(memory, input.now_ms);
    let aim_point = if input.bullet_threat > PANIC_THREAT {
        remembered
    } else {
        let physics = physics_prediction(input.opponent, input.opponent_velocity, input.me, input.bullet_speed);
        hybrid_prediction(physics, remembered, input.engagement_ms)
    };
    let lead_velocity = memory.last_sample().map(|s| s.vel).unwrap_or_default();
    let lead = 1.5 + memory.aggression() * 0.7;
    let v = aim_point - input.me + lead_velocity * lead;
    v.y.atan2(v.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn input(opponent: Vec2, velocity: Vec2, threat: f32) -> AimInput {
        AimInput {
            me: Vec2::new(50.0, 50.0),
            opponent,
            opponent_velocity: velocity,
            engagement_ms: 0.0,
            bullet_threat: threat,
            bullet_speed: 200.0,
            now_ms: 1_000.0,
        }
    }

    #[test]
    fn stationary_target_is_aimed_at_directly() {
        let opponent = Vec2::new(450.0, 450.0);
        let mut memory = OpponentMemory::new();
        memory.record(opponent, Vec2::ZERO, None, 1_000.0);
        let angle = predictive_aim(&memory, &input(opponent, Vec2::ZERO, 0.0));
        assert!((angle - FRAC_PI_4).abs() < 1e-4);
    }

    #[test]
    fn physics_leads_a_moving_target() {
        let p = physics_prediction(Vec2::new(250.0, 50.0), Vec2::new(0.0, 100.0), Vec2::new(50.0, 50.0), 200.0);
        assert_eq!(p, Vec2::new(250.0, 150.0));
        assert_eq!(physics_weight(4_999.0), 0.5);
        assert_eq!(physics_weight(5_000.0), 0.8);
    }

    #[test]
    fn high_threat_trusts_memory_only() {
        let seen = Vec2::new(50.0, 450.0);
        let mut memory = OpponentMemory::new();
        memory.record(seen, Vec2::ZERO, None, 1_000.0);
        // The live reading says the opponent jumped far to the right.
        let angle = predictive_aim(&memory, &input(Vec2::new(450.0, 50.0), Vec2::ZERO, 0.9));
        let expected = (seen.y - 50.0).atan2(seen.x - 50.0);
        assert!((angle - expected).abs() < 0.35, "angle {angle} expected near {expected}");
    }
}
