//! Tuning knobs for the decision engine and the headless sandbox.
//!
//! Every field has a default, so a JSON file only needs the keys it wants to
//! override. `assets/sentinel.json` ships the defaults verbatim.

use bevy::prelude::*;

use crate::ai::DifficultyTier;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Pathfinder defaults. Per-call context (exclusions, temporary walls) lives
/// in `SearchOptions`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SearchSettings {
    pub diagonal_cost: f32,
    pub heuristic_weight: f32,
    pub max_expansions: usize,
    pub max_retries: u32,
    pub temp_wall_ttl_ms: f64,
    /// How many recently visited cells the elite tier excludes from search.
    pub recent_cells: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            diagonal_cost: 1.4,
            heuristic_weight: 1.0,
            max_expansions: 500,
            max_retries: 3,
            temp_wall_ttl_ms: 2000.0,
            recent_cells: 6,
        }
    }
}

/// State-machine timings and thresholds.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct BehaviorSettings {
    pub dwell_ms: f64,
    pub stalled_dwell_ms: f64,
    pub cover_threshold: f32,
    pub feint_chance: f32,
    pub feint_offset: f32,
    pub stuck_radius: f32,
    pub stuck_window_ms: f64,
    pub stuck_cooldown_ms: f64,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            dwell_ms: 4000.0,
            stalled_dwell_ms: 3000.0,
            cover_threshold: 0.7,
            feint_chance: 0.3,
            feint_offset: 80.0,
            stuck_radius: 50.0,
            stuck_window_ms: 3000.0,
            stuck_cooldown_ms: 5000.0,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bullet_speed: f32,
    /// Novice flees and veteran closes in below this distance.
    pub engage_distance: f32,
    pub novice_speed: f32,
    pub veteran_speed: f32,
    pub elite_base_speed: f32,
    pub smoothing: f32,
    pub behavior: BehaviorSettings,
    pub search: SearchSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bullet_speed: 200.0,
            engage_distance: 150.0,
            novice_speed: 10.0,
            veteran_speed: 12.0,
            elite_base_speed: 10.0,
            smoothing: 0.15,
            behavior: BehaviorSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// Scripted demo match run by the binary.
#[derive(Resource, Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub seed: u64,
    pub grid_size: usize,
    pub duration_secs: f32,
    pub tier: DifficultyTier,
    pub agents: usize,
    /// Opponent strafe speed in world units per second.
    pub opponent_speed: f32,
    pub fire_interval_ms: f64,
    /// Seconds of simulated time per engine tick.
    pub tick_secs: f32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            grid_size: 25,
            duration_secs: 20.0,
            tier: DifficultyTier::Elite,
            agents: 2,
            opponent_speed: 60.0,
            fire_interval_ms: 1200.0,
            tick_secs: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub engine: EngineConfig,
    pub sandbox: SandboxConfig,
}

impl SentinelConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let engine = &self.engine;
        if engine.bullet_speed <= 0.0 {
            return Err(EngineError::Config("bullet_speed must be positive".into()));
        }
        if engine.search.diagonal_cost < 1.0 {
            return Err(EngineError::Config("search.diagonal_cost must be at least 1".into()));
        }
        if engine.search.max_expansions == 0 {
            return Err(EngineError::Config("search.max_expansions must be non-zero".into()));
        }
        if self.sandbox.grid_size < 5 {
            return Err(EngineError::Config("sandbox.grid_size must be at least 5".into()));
        }
        if !(self.sandbox.tick_secs > 0.0 && self.sandbox.tick_secs.is_finite()) {
            return Err(EngineError::Config("sandbox.tick_secs must be positive".into()));
        }
        Ok(())
    }
}
