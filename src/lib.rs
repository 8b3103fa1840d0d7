pub mod ai;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod grid;
pub mod plugins;
pub mod resources;
pub mod tracing_bridge;

use bevy::prelude::*;

use config::SentinelConfig;
use plugins::agents::AgentPlugin;
use plugins::sandbox::SandboxPlugin;
use plugins::telemetry::TelemetryPlugin;
use resources::{AgentRng, SimClock};

/// Headless arena match: the engine's agents against a scripted opponent.
pub struct SentinelPlugin {
    pub config: SentinelConfig,
}

impl SentinelPlugin {
    pub fn new(config: SentinelConfig) -> Self {
        Self { config }
    }
}

impl Plugin for SentinelPlugin {
    fn build(&self, app: &mut App) {
        // Configuration first so the plugins below keep it instead of
        // initializing their own defaults.
        app.insert_resource(self.config.engine.clone());
        app.insert_resource(self.config.sandbox.clone());
        app.insert_resource(SimClock::new(self.config.sandbox.tick_secs));
        app.insert_resource(AgentRng::seeded(self.config.sandbox.seed));

        app.add_plugins(AgentPlugin);
        app.add_plugins(SandboxPlugin);
        app.add_plugins(TelemetryPlugin);
    }
}
