//! Frame-level telemetry: wraps each simulation step with Micromegas
//! instrumentation.

use bevy::prelude::*;
use micromegas_tracing::prelude::{fmetric, imetric, span_scope};

use crate::ai::agent::AgentState;
use crate::ai::behavior::BehaviorState;
use crate::components::AiAgent;
use crate::resources::{MatchStats, SimClock};

pub struct TelemetryPlugin;

impl Plugin for TelemetryPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Last, frame_telemetry);
    }
}

fn frame_telemetry(
    time: Res<Time>,
    clock: Option<Res<SimClock>>,
    stats: Option<Res<MatchStats>>,
    agents: Query<&AgentState, With<AiAgent>>,
) {
    span_scope!("frame");
    let dt_ms = time.delta_secs_f64() * 1000.0;
    fmetric!("frame_time_ms", "ms", dt_ms);
    if let Some(clock) = clock {
        fmetric!("sim_time_ms", "ms", clock.now_ms);
    }
    if let Some(stats) = stats {
        imetric!("failed_decisions", "count", stats.failed_decisions as u64);
    }
    let in_cover = agents
        .iter()
        .filter(|a| a.behavior_state() == BehaviorState::Cover)
        .count();
    imetric!("agents_in_cover", "count", in_cover as u64);
}
