use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use bevy::tasks::{ComputeTaskPool, TaskPoolBuilder};
use micromegas_telemetry_sink::TelemetryGuardBuilder;
use micromegas_telemetry_sink::tracing_interop::TracingCaptureLayer;
use micromegas_tracing::dispatch::init_thread_stream;
use micromegas_tracing::levels::LevelFilter;
use micromegas_tracing::prelude::{info, warn};
use sentinel::config::SentinelConfig;
use sentinel::tracing_bridge::MicromegasBridgeLayer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;

const DEFAULT_CONFIG: &str = "assets/sentinel.json";

fn main() {
    // 1. Initialize telemetry (creates LocalEventSink for stdout)
    //    Spans require MICROMEGAS_ENABLE_CPU_TRACING=true (env var).
    //    Logs and metrics always work regardless.
    let _telemetry_guard = TelemetryGuardBuilder::default()
        .with_install_tracing_capture(false)
        .build()
        .expect("failed to initialize telemetry");

    // 2. Bridge schedule and agent tick spans into Micromegas.  Must be set
    //    before Bevy starts emitting spans.
    let log_layer = TracingCaptureLayer {
        max_level: LevelFilter::Info,
    };
    let subscriber = Registry::default()
        .with(MicromegasBridgeLayer)
        .with(log_layer);
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    // 3. Configuration: first argument, or the shipped asset.
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match SentinelConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            warn!("{}; running with defaults", err);
            SentinelConfig::default()
        }
    };
    info!(
        "sentinel sandbox starting: tier={} seed={} duration={}s",
        config.sandbox.tier.as_str(),
        config.sandbox.seed,
        config.sandbox.duration_secs
    );

    // 4. Pre-init ComputeTaskPool with Micromegas thread callbacks.
    //    Must happen BEFORE App::new() so TaskPoolPlugin finds the pool
    //    already initialized and skips its own init.
    ComputeTaskPool::get_or_init(|| {
        TaskPoolBuilder::new()
            .on_thread_spawn(|| {
                init_thread_stream();
            })
            .on_thread_destroy(|| {
                micromegas_tracing::dispatch::flush_thread_buffer();
                micromegas_tracing::dispatch::unregister_thread_stream();
            })
            .build()
    });

    // 5. Run the match headless, one engine tick per loop iteration.
    let tick = Duration::from_secs_f32(config.sandbox.tick_secs);
    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(tick)))
        .add_plugins(sentinel::SentinelPlugin::new(config))
        .run();
}
