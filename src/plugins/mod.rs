pub mod agents;
pub mod sandbox;
pub mod telemetry;
