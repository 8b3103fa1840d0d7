//! Shots fired by any body. Agents fold the opponent's shots into memory.

use bevy::prelude::*;

use crate::ai::memory::ShotEvent;

#[derive(Message, Debug, Clone, Copy)]
pub struct ShotFired {
    pub shooter: Entity,
    pub origin: Vec2,
    /// Radians.
    pub angle: f32,
    /// Clock time the shot left the muzzle.
    pub time: f64,
}

impl ShotFired {
    pub fn event(&self) -> ShotEvent {
        ShotEvent {
            origin: self.origin,
            angle: self.angle,
            time: self.time,
        }
    }
}
