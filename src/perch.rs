//! Perch/cooldown overlay layered on the standard tick pipeline.
//!
//! A perching boid keeps sensing and integrating every tick; while perched
//! its position is overwritten with an anchor captured on surface contact,
//! one unit above the contact point. Cooldown flies normally but suppresses
//! re-entry until it elapses.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::BoidError;

/// Timed perch settings, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerchParams {
    pub perching_time: f32,
    pub perch_cooldown: f32,
}

impl Default for PerchParams {
    fn default() -> Self {
        Self {
            perching_time: 5.0,
            perch_cooldown: 10.0,
        }
    }
}

impl PerchParams {
    pub fn validate(&self) -> Result<(), BoidError> {
        for (name, value) in [
            ("perching_time", self.perching_time),
            ("perch_cooldown", self.perch_cooldown),
        ] {
            if !value.is_finite() {
                return Err(BoidError::NonFinite(name));
            }
            if value < 0.0 {
                return Err(BoidError::Negative(name));
            }
        }
        Ok(())
    }
}

/// Behavioral state of a perch-capable boid. `Perching` and `Cooldown` are
/// mutually exclusive; both carry their remaining duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PerchPhase {
    Flying,
    Perching { remaining: f32 },
    Cooldown { remaining: f32 },
}

/// Steering overlay chosen per boid at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Behavior {
    /// Plain flocking, no overlay.
    #[default]
    Free,
    /// Flocking with the perch/cooldown state machine.
    Perch(PerchBehavior),
}

/// State machine cycling `Flying -> Perching -> Cooldown -> Flying`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerchBehavior {
    pub params: PerchParams,
    phase: PerchPhase,
    anchor: Vector3<f32>,
}

impl PerchBehavior {
    pub fn new(params: PerchParams) -> Self {
        Self {
            params,
            phase: PerchPhase::Flying,
            anchor: Vector3::zeros(),
        }
    }

    pub fn phase(&self) -> PerchPhase {
        self.phase
    }

    /// Record a perch-surface contact, evaluated during the boundary step.
    /// Only a flying boid starts perching; cooldown suppresses re-entry and
    /// an already-perched boid stays on its anchor.
    pub(crate) fn on_surface_contact(&mut self, position: Vector3<f32>) {
        if matches!(self.phase, PerchPhase::Flying) {
            self.anchor = position + Vector3::y();
            self.phase = PerchPhase::Perching {
                remaining: self.params.perching_time,
            };
        }
    }

    /// Advance the timers by `dt` after integration. Returns the position
    /// override for ticks spent perching.
    pub(crate) fn advance(&mut self, dt: f32) -> Option<Vector3<f32>> {
        match self.phase {
            PerchPhase::Flying => None,
            PerchPhase::Perching { remaining } => {
                let left = remaining - dt;
                self.phase = if left <= 0.0 {
                    PerchPhase::Cooldown {
                        remaining: self.params.perch_cooldown,
                    }
                } else {
                    PerchPhase::Perching { remaining: left }
                };
                Some(self.anchor)
            }
            PerchPhase::Cooldown { remaining } => {
                let left = remaining - dt;
                self.phase = if left <= 0.0 {
                    PerchPhase::Flying
                } else {
                    PerchPhase::Cooldown { remaining: left }
                };
                None
            }
        }
    }
}
