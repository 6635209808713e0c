pub mod boids;
pub mod perch;
pub mod sim;
pub mod spatial;
pub mod spawn;

pub use boids::Boid;
pub use perch::{Behavior, PerchBehavior, PerchParams, PerchPhase};
pub use sim::{Simulation, TransformSink};
pub use spatial::{
    BruteForceIndex, GroundPlane, SpatialError, SpatialQuery, SurfaceQuery, UniformGridIndex,
};
pub use spawn::{BoidTemplate, SpawnError, Spawner};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected tuning values. A boid with an invalid sensing body is never
/// admitted to the simulation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoidError {
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("{0} must not be negative")]
    Negative(&'static str),
}

/// Per-boid tuning. Fixed once the boid has been created.
///
/// `separation_radius <= neighbor_radius` is the expected configuration but
/// is deliberately not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoidParams {
    pub max_speed: f32,
    pub acceleration_scale: f32,
    pub boundary_strength: f32,
    pub use_boundaries: bool,
    pub neighbor_radius: f32,
    pub separation_radius: f32,
}

impl Default for BoidParams {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            acceleration_scale: 10.0,
            boundary_strength: 1.0,
            use_boundaries: true,
            neighbor_radius: 10.0,
            separation_radius: 5.0,
        }
    }
}

impl BoidParams {
    /// Validate the tuning values. Called on every creation path.
    pub fn validate(&self) -> Result<(), BoidError> {
        for (name, value) in [
            ("max_speed", self.max_speed),
            ("acceleration_scale", self.acceleration_scale),
            ("boundary_strength", self.boundary_strength),
            ("neighbor_radius", self.neighbor_radius),
            ("separation_radius", self.separation_radius),
        ] {
            if !value.is_finite() {
                return Err(BoidError::NonFinite(name));
            }
        }
        if self.max_speed <= 0.0 {
            return Err(BoidError::NonPositive("max_speed"));
        }
        if self.acceleration_scale <= 0.0 {
            return Err(BoidError::NonPositive("acceleration_scale"));
        }
        if self.neighbor_radius <= 0.0 {
            return Err(BoidError::NonPositive("neighbor_radius"));
        }
        if self.separation_radius < 0.0 {
            return Err(BoidError::Negative("separation_radius"));
        }
        if self.boundary_strength < 0.0 {
            return Err(BoidError::Negative("boundary_strength"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_validate() {
        assert_eq!(BoidParams::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_finite_radius() {
        let params = BoidParams {
            neighbor_radius: f32::NAN,
            ..BoidParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(BoidError::NonFinite("neighbor_radius"))
        );
    }

    #[test]
    fn rejects_zero_neighbor_radius() {
        let params = BoidParams {
            neighbor_radius: 0.0,
            ..BoidParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(BoidError::NonPositive("neighbor_radius"))
        );
    }

    #[test]
    fn zero_separation_radius_is_allowed() {
        let params = BoidParams {
            separation_radius: 0.0,
            ..BoidParams::default()
        };
        assert_eq!(params.validate(), Ok(()));
    }
}
