//! Flock spawning: template validation, randomized placement, and the shared
//! boundary box handed to every boid.

use nalgebra::Vector3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::boids::Boid;
use crate::perch::{Behavior, PerchBehavior, PerchParams};
use crate::{BoidError, BoidParams};

/// A spawn that cannot produce a valid flock admits no boids at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("no boid templates configured")]
    NoTemplates,
    #[error("template {index}: {source}")]
    InvalidTemplate {
        index: usize,
        #[source]
        source: BoidError,
    },
    #[error("spawn placement: {0}")]
    InvalidPlacement(&'static str),
}

/// Blueprint for one kind of boid. `perch` selects the perching overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoidTemplate {
    pub params: BoidParams,
    pub perch: Option<PerchParams>,
}

impl BoidTemplate {
    fn validate(&self) -> Result<(), BoidError> {
        self.params.validate()?;
        if let Some(perch) = &self.perch {
            perch.validate()?;
        }
        Ok(())
    }

    fn behavior(&self) -> Behavior {
        match self.perch {
            Some(params) => Behavior::Perch(PerchBehavior::new(params)),
            None => Behavior::Free,
        }
    }
}

/// Places `count` boids uniformly inside a cube of half-extent `spawn_radius`
/// around `center`; the same cube becomes every boid's boundary box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spawner {
    pub count: usize,
    pub center: Vector3<f32>,
    pub spawn_radius: f32,
    pub templates: Vec<BoidTemplate>,
    /// Seed for reproducible placement; a fresh OS seed when absent.
    pub seed: Option<u64>,
}

impl Default for Spawner {
    fn default() -> Self {
        Self {
            count: 10,
            center: Vector3::zeros(),
            spawn_radius: 10.0,
            templates: vec![BoidTemplate::default()],
            seed: None,
        }
    }
}

impl Spawner {
    /// The boundary box shared by every spawned boid.
    pub fn boundaries(&self) -> (Vector3<f32>, Vector3<f32>) {
        let half = Vector3::repeat(self.spawn_radius);
        (self.center - half, self.center + half)
    }

    /// Validate the whole configuration, then place the flock. Any invalid
    /// template aborts the entire spawn before a single boid is admitted.
    pub fn spawn(&self) -> Result<Vec<Boid>, SpawnError> {
        if self.templates.is_empty() {
            error!("spawn aborted: no boid templates configured");
            return Err(SpawnError::NoTemplates);
        }
        for (index, template) in self.templates.iter().enumerate() {
            if let Err(source) = template.validate() {
                error!(index, %source, "spawn aborted: invalid boid template");
                return Err(SpawnError::InvalidTemplate { index, source });
            }
        }
        if !self.center.iter().all(|c| c.is_finite()) {
            return Err(SpawnError::InvalidPlacement("center must be finite"));
        }
        if !self.spawn_radius.is_finite() || self.spawn_radius < 0.0 {
            return Err(SpawnError::InvalidPlacement(
                "spawn_radius must be finite and not negative",
            ));
        }
        if self.count == 0 {
            warn!("spawning an empty flock");
        }

        let boundaries = self.boundaries();
        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let mut flock = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            let index = rng.random_range(0..self.templates.len());
            let template = &self.templates[index];
            let offset = Vector3::new(
                rng.random_range(-self.spawn_radius..=self.spawn_radius),
                rng.random_range(-self.spawn_radius..=self.spawn_radius),
                rng.random_range(-self.spawn_radius..=self.spawn_radius),
            );
            let boid = Boid::new(
                self.center + offset,
                boundaries,
                template.params,
                template.behavior(),
            )
            .map_err(|source| SpawnError::InvalidTemplate { index, source })?;
            flock.push(boid);
        }
        Ok(flock)
    }
}
