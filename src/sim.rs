//! Per-tick orchestration: neighbor refresh, steering, integration, and the
//! transform write-out.

use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::debug;

use crate::boids::Boid;
use crate::perch::Behavior;
use crate::spatial::{SpatialError, SpatialQuery, SurfaceQuery, UniformGridIndex};

/// Receives the position of every boid once per tick. The simulation's only
/// required write-out to the host world.
pub trait TransformSink {
    fn set_world_position(&mut self, index: usize, position: Vector3<f32>);
}

/// Drives a flock through fixed-order ticks.
///
/// Every update is computed against a snapshot of the flock taken at tick
/// start and applied once all boids have been processed, so a tick observes a
/// simultaneous view of the population regardless of processing order.
pub struct Simulation {
    boids: Vec<Boid>,
    index: Box<dyn SpatialQuery + Send + Sync>,
    surfaces: Option<Box<dyn SurfaceQuery + Send + Sync>>,
    sink: Option<Box<dyn TransformSink>>,
}

impl Simulation {
    /// Build a simulation over `boids`, indexed by a uniform grid sized to
    /// the largest sensing radius in the flock.
    pub fn new(boids: Vec<Boid>) -> Self {
        let cell_size = boids
            .iter()
            .map(|b| b.params.neighbor_radius)
            .fold(0.0_f32, f32::max);
        let index = UniformGridIndex::new(if cell_size > 0.0 { cell_size } else { 50.0 });
        Self {
            boids,
            index: Box::new(index),
            surfaces: None,
            sink: None,
        }
    }

    /// Replace the spatial query implementation.
    pub fn with_index(mut self, index: Box<dyn SpatialQuery + Send + Sync>) -> Self {
        self.index = index;
        self
    }

    /// Attach the perch-surface probe consumed by perch-capable boids.
    pub fn with_surfaces(mut self, surfaces: Box<dyn SurfaceQuery + Send + Sync>) -> Self {
        self.surfaces = Some(surfaces);
        self
    }

    /// Attach the per-tick position write-out.
    pub fn with_transform_sink(mut self, sink: Box<dyn TransformSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }

    /// Remove a boid immediately. Neighbor sets are rebuilt from a fresh
    /// query every tick, so no other boid can retain a stale reference to it.
    /// Indices shift the way `Vec::swap_remove` shifts them.
    pub fn remove(&mut self, index: usize) -> Boid {
        self.boids.swap_remove(index)
    }

    /// Advance the whole flock by one tick of `dt` seconds, `dt` being the
    /// host clock's elapsed time since the previous tick.
    pub fn step(&mut self, dt: f32) -> Result<(), SpatialError> {
        let positions: Vec<Vector3<f32>> = self.boids.iter().map(|b| b.position).collect();
        self.index.rebuild(&positions)?;

        let snapshot = std::mem::take(&mut self.boids);
        let index: &(dyn SpatialQuery + Send + Sync) = self.index.as_ref();
        let surfaces = self.surfaces.as_deref();

        // Gather all the changes against the snapshot, then apply.
        let next: Vec<Boid> = snapshot
            .par_iter()
            .enumerate()
            .map(|(i, boid)| {
                let mut next = boid.clone();

                next.neighbors.clear();
                index.within(next.position, next.params.neighbor_radius, &mut |idx| {
                    if idx != i {
                        next.neighbors.push(idx);
                    }
                });

                let acceleration = next.steering(&snapshot);

                // The surface probe rides the boundary step, so disabling
                // boundaries also disables perch detection.
                if next.params.use_boundaries {
                    if let (Behavior::Perch(perch), Some(surfaces)) =
                        (&mut next.behavior, surfaces)
                    {
                        if surfaces.has_surface_within(next.position, next.params.neighbor_radius)
                        {
                            perch.on_surface_contact(next.position);
                        }
                    }
                }

                next.integrate(acceleration, dt);

                if let Behavior::Perch(perch) = &mut next.behavior {
                    if let Some(anchor) = perch.advance(dt) {
                        next.position = anchor;
                    }
                }

                next
            })
            .collect();

        self.boids = next;

        if let Some(sink) = &mut self.sink {
            for (i, boid) in self.boids.iter().enumerate() {
                sink.set_world_position(i, boid.position);
            }
        }
        debug!(boids = self.boids.len(), dt, "tick complete");
        Ok(())
    }

    /// Run `ticks` consecutive steps with a fixed `dt`.
    pub fn run(&mut self, ticks: u64, dt: f32) -> Result<(), SpatialError> {
        for _ in 0..ticks {
            self.step(dt)?;
        }
        Ok(())
    }
}
