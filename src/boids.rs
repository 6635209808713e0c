use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::perch::Behavior;
use crate::{BoidError, BoidParams};

/// Damping divisor applied to the alignment velocity-matching term.
pub const ALIGNMENT_DAMPING: f32 = 8.0;
/// Damping divisor applied to the cohesion centering term.
pub const COHESION_DAMPING: f32 = 100.0;

/// A single flocking agent.
///
/// Neighbor indices refer into the tick-start snapshot of the flock and are
/// fully rebuilt every tick; they never include the boid's own index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boid {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub params: BoidParams,
    pub boundary_min: Vector3<f32>,
    pub boundary_max: Vector3<f32>,
    pub behavior: Behavior,
    #[serde(skip)]
    pub(crate) neighbors: Vec<usize>,
}

impl Boid {
    /// Create a boid at `position` inside the shared boundary box.
    ///
    /// Fails when the tuning values cannot describe a valid sensing body;
    /// such a boid is never admitted to the simulation.
    pub fn new(
        position: Vector3<f32>,
        boundaries: (Vector3<f32>, Vector3<f32>),
        params: BoidParams,
        behavior: Behavior,
    ) -> Result<Self, BoidError> {
        params.validate()?;
        if let Behavior::Perch(perch) = &behavior {
            perch.params.validate()?;
        }
        if !position.iter().all(|c| c.is_finite()) {
            return Err(BoidError::NonFinite("position"));
        }
        Ok(Self {
            position,
            velocity: Vector3::zeros(),
            params,
            boundary_min: boundaries.0,
            boundary_max: boundaries.1,
            behavior,
            neighbors: Vec::new(),
        })
    }

    /// Indices of the neighbors found by the last refresh.
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// Hard cap on speed: `max_speed * acceleration_scale`.
    pub fn speed_limit(&self) -> f32 {
        self.params.max_speed * self.params.acceleration_scale
    }

    /// Push away from every neighbor closer than `separation_radius`.
    ///
    /// The push is per offending neighbor, not distance-scaled; the zero
    /// vector when nothing violates the radius.
    pub fn separation(&self, flock: &[Boid]) -> Vector3<f32> {
        let mut push = Vector3::zeros();
        for &idx in &self.neighbors {
            let offset = flock[idx].position - self.position;
            if offset.norm() < self.params.separation_radius {
                push -= offset;
            }
        }
        push
    }

    /// Match the average neighbor velocity, damped.
    ///
    /// With no neighbors the average is the zero vector, so this yields
    /// `-velocity / 8`, a slight self-deceleration.
    pub fn alignment(&self, flock: &[Boid]) -> Vector3<f32> {
        let mut average = Vector3::zeros();
        for &idx in &self.neighbors {
            average += flock[idx].velocity;
        }
        if !self.neighbors.is_empty() {
            average /= self.neighbors.len() as f32;
        }
        (average - self.velocity) / ALIGNMENT_DAMPING
    }

    /// Steer toward the average neighbor position, damped. Zero vector when
    /// there are no neighbors.
    pub fn cohesion(&self, flock: &[Boid]) -> Vector3<f32> {
        if self.neighbors.is_empty() {
            return Vector3::zeros();
        }
        let mut center = Vector3::zeros();
        for &idx in &self.neighbors {
            center += flock[idx].position;
        }
        center /= self.neighbors.len() as f32;
        (center - self.position) / COHESION_DAMPING
    }

    /// Bang-bang containment force: one unit inward per axis outside the
    /// boundary box, scaled by `boundary_strength`.
    pub fn boundary(&self) -> Vector3<f32> {
        let mut force = Vector3::zeros();
        for axis in 0..3 {
            if self.position[axis] < self.boundary_min[axis] {
                force[axis] = 1.0;
            } else if self.position[axis] > self.boundary_max[axis] {
                force[axis] = -1.0;
            }
        }
        force * self.params.boundary_strength
    }

    /// Combined steering acceleration for this tick. The containment force
    /// only contributes when `use_boundaries` is set.
    pub fn steering(&self, flock: &[Boid]) -> Vector3<f32> {
        let boundary = if self.params.use_boundaries {
            self.boundary()
        } else {
            Vector3::zeros()
        };
        self.separation(flock) + self.alignment(flock) + self.cohesion(flock) + boundary
    }

    /// Apply one integration step: accelerate, clamp speed, advance position.
    pub(crate) fn integrate(&mut self, acceleration: Vector3<f32>, dt: f32) {
        self.velocity += acceleration * dt * self.params.acceleration_scale;
        self.limit_velocity();
        self.position += self.velocity * dt;
    }

    /// Rescale the velocity onto the speed limit, preserving direction. A
    /// zero velocity is left untouched.
    fn limit_velocity(&mut self) {
        let limit = self.speed_limit();
        let speed = self.velocity.norm();
        if speed > limit && speed > 0.0 {
            self.velocity *= limit / speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn boid_at(x: f32, y: f32, z: f32) -> Boid {
        let bounds = (Vector3::repeat(-10.0), Vector3::repeat(10.0));
        Boid::new(
            Vector3::new(x, y, z),
            bounds,
            BoidParams::default(),
            Behavior::Free,
        )
        .expect("valid boid")
    }

    fn linked_pair(distance: f32) -> Vec<Boid> {
        let mut a = boid_at(0.0, 0.0, 0.0);
        let mut b = boid_at(distance, 0.0, 0.0);
        a.neighbors = vec![1];
        b.neighbors = vec![0];
        vec![a, b]
    }

    #[test]
    fn creation_rejects_invalid_params() {
        let bounds = (Vector3::repeat(-10.0), Vector3::repeat(10.0));
        let params = BoidParams {
            max_speed: -1.0,
            ..BoidParams::default()
        };
        let result = Boid::new(Vector3::zeros(), bounds, params, Behavior::Free);
        assert_eq!(result.unwrap_err(), BoidError::NonPositive("max_speed"));
    }

    #[test]
    fn creation_rejects_non_finite_position() {
        let bounds = (Vector3::repeat(-10.0), Vector3::repeat(10.0));
        let result = Boid::new(
            Vector3::new(f32::INFINITY, 0.0, 0.0),
            bounds,
            BoidParams::default(),
            Behavior::Free,
        );
        assert_eq!(result.unwrap_err(), BoidError::NonFinite("position"));
    }

    #[test]
    fn separation_is_zero_outside_separation_radius() {
        // Neighbors at 6 units with a separation radius of 5.
        let flock = linked_pair(6.0);
        assert_eq!(flock[0].separation(&flock), Vector3::zeros());
        assert_eq!(flock[1].separation(&flock), Vector3::zeros());
    }

    #[test]
    fn separation_pushes_close_boids_apart_symmetrically() {
        let flock = linked_pair(1.0);
        let fa = flock[0].separation(&flock);
        let fb = flock[1].separation(&flock);
        assert!(fa.x < 0.0, "left boid pushed further left, got {fa:?}");
        assert!(fb.x > 0.0, "right boid pushed further right, got {fb:?}");
        assert!((fa.norm() - fb.norm()).abs() < EPS);
        assert!((fa + fb).norm() < EPS, "forces must cancel in aggregate");
    }

    #[test]
    fn separation_is_not_distance_scaled() {
        // One offender contributes exactly the negated offset.
        let flock = linked_pair(4.0);
        let force = flock[0].separation(&flock);
        assert!((force - Vector3::new(-4.0, 0.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn alignment_without_neighbors_damps_own_velocity() {
        let mut boid = boid_at(0.0, 0.0, 0.0);
        boid.velocity = Vector3::new(8.0, -16.0, 4.0);
        let force = boid.alignment(&[]);
        assert!((force - Vector3::new(-1.0, 2.0, -0.5)).norm() < EPS);
    }

    #[test]
    fn alignment_matches_average_neighbor_velocity() {
        let mut flock = linked_pair(6.0);
        flock[1].velocity = Vector3::new(8.0, 0.0, 0.0);
        let force = flock[0].alignment(&flock);
        assert!((force - Vector3::new(1.0, 0.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn cohesion_without_neighbors_is_zero() {
        let mut boid = boid_at(3.0, -7.0, 2.0);
        boid.velocity = Vector3::new(1.0, 1.0, 1.0);
        assert_eq!(boid.cohesion(&[]), Vector3::zeros());
    }

    #[test]
    fn cohesion_steers_toward_neighbor_center() {
        let flock = linked_pair(8.0);
        let force = flock[0].cohesion(&flock);
        assert!((force - Vector3::new(0.08, 0.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn boundary_force_is_unit_per_axis_before_scaling() {
        let mut boid = boid_at(0.0, 0.0, 0.0);
        boid.position = Vector3::new(-11.0, 11.0, 0.0);
        let force = boid.boundary();
        assert_eq!(force, Vector3::new(1.0, -1.0, 0.0));
    }

    #[test]
    fn boundary_force_scales_with_strength() {
        let mut boid = boid_at(0.0, 0.0, 0.0);
        boid.params.boundary_strength = 2.0;
        boid.position.x = boid.boundary_min.x - 1.0;
        assert_eq!(boid.boundary(), Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn steering_skips_boundary_when_disabled() {
        let mut boid = boid_at(0.0, 0.0, 0.0);
        boid.params.use_boundaries = false;
        boid.position = Vector3::new(-50.0, 0.0, 0.0);
        // No neighbors and zero velocity: every remaining term vanishes.
        assert_eq!(boid.steering(&[]), Vector3::zeros());
    }

    #[test]
    fn velocity_clamp_preserves_direction() {
        let mut boid = boid_at(0.0, 0.0, 0.0);
        boid.velocity = Vector3::new(300.0, 400.0, 0.0);
        boid.limit_velocity();
        let limit = boid.speed_limit();
        assert!((boid.velocity.norm() - limit).abs() < 1e-3);
        assert!((boid.velocity.x / boid.velocity.y - 0.75).abs() < EPS);
    }

    #[test]
    fn velocity_clamp_leaves_zero_velocity_alone() {
        let mut boid = boid_at(0.0, 0.0, 0.0);
        boid.limit_velocity();
        assert_eq!(boid.velocity, Vector3::zeros());
        assert!(boid.velocity.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn integrate_applies_acceleration_scale_and_dt() {
        let mut boid = boid_at(0.0, 0.0, 0.0);
        boid.params.acceleration_scale = 1.0;
        boid.integrate(Vector3::new(2.0, 0.0, 0.0), 1.0);
        assert!((boid.velocity - Vector3::new(2.0, 0.0, 0.0)).norm() < EPS);
        assert!((boid.position - Vector3::new(2.0, 0.0, 0.0)).norm() < EPS);
    }
}
