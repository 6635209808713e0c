//! Spatial queries backing per-tick neighbor refresh.

use std::collections::HashMap;

use nalgebra::Vector3;
use thiserror::Error;

/// Errors emitted by spatial query implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpatialError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Radius query over the positions captured by the last `rebuild`.
///
/// Membership uses the open boundary: a point exactly `radius` away is not
/// returned. Implementations may visit the querying agent's own index;
/// callers are responsible for filtering self out.
pub trait SpatialQuery {
    /// Rebuild internal structures from a tick-start position snapshot.
    fn rebuild(&mut self, positions: &[Vector3<f32>]) -> Result<(), SpatialError>;

    /// Visit the index of every captured position strictly within `radius`
    /// of `center`.
    fn within(&self, center: Vector3<f32>, radius: f32, visitor: &mut dyn FnMut(usize));
}

/// Perch-surface probe used by the perching overlay.
pub trait SurfaceQuery {
    /// True when any perchable surface overlaps the sphere at `center`.
    fn has_surface_within(&self, center: Vector3<f32>, radius: f32) -> bool;
}

/// Perchable ground plane filling the half-space below `height`.
#[derive(Debug, Clone, Copy)]
pub struct GroundPlane {
    pub height: f32,
}

impl SurfaceQuery for GroundPlane {
    fn has_surface_within(&self, center: Vector3<f32>, radius: f32) -> bool {
        center.y - radius < self.height
    }
}

/// Exhaustive scan over every captured position. The oracle implementation;
/// O(n) per query.
#[derive(Debug, Clone, Default)]
pub struct BruteForceIndex {
    positions: Vec<Vector3<f32>>,
}

impl BruteForceIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialQuery for BruteForceIndex {
    fn rebuild(&mut self, positions: &[Vector3<f32>]) -> Result<(), SpatialError> {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        Ok(())
    }

    fn within(&self, center: Vector3<f32>, radius: f32, visitor: &mut dyn FnMut(usize)) {
        let radius_sq = radius * radius;
        for (idx, position) in self.positions.iter().enumerate() {
            if (position - center).norm_squared() < radius_sq {
                visitor(idx);
            }
        }
    }
}

/// Uniform grid bucketing positions by `floor(coord / cell_size)`.
///
/// Queries scan the cell range covered by the radius, clamped to the occupied
/// bounds, so correctness does not depend on `cell_size` exceeding the query
/// radius.
#[derive(Debug, Clone)]
pub struct UniformGridIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32, i32), Vec<usize>>,
    positions: Vec<Vector3<f32>>,
    occupied_min: (i32, i32, i32),
    occupied_max: (i32, i32, i32),
}

impl UniformGridIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            positions: Vec::new(),
            occupied_min: (0, 0, 0),
            occupied_max: (-1, -1, -1),
        }
    }

    fn cell_of(&self, position: Vector3<f32>) -> (i32, i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
            (position.z / self.cell_size).floor() as i32,
        )
    }
}

impl Default for UniformGridIndex {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl SpatialQuery for UniformGridIndex {
    fn rebuild(&mut self, positions: &[Vector3<f32>]) -> Result<(), SpatialError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(SpatialError::InvalidConfig("cell_size must be positive"));
        }
        self.cells.clear();
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        self.occupied_min = (i32::MAX, i32::MAX, i32::MAX);
        self.occupied_max = (i32::MIN, i32::MIN, i32::MIN);
        for (idx, position) in positions.iter().enumerate() {
            let cell = self.cell_of(*position);
            self.occupied_min.0 = self.occupied_min.0.min(cell.0);
            self.occupied_min.1 = self.occupied_min.1.min(cell.1);
            self.occupied_min.2 = self.occupied_min.2.min(cell.2);
            self.occupied_max.0 = self.occupied_max.0.max(cell.0);
            self.occupied_max.1 = self.occupied_max.1.max(cell.1);
            self.occupied_max.2 = self.occupied_max.2.max(cell.2);
            self.cells.entry(cell).or_default().push(idx);
        }
        Ok(())
    }

    fn within(&self, center: Vector3<f32>, radius: f32, visitor: &mut dyn FnMut(usize)) {
        if self.positions.is_empty() {
            return;
        }
        let radius_sq = radius * radius;
        let reach = Vector3::repeat(radius);
        let lo = self.cell_of(center - reach);
        let hi = self.cell_of(center + reach);
        for x in lo.0.max(self.occupied_min.0)..=hi.0.min(self.occupied_max.0) {
            for y in lo.1.max(self.occupied_min.1)..=hi.1.min(self.occupied_max.1) {
                for z in lo.2.max(self.occupied_min.2)..=hi.2.min(self.occupied_max.2) {
                    let Some(bucket) = self.cells.get(&(x, y, z)) else {
                        continue;
                    };
                    for &idx in bucket {
                        if (self.positions[idx] - center).norm_squared() < radius_sq {
                            visitor(idx);
                        }
                    }
                }
            }
        }
    }
}
