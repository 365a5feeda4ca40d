//! Per-vertex buffers: rest pose, live pose, velocity and rest distance.
//!
//! Stored as parallel flat arrays so the live pose can be handed to the
//! renderer without a gather and the integrator can split them across
//! worker threads independently.

use glam::Vec3;

use crate::error::JellyError;

/// One vertex of the simulation, copied out of the store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexRecord {
    /// Local-space position at rest
    pub rest_position: Vec3,
    /// Current deformed local-space position
    pub live_position: Vec3,
    /// Current local-space velocity
    pub velocity: Vec3,
    /// Distance from the rest position to the pivot at last recompute
    pub rest_distance: f32,
}

/// Flat per-vertex arrays, all of identical length.
#[derive(Clone, Debug, Default)]
pub struct VertexStore {
    pub rest: Vec<Vec3>,
    pub live: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    pub rest_distance: Vec<f32>,
}

impl VertexStore {
    /// Allocate every buffer sized to `rest` with the live pose at rest.
    pub fn initialize(rest: &[Vec3]) -> Self {
        Self {
            rest: rest.to_vec(),
            live: rest.to_vec(),
            velocity: vec![Vec3::ZERO; rest.len()],
            rest_distance: vec![0.0; rest.len()],
        }
    }

    /// Put every vertex back at rest without reallocating.
    pub fn reset(&mut self) {
        self.live.copy_from_slice(&self.rest);
        self.velocity.fill(Vec3::ZERO);
    }

    /// Release all buffers. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.rest = Vec::new();
        self.live = Vec::new();
        self.velocity = Vec::new();
        self.rest_distance = Vec::new();
    }

    /// Accept a re-baked rest pose of the same length.
    ///
    /// The live pose and velocities are kept; the caller must rebuild rest
    /// distances before the next integration.
    pub fn replace_rest_pose(&mut self, rest: &[Vec3]) -> Result<(), JellyError> {
        if rest.len() != self.rest.len() {
            return Err(JellyError::VertexCountMismatch {
                expected: self.rest.len(),
                actual: rest.len(),
            });
        }
        self.rest.copy_from_slice(rest);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Copy out a single vertex.
    pub fn record(&self, index: usize) -> Option<VertexRecord> {
        Some(VertexRecord {
            rest_position: *self.rest.get(index)?,
            live_position: *self.live.get(index)?,
            velocity: *self.velocity.get(index)?,
            rest_distance: *self.rest_distance.get(index)?,
        })
    }

    /// Copy the live pose into `out`, reusing its allocation.
    pub fn live_positions_into(&self, out: &mut Vec<Vec3>) {
        out.clear();
        out.extend_from_slice(&self.live);
    }

    /// Live positions as a flat `[x, y, z, x, y, z, ...]` slice for uploads.
    pub fn as_flat_f32(&self) -> &[f32] {
        bytemuck::cast_slice(&self.live)
    }

    /// True when every vertex is exactly at rest with zero velocity.
    pub fn is_at_rest(&self) -> bool {
        self.live == self.rest && self.velocity.iter().all(|v| *v == Vec3::ZERO)
    }
}
