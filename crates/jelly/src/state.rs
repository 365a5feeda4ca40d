//! Per-instance simulation state: vertex buffers, motion samples and pivot.
//!
//! This is the unit the pipeline moves into an integration job and gets
//! back on join.

use glam::{Mat4, Vec3};

use crate::error::JellyError;
use crate::motion::MotionBuffers;
use crate::pivot;
use crate::vertex::{VertexRecord, VertexStore};

#[derive(Clone, Debug)]
pub struct SimulationState {
    pub store: VertexStore,
    pub motion: MotionBuffers,
    /// Deformation center in local space
    pub pivot_local: Vec3,
    /// Mean of the current rest pose, the pivot when no anchor is set
    pub centroid_local: Vec3,
}

impl SimulationState {
    /// Allocate state for `rest` with the pivot at the rest centroid.
    pub fn new(rest: &[Vec3]) -> Result<Self, JellyError> {
        if rest.is_empty() {
            return Err(JellyError::EmptyMesh);
        }
        let centroid_local = pivot::centroid(rest);
        let mut state = Self {
            store: VertexStore::initialize(rest),
            motion: MotionBuffers::new(rest.len()),
            pivot_local: centroid_local,
            centroid_local,
        };
        state.set_pivot(centroid_local);
        Ok(state)
    }

    pub fn vertex_count(&self) -> usize {
        self.store.len()
    }

    pub fn vertex(&self, index: usize) -> Option<VertexRecord> {
        self.store.record(index)
    }

    /// Move the pivot and rebuild every rest distance against it.
    pub fn set_pivot(&mut self, pivot_local: Vec3) {
        self.pivot_local = pivot_local;
        pivot::recompute_rest_distances(
            &self.store.rest,
            pivot_local,
            &mut self.store.rest_distance,
        );
    }

    /// Apply `candidate` if it moved beyond the threshold, or unconditionally
    /// when `force` is set. Returns whether rest distances were rebuilt.
    pub fn update_pivot(&mut self, candidate: Vec3, force: bool) -> bool {
        if force || pivot::pivot_changed(candidate, self.pivot_local) {
            self.set_pivot(candidate);
            true
        } else {
            false
        }
    }

    /// Accept a re-baked rest pose and refresh the centroid.
    ///
    /// The next motion sample primes both buffers. Rest distances are stale
    /// afterwards until the next `update_pivot`.
    pub fn replace_rest_pose(&mut self, rest: &[Vec3]) -> Result<(), JellyError> {
        self.store.replace_rest_pose(rest)?;
        self.centroid_local = pivot::centroid(rest);
        self.motion.reprime();
        Ok(())
    }

    /// The custom pivot if one is given, otherwise the cached centroid.
    pub fn pivot_candidate(&self, custom_pivot_local: Option<Vec3>) -> Vec3 {
        custom_pivot_local.unwrap_or(self.centroid_local)
    }

    /// Sample the rest pose into world space for this tick.
    pub fn sample_motion(&mut self, local_to_world: &Mat4) {
        self.motion.advance(&self.store.rest, local_to_world);
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }

    pub fn teardown(&mut self) {
        self.store.teardown();
        self.motion.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(SimulationState::new(&[]), Err(JellyError::EmptyMesh)));
    }

    #[test]
    fn test_new_builds_rest_distances() {
        let state =
            SimulationState::new(&[Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]).unwrap();
        assert_eq!(state.pivot_local, Vec3::ZERO);
        assert_eq!(state.store.rest_distance, vec![2.0, 2.0]);
    }

    #[test]
    fn test_update_pivot_is_idempotent() {
        let mut state = SimulationState::new(&[Vec3::X, -Vec3::X]).unwrap();
        assert!(state.update_pivot(Vec3::new(0.0, 1.0, 0.0), false));
        let distances = state.store.rest_distance.clone();
        assert!(!state.update_pivot(Vec3::new(0.0, 1.0, 0.0), false));
        assert_eq!(state.store.rest_distance, distances);
    }

    #[test]
    fn test_replace_rest_pose_moves_centroid() {
        let mut state = SimulationState::new(&[Vec3::X, -Vec3::X]).unwrap();
        state
            .replace_rest_pose(&[Vec3::new(2.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)])
            .unwrap();
        assert_eq!(state.centroid_local, Vec3::new(1.0, 1.0, 0.0));
        assert!(state.update_pivot(state.centroid_local, true));
        assert_eq!(state.store.rest_distance, vec![1.0, 1.0]);
    }

    #[test]
    fn test_replaced_pose_is_not_motion() {
        let mut state = SimulationState::new(&[Vec3::X, -Vec3::X]).unwrap();
        state.sample_motion(&Mat4::IDENTITY);
        state
            .replace_rest_pose(&[Vec3::X * 2.0, -Vec3::X * 2.0])
            .unwrap();
        state.sample_motion(&Mat4::IDENTITY);
        assert_eq!(state.motion.world_prev, state.motion.world_curr);
        assert_eq!(state.motion.world_curr[0], Vec3::new(2.0, 0.0, 0.0));

        // Real motion after the rebake is still seen.
        state.sample_motion(&Mat4::from_translation(Vec3::Y));
        assert_eq!(
            state.motion.world_curr[0] - state.motion.world_prev[0],
            Vec3::Y
        );
    }

    #[test]
    fn test_pivot_candidate_prefers_custom() {
        let state = SimulationState::new(&[Vec3::new(3.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]).unwrap();
        assert_eq!(state.pivot_candidate(None), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(state.pivot_candidate(Some(Vec3::Z)), Vec3::Z);
    }
}
