//! World-space motion of the rest pose.
//!
//! The sampler records where each *undeformed* vertex sits in world space
//! every tick. The integrator compares consecutive samples to tell how the
//! whole object moved, separately from how the jelly deformed.

use glam::{Mat4, Vec3};
use rayon::prelude::*;

/// Below this many vertices the transform runs on the calling thread.
const PARALLEL_SAMPLE_THRESHOLD: usize = 4096;

/// Transform every rest position into world space.
pub fn sample(rest_positions: &[Vec3], local_to_world: &Mat4, out: &mut [Vec3]) {
    debug_assert_eq!(rest_positions.len(), out.len());
    if rest_positions.len() >= PARALLEL_SAMPLE_THRESHOLD {
        out.par_iter_mut()
            .zip(rest_positions.par_iter())
            .for_each(|(w, r)| *w = local_to_world.transform_point3(*r));
    } else {
        for (w, r) in out.iter_mut().zip(rest_positions) {
            *w = local_to_world.transform_point3(*r);
        }
    }
}

/// Previous and current world-space rest positions.
#[derive(Clone, Debug, Default)]
pub struct MotionBuffers {
    pub world_prev: Vec<Vec3>,
    pub world_curr: Vec<Vec3>,
    primed: bool,
}

impl MotionBuffers {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            world_prev: vec![Vec3::ZERO; vertex_count],
            world_curr: vec![Vec3::ZERO; vertex_count],
            primed: false,
        }
    }

    /// Retire the current sample to `world_prev` and take a new one.
    ///
    /// The first sample after construction is copied into both buffers so
    /// the object does not receive an impulse from its spawn position.
    pub fn advance(&mut self, rest_positions: &[Vec3], local_to_world: &Mat4) {
        std::mem::swap(&mut self.world_prev, &mut self.world_curr);
        sample(rest_positions, local_to_world, &mut self.world_curr);
        if !self.primed {
            self.world_prev.copy_from_slice(&self.world_curr);
            self.primed = true;
        }
    }

    /// Make the next [`MotionBuffers::advance`] prime again.
    ///
    /// Used when the rest pose is replaced, so the difference between the
    /// old and new pose is not read as object motion.
    pub fn reprime(&mut self) {
        self.primed = false;
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn teardown(&mut self) {
        self.world_prev = Vec::new();
        self.world_curr = Vec::new();
        self.primed = false;
    }
}
