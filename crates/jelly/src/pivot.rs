//! Deformation pivot and the rest-distance table derived from it.

use glam::{Mat4, Vec3};

use crate::constants::PIVOT_MOVE_EPSILON_SQ;

/// An external pivot supplied by the transform provider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PivotAnchor {
    /// World-space position of the pivot transform
    pub world_position: Vec3,
    /// Whether the pivot transform is parented under the owner
    pub attached_to_owner: bool,
}

impl PivotAnchor {
    pub fn attached(world_position: Vec3) -> Self {
        Self {
            world_position,
            attached_to_owner: true,
        }
    }

    /// The anchor position in the owner's local space.
    pub fn to_local(&self, world_to_local: &Mat4) -> Vec3 {
        world_to_local.transform_point3(self.world_position)
    }
}

/// Arithmetic mean of the rest positions. An empty pose centers on the origin.
pub fn centroid(rest_positions: &[Vec3]) -> Vec3 {
    if rest_positions.is_empty() {
        return Vec3::ZERO;
    }
    let sum: Vec3 = rest_positions.iter().copied().sum();
    sum / rest_positions.len() as f32
}

/// Rebuild `|rest[i] - pivot|` for every vertex.
pub fn recompute_rest_distances(rest_positions: &[Vec3], pivot: Vec3, out: &mut [f32]) {
    debug_assert_eq!(rest_positions.len(), out.len());
    for (d, r) in out.iter_mut().zip(rest_positions) {
        *d = r.distance(pivot);
    }
}

/// True when the pivot moved far enough that rest distances are stale.
pub fn pivot_changed(current: Vec3, previous: Vec3) -> bool {
    current.distance_squared(previous) > PIVOT_MOVE_EPSILON_SQ
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_corners() -> Vec<Vec3> {
        let mut corners = Vec::new();
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    corners.push(Vec3::new(x, y, z) + Vec3::new(2.0, 0.0, 0.0));
                }
            }
        }
        corners
    }

    #[test]
    fn test_centroid_of_cube() {
        let c = centroid(&cube_corners());
        assert!((c - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_centroid_empty() {
        assert_eq!(centroid(&[]), Vec3::ZERO);
    }

    #[test]
    fn test_rest_distances_match_pivot() {
        let rest = cube_corners();
        let pivot = Vec3::new(0.3, -0.2, 1.5);
        let mut distances = vec![0.0; rest.len()];
        recompute_rest_distances(&rest, pivot, &mut distances);
        for (r, d) in rest.iter().zip(&distances) {
            assert!((d - (*r - pivot).length()).abs() < 1e-5);
        }
    }

    #[test]
    fn test_pivot_changed_threshold() {
        let a = Vec3::ZERO;
        assert!(!pivot_changed(Vec3::new(0.005, 0.0, 0.0), a));
        assert!(pivot_changed(Vec3::new(0.02, 0.0, 0.0), a));
        assert!(!pivot_changed(a, a));
    }

    #[test]
    fn test_anchor_to_local() {
        let owner = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let anchor = PivotAnchor::attached(Vec3::new(11.0, 1.0, 0.0));
        let local = anchor.to_local(&owner.inverse());
        assert!((local - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
    }
}
