//! Interfaces to the mesh-source and render collaborators.

use glam::Vec3;

use crate::error::JellyError;

/// Supplier of the rest pose.
///
/// A static mesh only implements [`MeshSource::rest_vertices`]. An animated
/// (skinned) source also returns a freshly baked pose from
/// [`MeshSource::refresh`] whenever one is available; it must have the same
/// length as the initial pose or it is ignored for that tick.
pub trait MeshSource {
    fn rest_vertices(&self) -> Result<Vec<Vec3>, JellyError>;

    fn refresh(&mut self) -> Option<Vec<Vec3>> {
        None
    }
}

/// Receiver of the deformed pose.
pub trait RenderSurface {
    /// Whether there is anything to render into. Checked at initialization.
    fn is_available(&self) -> bool {
        true
    }

    /// Upload the live pose. The receiver recomputes normals and bounds,
    /// and rebuilds its collider when `update_collider` is set.
    fn apply_positions(&mut self, positions: &[Vec3], update_collider: bool);

    /// `false` switches back to the undeformed source mesh (culled),
    /// `true` shows the deformed output again.
    fn show_deformed(&mut self, deformed: bool);
}

/// A fixed rest pose.
#[derive(Clone, Debug, Default)]
pub struct StaticMesh {
    pub vertices: Vec<Vec3>,
}

impl StaticMesh {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }
}

impl MeshSource for StaticMesh {
    fn rest_vertices(&self) -> Result<Vec<Vec3>, JellyError> {
        Ok(self.vertices.clone())
    }
}
