//! Runtime-mutable simulation parameters.
//!
//! Every numeric field has a documented range; [`JellyConfig::sanitized`]
//! clamps into it. The simulation always reads a sanitized copy, so values
//! written through `config_mut` never reach the integrator out of range.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::JellyError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JellyConfig {
    /// Scale of the inertial force from object motion. Range [0.1, 20]
    pub intensity: f32,
    /// Per-vertex mass. Range [0.1, 20]
    pub mass: f32,
    /// Spring constant pulling vertices back to rest. Range [0.1, 50]
    pub stiffness: f32,
    /// Velocity decay per second. Range [0.1, 30]
    pub damping: f32,
    /// Distance from the pivot at which motion reaches full effect. Range [0.01, 10]
    #[serde(alias = "falloff")]
    pub distance_falloff: f32,
    /// How strongly the original pivot distance is enforced. Range [0, 1]
    pub radius_constraint_strength: f32,
    /// Scale of the world-motion coupling. Range [0.1, 10]
    pub movement_influence: f32,
    /// 0 = full quality, 1 = cheapest cadence. Range [0, 1]
    pub performance_level: f32,
    /// Viewer distance at or below which full quality is used. Range [1, 50]
    pub min_lod_distance: f32,
    /// Viewer distance at or beyond which simulation is culled. Range [10, 200]
    pub max_lod_distance: f32,

    pub maintain_radius: bool,
    pub use_lod: bool,
    /// Forwarded to the render surface with every pose update.
    pub update_mesh_collider: bool,
}

impl Default for JellyConfig {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            mass: 1.0,
            stiffness: 5.0,
            damping: 2.0,
            distance_falloff: 1.0,
            radius_constraint_strength: 0.5,
            movement_influence: 1.0,
            performance_level: 0.0,
            min_lod_distance: 5.0,
            max_lod_distance: 50.0,
            maintain_radius: true,
            use_lod: false,
            update_mesh_collider: false,
        }
    }
}

impl JellyConfig {
    /// A copy with every numeric field clamped to its range.
    ///
    /// NaN inputs fall back to the default value of that field.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let min_lod_distance = clamp_or(self.min_lod_distance, 1.0, 50.0, d.min_lod_distance);
        Self {
            intensity: clamp_or(self.intensity, 0.1, 20.0, d.intensity),
            mass: clamp_or(self.mass, 0.1, 20.0, d.mass),
            stiffness: clamp_or(self.stiffness, 0.1, 50.0, d.stiffness),
            damping: clamp_or(self.damping, 0.1, 30.0, d.damping),
            distance_falloff: clamp_or(self.distance_falloff, 0.01, 10.0, d.distance_falloff),
            radius_constraint_strength: clamp_or(
                self.radius_constraint_strength,
                0.0,
                1.0,
                d.radius_constraint_strength,
            ),
            movement_influence: clamp_or(self.movement_influence, 0.1, 10.0, d.movement_influence),
            performance_level: clamp_or(self.performance_level, 0.0, 1.0, d.performance_level),
            min_lod_distance,
            max_lod_distance: clamp_or(self.max_lod_distance, 10.0, 200.0, d.max_lod_distance)
                .max(min_lod_distance),
            ..self.clone()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, JellyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load_json(path: &Path) -> Result<Self, JellyError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save this config to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<(), JellyError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
