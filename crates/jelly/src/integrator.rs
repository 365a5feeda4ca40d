//! Per-vertex spring-damper integrator.
//!
//! Each vertex is updated from its own rest position, live position,
//! velocity, rest distance and world-space motion sample. Nothing is read
//! across vertices, so the kernel runs as a flat `par_iter_mut`.
//!
//! Per vertex, in order:
//! 1. Skip vertices coincident with the pivot
//! 2. Inertial force from the object's own motion, scaled by distance to pivot
//! 3. Spring force back toward rest
//! 4. Damping (saturating at zero, never reversing velocity)
//! 5. Explicit Euler position update
//! 6. Optional radius constraint toward the rest distance from the pivot

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::config::JellyConfig;
use crate::constants::{
    CENTER_EPSILON, RADIAL_VELOCITY_STRENGTH, RADIUS_BLEND_RATE, RADIUS_EPSILON,
};
use crate::state::SimulationState;

/// Inputs shared by every vertex for one integration call.
#[derive(Clone, Copy, Debug)]
pub struct KernelParams {
    pub intensity: f32,
    pub mass: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub distance_falloff: f32,
    pub movement_influence: f32,
    pub maintain_radius: bool,
    pub radius_constraint_strength: f32,
    /// Deformation center in local space
    pub pivot: Vec3,
    /// Current world-to-local transform of the owner
    pub world_to_local: Mat4,
    /// Integration step (seconds)
    pub dt: f32,
}

impl KernelParams {
    pub fn from_config(config: &JellyConfig, pivot: Vec3, world_to_local: Mat4, dt: f32) -> Self {
        Self {
            intensity: config.intensity,
            mass: config.mass,
            stiffness: config.stiffness,
            damping: config.damping,
            distance_falloff: config.distance_falloff,
            movement_influence: config.movement_influence,
            maintain_radius: config.maintain_radius,
            radius_constraint_strength: config.radius_constraint_strength,
            pivot,
            world_to_local,
            dt,
        }
    }
}

/// Advance one vertex by `params.dt`.
#[inline]
pub fn integrate_vertex(
    params: &KernelParams,
    rest: Vec3,
    rest_distance: f32,
    world_prev: Vec3,
    world_curr: Vec3,
    position: &mut Vec3,
    velocity: &mut Vec3,
) {
    let dt = params.dt;
    let dist_from_center = (rest - params.pivot).length();
    if dist_from_center < CENTER_EPSILON {
        return;
    }

    let distance_factor = if params.distance_falloff > 0.0 {
        (dist_from_center / params.distance_falloff).clamp(0.0, 1.0)
    } else {
        1.0
    };

    // Transform both endpoints rather than the delta so translation cancels
    // and only the rotation/scale-induced displacement remains.
    let world_delta = world_curr - world_prev;
    let local_delta = params.world_to_local.transform_point3(world_prev + world_delta)
        - params.world_to_local.transform_point3(world_prev);

    let force = local_delta * params.movement_influence * distance_factor * params.intensity;
    let mut v = *velocity + force / params.mass * dt;

    v -= (*position - rest) * params.stiffness * dt;
    v *= (1.0 - params.damping * dt).max(0.0);

    let mut p = *position + v * dt;

    if params.maintain_radius && rest_distance > RADIUS_EPSILON {
        let current_rel = p - params.pivot;
        let current_dist = current_rel.length();
        if (current_dist - rest_distance).abs() > RADIUS_EPSILON {
            let direction = current_rel / current_dist.max(RADIUS_EPSILON);
            let target = params.pivot + direction * rest_distance;
            let strength = params.radius_constraint_strength;
            let blend = (strength * dt * RADIUS_BLEND_RATE).min(1.0);
            p = p.lerp(target, blend);

            if strength > RADIAL_VELOCITY_STRENGTH {
                v -= direction * v.dot(direction) * strength;
            }
        }
    }

    *position = p;
    *velocity = v;
}

/// Run the kernel over every vertex of `state`.
///
/// `batch_size` is the minimum number of vertices handed to one worker.
pub fn integrate(state: &mut SimulationState, params: &KernelParams, batch_size: usize) {
    let rest = &state.store.rest;
    let rest_distance = &state.store.rest_distance;
    let world_prev = &state.motion.world_prev;
    let world_curr = &state.motion.world_curr;

    state
        .store
        .live
        .par_iter_mut()
        .zip(state.store.velocity.par_iter_mut())
        .enumerate()
        .with_min_len(batch_size.max(1))
        .for_each(|(i, (position, velocity))| {
            integrate_vertex(
                params,
                rest[i],
                rest_distance[i],
                world_prev[i],
                world_curr[i],
                position,
                velocity,
            );
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parameters with every force disabled.
    fn quiet_params(dt: f32) -> KernelParams {
        KernelParams {
            intensity: 1.0,
            mass: 1.0,
            stiffness: 0.0,
            damping: 0.0,
            distance_falloff: 2.0,
            movement_influence: 1.0,
            maintain_radius: false,
            radius_constraint_strength: 0.0,
            pivot: Vec3::ZERO,
            world_to_local: Mat4::IDENTITY,
            dt,
        }
    }

    #[test]
    fn test_inertial_force_single_step() {
        let params = quiet_params(0.1);
        let rest = Vec3::new(2.0, 0.0, 0.0);
        let mut p = rest;
        let mut v = Vec3::ZERO;
        integrate_vertex(&params, rest, 2.0, rest, rest + Vec3::X, &mut p, &mut v);
        assert!((v - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-6, "v = {:?}", v);
        assert!((p - Vec3::new(2.01, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_spring_single_step() {
        let params = KernelParams {
            stiffness: 10.0,
            ..quiet_params(0.1)
        };
        let rest = Vec3::new(2.0, 0.0, 0.0);
        let mut p = rest + Vec3::X;
        let mut v = Vec3::ZERO;
        integrate_vertex(&params, rest, 2.0, rest, rest, &mut p, &mut v);
        assert!((v - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-6, "v = {:?}", v);
    }

    #[test]
    fn test_center_vertex_untouched() {
        let params = KernelParams {
            stiffness: 10.0,
            damping: 1.0,
            maintain_radius: true,
            radius_constraint_strength: 1.0,
            ..quiet_params(0.1)
        };
        let mut p = Vec3::new(0.0, 0.5, 0.0);
        let mut v = Vec3::new(1.0, 2.0, 3.0);
        integrate_vertex(&params, Vec3::ZERO, 0.0, Vec3::ZERO, Vec3::X, &mut p, &mut v);
        assert_eq!(p, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_damping_saturates_at_zero() {
        let params = KernelParams {
            damping: 30.0,
            ..quiet_params(0.1)
        };
        let rest = Vec3::new(2.0, 0.0, 0.0);
        let mut p = rest;
        let mut v = Vec3::new(5.0, 0.0, 0.0);
        integrate_vertex(&params, rest, 2.0, rest, rest, &mut p, &mut v);
        assert_eq!(v, Vec3::ZERO);
        assert_eq!(p, rest);
    }

    #[test]
    fn test_distance_factor_scales_force() {
        let params = KernelParams {
            distance_falloff: 4.0,
            ..quiet_params(0.1)
        };
        let rest = Vec3::new(1.0, 0.0, 0.0);
        let mut p = rest;
        let mut v = Vec3::ZERO;
        integrate_vertex(&params, rest, 1.0, rest, rest + Vec3::Y, &mut p, &mut v);
        // distance 1 / falloff 4 -> quarter strength
        assert!((v.y - 0.025).abs() < 1e-6);
    }

    #[test]
    fn test_world_motion_mapped_into_local_axes() {
        let to_world = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let params = KernelParams {
            world_to_local: to_world.inverse(),
            ..quiet_params(0.1)
        };
        let rest = Vec3::new(2.0, 0.0, 0.0);
        let mut p = rest;
        let mut v = Vec3::ZERO;
        let world_prev = to_world.transform_point3(rest);
        integrate_vertex(
            &params,
            rest,
            2.0,
            world_prev,
            world_prev + Vec3::new(0.0, 1.0, 0.0),
            &mut p,
            &mut v,
        );
        // world +Y is local +X under a 90 degree Z rotation
        assert!((v - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-5, "v = {:?}", v);
    }

    #[test]
    fn test_radius_constraint_pulls_toward_rest_distance() {
        let params = KernelParams {
            maintain_radius: true,
            radius_constraint_strength: 1.0,
            ..quiet_params(0.02)
        };
        let rest = Vec3::new(2.0, 0.0, 0.0);
        let mut p = Vec3::new(3.0, 0.0, 0.0);
        let mut v = Vec3::ZERO;

        let mut last_error = (p.length() - 2.0).abs();
        for _ in 0..30 {
            integrate_vertex(&params, rest, 2.0, rest, rest, &mut p, &mut v);
            let error = (p.length() - 2.0).abs();
            assert!(error <= last_error + 1e-6);
            last_error = error;
        }
        assert!(last_error < 0.01, "radius error {}", last_error);
    }

    #[test]
    fn test_strong_constraint_removes_radial_velocity() {
        let params = KernelParams {
            maintain_radius: true,
            radius_constraint_strength: 1.0,
            ..quiet_params(0.02)
        };
        let rest = Vec3::new(2.0, 0.0, 0.0);
        let mut p = Vec3::new(2.5, 0.0, 0.0);
        let mut v = Vec3::new(4.0, 0.0, 0.0);
        integrate_vertex(&params, rest, 2.0, rest, rest, &mut p, &mut v);
        assert!(v.length() < 1e-5, "radial velocity left: {:?}", v);
    }

    #[test]
    fn test_integrate_matches_per_vertex_kernel() {
        let rest: Vec<Vec3> = (0..1000)
            .map(|i| {
                let a = i as f32 * 0.1;
                Vec3::new(a.cos() * 2.0, (i % 7) as f32 * 0.1, a.sin() * 2.0)
            })
            .collect();
        let mut state = SimulationState::new(&rest).unwrap();
        state.sample_motion(&Mat4::IDENTITY);
        state.sample_motion(&Mat4::from_translation(Vec3::new(0.2, 0.0, 0.0)));
        let params = KernelParams::from_config(
            &JellyConfig::default(),
            state.pivot_local,
            Mat4::from_translation(Vec3::new(0.2, 0.0, 0.0)).inverse(),
            1.0 / 60.0,
        );

        let mut expected = state.clone();
        for i in 0..expected.vertex_count() {
            let (mut p, mut v) = (expected.store.live[i], expected.store.velocity[i]);
            integrate_vertex(
                &params,
                expected.store.rest[i],
                expected.store.rest_distance[i],
                expected.motion.world_prev[i],
                expected.motion.world_curr[i],
                &mut p,
                &mut v,
            );
            expected.store.live[i] = p;
            expected.store.velocity[i] = v;
        }

        integrate(&mut state, &params, 64);
        assert_eq!(state.store.live, expected.store.live);
        assert_eq!(state.store.velocity, expected.store.velocity);
    }
}
