//! Jelly: soft-body secondary motion for mesh vertices.
//!
//! Each vertex is a damped spring anchored at its rest position. Motion of
//! the owning transform injects an inertial force, and an optional radius
//! constraint keeps vertices near their original distance from a pivot,
//! approximating volume preservation.
//!
//! The caller drives the simulation once per frame: [`JellyMesh::tick`]
//! samples motion, updates the pivot and LOD state and dispatches the
//! integrator to the rayon pool; [`JellyMesh::late_tick`] joins it and
//! hands the deformed pose to the [`RenderSurface`].
//!
//! # Example
//!
//! ```
//! use jelly::{JellyConfig, JellyMesh, Mat4, RenderSurface, StaticMesh, TickInput, Vec3};
//!
//! struct Positions(Vec<Vec3>);
//!
//! impl RenderSurface for Positions {
//!     fn apply_positions(&mut self, positions: &[Vec3], _update_collider: bool) {
//!         self.0.clear();
//!         self.0.extend_from_slice(positions);
//!     }
//!     fn show_deformed(&mut self, _deformed: bool) {}
//! }
//!
//! let mesh = StaticMesh::new(vec![Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y]);
//! let mut jelly = JellyMesh::new(mesh, Positions(Vec::new()), JellyConfig::default());
//! jelly.initialize().unwrap();
//!
//! for frame in 0..60 {
//!     let t = frame as f32 / 60.0;
//!     let input = TickInput::at(Mat4::from_translation(Vec3::new(t.sin(), 0.0, 0.0)));
//!     jelly.tick(1.0 / 60.0, &input);
//!     // other per-frame work runs while the integrator is in flight
//!     jelly.late_tick();
//! }
//!
//! assert_eq!(jelly.surface().0.len(), 4);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod governor;
pub mod integrator;
pub mod metrics;
pub mod motion;
pub mod pipeline;
pub mod pivot;
pub mod state;
pub mod surface;
pub mod vertex;

pub use config::JellyConfig;
pub use error::JellyError;
pub use glam::{Mat4, Vec3};
pub use governor::{CullState, PerformanceProfile};
pub use metrics::SimMetrics;
pub use pivot::PivotAnchor;
pub use state::SimulationState;
pub use surface::{MeshSource, RenderSurface, StaticMesh};
pub use vertex::{VertexRecord, VertexStore};

use governor::{CullTransition, Governor};
use integrator::KernelParams;
use pipeline::PendingIntegration;

/// Per-tick input from the transform, viewer and visibility collaborators.
#[derive(Clone, Copy, Debug)]
pub struct TickInput {
    /// Local-to-world transform of the owner this tick
    pub local_to_world: Mat4,
    /// Distance from the owner to the viewer, if a viewer exists
    pub viewer_distance: Option<f32>,
    /// Whether the owner is visible to any viewer
    pub visible: bool,
    /// External deformation pivot, if one is assigned
    pub pivot: Option<PivotAnchor>,
}

impl TickInput {
    /// A visible owner at `local_to_world` with no viewer and no custom pivot.
    pub fn at(local_to_world: Mat4) -> Self {
        Self {
            local_to_world,
            viewer_distance: None,
            visible: true,
            pivot: None,
        }
    }

    /// World-space position of the owner.
    pub fn world_position(&self) -> Vec3 {
        self.local_to_world.w_axis.truncate()
    }
}

impl Default for TickInput {
    fn default() -> Self {
        Self::at(Mat4::IDENTITY)
    }
}

/// What happened during one [`JellyMesh::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    /// An integration job was dispatched
    pub dispatched: bool,
    /// Integration step of the dispatched job (seconds)
    pub step: f32,
    pub culled: bool,
    /// Rest distances were rebuilt against a new pivot or rest pose
    pub rest_rebuilt: bool,
    /// `None` when the instance is not running
    pub profile: Option<PerformanceProfile>,
}

impl TickReport {
    fn idle() -> Self {
        Self {
            dispatched: false,
            step: 0.0,
            culled: false,
            rest_rebuilt: false,
            profile: None,
        }
    }
}

/// Lifecycle of a simulation instance, as observed from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Integrating,
    /// A fatal error stopped the instance; see [`JellyMesh::disabled_reason`]
    Disabled,
    Disposed,
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Ready(Box<SimulationState>),
    Integrating(PendingIntegration),
    Disabled(String),
    Disposed,
}

/// One jelly-deformed mesh.
pub struct JellyMesh<S: MeshSource, R: RenderSurface> {
    config: JellyConfig,
    source: S,
    surface: R,
    lifecycle: Lifecycle,
    governor: Governor,
    metrics: SimMetrics,
    parallelism_hint: usize,
    /// A job was dispatched this tick and its result has not been emitted
    output_pending: bool,
    showing_deformed: bool,
    warned_detached_pivot: bool,
    warned_refresh_mismatch: bool,
    warned_singular_transform: bool,
}

impl<S: MeshSource, R: RenderSurface> JellyMesh<S, R> {
    /// Create an uninitialized instance. Call [`JellyMesh::initialize`] next.
    pub fn new(source: S, surface: R, config: JellyConfig) -> Self {
        Self {
            config,
            source,
            surface,
            lifecycle: Lifecycle::Uninitialized,
            governor: Governor::new(),
            metrics: SimMetrics::new(),
            parallelism_hint: rayon::current_num_threads().max(1),
            output_pending: false,
            showing_deformed: false,
            warned_detached_pivot: false,
            warned_refresh_mismatch: false,
            warned_singular_transform: false,
        }
    }

    /// Read the rest pose and allocate simulation state.
    ///
    /// Any previous state is joined and released first; a new vertex count
    /// gets a fresh allocation. On error the instance is disabled.
    pub fn initialize(&mut self) -> Result<(), JellyError> {
        self.teardown();

        let built = if self.surface.is_available() {
            self.source
                .rest_vertices()
                .and_then(|rest| SimulationState::new(&rest))
        } else {
            Err(JellyError::NoRenderSurface)
        };

        match built {
            Ok(state) => {
                log::debug!("Jelly initialized with {} vertices", state.vertex_count());
                self.lifecycle = Lifecycle::Ready(Box::new(state));
                self.governor = Governor::new();
                self.output_pending = false;
                self.warned_detached_pivot = false;
                self.warned_refresh_mismatch = false;
                self.warned_singular_transform = false;
                self.showing_deformed = true;
                self.surface.show_deformed(true);
                Ok(())
            }
            Err(err) => {
                log::error!("Jelly simulation disabled: {}", err);
                self.lifecycle = Lifecycle::Disabled(err.to_string());
                Err(err)
            }
        }
    }

    /// Sample motion, update pivot and LOD, and dispatch the integrator.
    ///
    /// Any job still in flight from a previous tick is joined first. The
    /// dispatched job runs while the caller does other work; call
    /// [`JellyMesh::late_tick`] before the end of the frame.
    pub fn tick(&mut self, dt: f32, input: &TickInput) -> TickReport {
        if !self.settle() {
            return TickReport::idle();
        }
        let config = self.config.sanitized();
        let Lifecycle::Ready(state) = &mut self.lifecycle else {
            return TickReport::idle();
        };
        self.metrics.ticks += 1;

        let mut rest_changed = false;
        if let Some(baked) = self.source.refresh() {
            match state.replace_rest_pose(&baked) {
                Ok(()) => {
                    rest_changed = true;
                    self.warned_refresh_mismatch = false;
                }
                Err(err) => {
                    if !self.warned_refresh_mismatch {
                        log::warn!("Skipping rest pose refresh: {}", err);
                        self.warned_refresh_mismatch = true;
                    }
                }
            }
        }

        state.sample_motion(&input.local_to_world);

        let world_to_local = input.local_to_world.inverse();
        let invertible = world_to_local.is_finite();
        if !invertible && !self.warned_singular_transform {
            log::warn!("Owner transform is not invertible; skipping integration");
            self.warned_singular_transform = true;
        } else if invertible {
            self.warned_singular_transform = false;
        }

        let custom_pivot = match input.pivot {
            Some(anchor) if invertible => {
                if !anchor.attached_to_owner && !self.warned_detached_pivot {
                    log::warn!("Pivot is not a descendant of the jelly owner; applying it anyway");
                    self.warned_detached_pivot = true;
                }
                Some(anchor.to_local(&world_to_local))
            }
            _ => None,
        };
        if input.pivot.map_or(true, |anchor| anchor.attached_to_owner) {
            self.warned_detached_pivot = false;
        }
        let candidate = state.pivot_candidate(custom_pivot);
        let rest_rebuilt = state.update_pivot(candidate, rest_changed);

        let (profile, transition) = self.governor.evaluate(
            &config,
            input.viewer_distance,
            state.vertex_count(),
            self.parallelism_hint,
        );
        match transition {
            CullTransition::Culled => {
                log::debug!("Jelly culled at distance {:?}", input.viewer_distance);
                state.reset();
                self.output_pending = false;
                self.showing_deformed = false;
                self.surface.show_deformed(false);
            }
            CullTransition::Restored => {
                log::debug!("Jelly restored at distance {:?}", input.viewer_distance);
                self.showing_deformed = true;
                self.surface.show_deformed(true);
            }
            CullTransition::None => {}
        }
        self.governor.accumulate(dt, &profile);

        let mut report = TickReport {
            dispatched: false,
            step: 0.0,
            culled: profile.culled,
            rest_rebuilt,
            profile: Some(profile),
        };

        if profile.culled {
            self.metrics.culled_ticks += 1;
            return report;
        }
        if !input.visible {
            self.metrics.skipped_invisible += 1;
            return report;
        }
        if !invertible {
            return report;
        }
        let Some(step) = self.governor.take_step(&profile) else {
            return report;
        };

        let params = KernelParams::from_config(&config, state.pivot_local, world_to_local, step);
        self.metrics.record_step(step);
        self.dispatch_integration(params, profile.batch_size);
        self.output_pending = true;

        report.dispatched = true;
        report.step = step;
        report
    }

    /// Join this tick's integration and emit the live pose to the surface.
    ///
    /// Returns whether a pose was emitted.
    pub fn late_tick(&mut self) -> bool {
        if !self.settle() || !self.output_pending {
            return false;
        }
        self.output_pending = false;
        if !self.showing_deformed {
            return false;
        }
        let Lifecycle::Ready(state) = &self.lifecycle else {
            return false;
        };
        self.surface
            .apply_positions(&state.store.live, self.config.update_mesh_collider);
        true
    }

    /// [`JellyMesh::tick`] followed immediately by [`JellyMesh::late_tick`].
    pub fn step(&mut self, dt: f32, input: &TickInput) -> TickReport {
        let report = self.tick(dt, input);
        self.late_tick();
        report
    }

    /// Put every vertex back at rest. Joins any in-flight job first.
    pub fn reset_to_rest(&mut self) {
        if !self.settle() {
            return;
        }
        let Lifecycle::Ready(state) = &mut self.lifecycle else {
            return;
        };
        state.reset();
        self.output_pending = false;
        if self.showing_deformed {
            self.surface
                .apply_positions(&state.store.live, self.config.update_mesh_collider);
        }
    }

    /// Replace the rest pose with one baked by the caller.
    ///
    /// The pose must match the current vertex count. Rest distances are
    /// rebuilt against the current pivot; a centroid pivot follows the new
    /// pose on the next tick.
    pub fn set_rest_pose(&mut self, rest: &[Vec3]) -> Result<(), JellyError> {
        self.settle();
        match &mut self.lifecycle {
            Lifecycle::Ready(state) => {
                state.replace_rest_pose(rest)?;
                let pivot = state.pivot_local;
                state.update_pivot(pivot, true);
                Ok(())
            }
            Lifecycle::Disposed => Err(JellyError::Disposed),
            _ => Err(JellyError::NotInitialized),
        }
    }

    /// Join any in-flight job and release all buffers. Idempotent.
    ///
    /// A disabled instance stays disabled so its reason remains readable.
    pub fn teardown(&mut self) {
        self.settle();
        self.lifecycle = match std::mem::replace(&mut self.lifecycle, Lifecycle::Disposed) {
            Lifecycle::Ready(mut state) => {
                state.teardown();
                log::debug!("Jelly buffers released");
                Lifecycle::Disposed
            }
            Lifecycle::Disabled(reason) => Lifecycle::Disabled(reason),
            _ => Lifecycle::Disposed,
        };
        self.output_pending = false;
    }

    /// The live pose, after joining any in-flight job.
    pub fn live_positions(&mut self) -> Option<&[Vec3]> {
        self.state().map(|state| state.store.live.as_slice())
    }

    /// A copy of one vertex, after joining any in-flight job.
    pub fn vertex(&mut self, index: usize) -> Option<VertexRecord> {
        self.state().and_then(|state| state.vertex(index))
    }

    /// The current local-space pivot, after joining any in-flight job.
    pub fn pivot_local(&mut self) -> Option<Vec3> {
        self.state().map(|state| state.pivot_local)
    }

    /// Simulation state, after joining any in-flight job.
    pub fn state(&mut self) -> Option<&SimulationState> {
        self.settle();
        match &self.lifecycle {
            Lifecycle::Ready(state) => Some(&**state),
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.lifecycle {
            Lifecycle::Uninitialized => Phase::Uninitialized,
            Lifecycle::Ready(_) => Phase::Ready,
            Lifecycle::Integrating(_) => Phase::Integrating,
            Lifecycle::Disabled(_) => Phase::Disabled,
            Lifecycle::Disposed => Phase::Disposed,
        }
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Disabled(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn config(&self) -> &JellyConfig {
        &self.config
    }

    /// Mutable config. Values are clamped to their ranges when read each tick.
    pub fn config_mut(&mut self) -> &mut JellyConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: JellyConfig) {
        self.config = config;
    }

    /// Override the worker count used to size parallel batches.
    pub fn set_parallelism_hint(&mut self, hint: usize) {
        self.parallelism_hint = hint.max(1);
    }

    pub fn cull_state(&self) -> CullState {
        self.governor.state()
    }

    pub fn is_showing_deformed(&self) -> bool {
        self.showing_deformed
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut R {
        &mut self.surface
    }

    /// Join an in-flight job if there is one. Returns whether the instance
    /// is `Ready` afterwards.
    fn settle(&mut self) -> bool {
        if let Lifecycle::Integrating(_) = self.lifecycle {
            self.lifecycle = match std::mem::replace(&mut self.lifecycle, Lifecycle::Disposed) {
                Lifecycle::Integrating(pending) => match pending.join() {
                    Ok(finished) => {
                        self.metrics.record_job(finished.elapsed);
                        Lifecycle::Ready(finished.state)
                    }
                    Err(err) => {
                        log::error!("Jelly simulation disabled: {}", err);
                        self.output_pending = false;
                        self.showing_deformed = false;
                        self.surface.show_deformed(false);
                        Lifecycle::Disabled(err.to_string())
                    }
                },
                other => other,
            };
        }
        matches!(self.lifecycle, Lifecycle::Ready(_))
    }

    fn dispatch_integration(&mut self, params: KernelParams, batch_size: usize) {
        self.lifecycle = match std::mem::replace(&mut self.lifecycle, Lifecycle::Disposed) {
            Lifecycle::Ready(state) => {
                Lifecycle::Integrating(pipeline::dispatch(state, params, batch_size))
            }
            other => other,
        };
    }
}

impl<S: MeshSource, R: RenderSurface> Drop for JellyMesh<S, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
