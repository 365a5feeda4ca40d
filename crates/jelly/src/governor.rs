//! Performance and LOD governor.
//!
//! Maps the configured performance level and the viewer distance to an
//! update cadence, a time scale and a parallel batch size, and tracks the
//! `Active`/`Culled` state of the instance.

use crate::config::JellyConfig;
use crate::constants::{
    MAX_BATCH_SIZE, MAX_STEP, MAX_UPDATE_INTERVAL, MIN_BATCH_SIZE, MIN_TIME_SCALE,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CullState {
    #[default]
    Active,
    Culled,
}

/// Edge produced by [`Governor::evaluate`] when the cull state flips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CullTransition {
    None,
    /// Active -> Culled: the deformation must be reset to rest.
    Culled,
    /// Culled -> Active: deformed output may be shown again.
    Restored,
}

/// Per-tick derived performance settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceProfile {
    /// 0 = full quality, 1 = cheapest
    pub effective_level: f32,
    /// Ticks skipped between integrations (0 = every tick)
    pub update_interval_frames: u32,
    /// Multiplier applied to frame time before accumulation
    pub time_scale: f32,
    /// Minimum vertices per parallel work item
    pub batch_size: usize,
    pub culled: bool,
}

impl PerformanceProfile {
    pub fn new(
        effective_level: f32,
        vertex_count: usize,
        parallelism_hint: usize,
        culled: bool,
    ) -> Self {
        let effective_level = effective_level.clamp(0.0, 1.0);
        Self {
            effective_level,
            update_interval_frames: (effective_level * MAX_UPDATE_INTERVAL as f32).round() as u32,
            time_scale: lerp(1.0, MIN_TIME_SCALE, effective_level),
            batch_size: batch_size(vertex_count, parallelism_hint),
            culled,
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Position of `value` between `a` and `b`, clamped to [0, 1].
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() <= f32::EPSILON {
        return if value >= b { 1.0 } else { 0.0 };
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Vertices per work item for `vertex_count` split across `parallelism_hint` workers.
pub fn batch_size(vertex_count: usize, parallelism_hint: usize) -> usize {
    (vertex_count / parallelism_hint.max(1)).clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
}

/// Cull state, cadence counter and time accumulator for one instance.
#[derive(Clone, Debug, Default)]
pub struct Governor {
    state: CullState,
    accumulator: f32,
    frames_since_update: u32,
    warned_missing_viewer: bool,
}

impl Governor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CullState {
        self.state
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Derive this tick's profile and update the cull state.
    ///
    /// With `use_lod` but no viewer distance, LOD is disabled for the tick
    /// and the instance stays active.
    pub fn evaluate(
        &mut self,
        config: &JellyConfig,
        viewer_distance: Option<f32>,
        vertex_count: usize,
        parallelism_hint: usize,
    ) -> (PerformanceProfile, CullTransition) {
        let (effective_level, culled) = match (config.use_lod, viewer_distance) {
            (true, Some(distance)) => {
                self.warned_missing_viewer = false;
                if distance >= config.max_lod_distance {
                    (1.0, true)
                } else if distance <= config.min_lod_distance {
                    (0.0, false)
                } else {
                    (
                        inverse_lerp(config.min_lod_distance, config.max_lod_distance, distance),
                        false,
                    )
                }
            }
            (true, None) => {
                if !self.warned_missing_viewer {
                    log::warn!("LOD requested but no viewer available; simulating without culling");
                    self.warned_missing_viewer = true;
                }
                (config.performance_level, false)
            }
            (false, _) => (config.performance_level, false),
        };

        let next = if culled { CullState::Culled } else { CullState::Active };
        let transition = match (self.state, next) {
            (CullState::Active, CullState::Culled) => CullTransition::Culled,
            (CullState::Culled, CullState::Active) => {
                self.accumulator = 0.0;
                self.frames_since_update = 0;
                CullTransition::Restored
            }
            _ => CullTransition::None,
        };
        self.state = next;

        (
            PerformanceProfile::new(effective_level, vertex_count, parallelism_hint, culled),
            transition,
        )
    }

    /// Add scaled frame time. Called every tick regardless of cadence.
    pub fn accumulate(&mut self, dt: f32, profile: &PerformanceProfile) {
        self.accumulator += dt.max(0.0) * profile.time_scale;
    }

    /// Advance the cadence counter; when it fires, return the step to
    /// integrate (capped at [`MAX_STEP`]) and clear the accumulator.
    pub fn take_step(&mut self, profile: &PerformanceProfile) -> Option<f32> {
        self.frames_since_update += 1;
        if self.frames_since_update <= profile.update_interval_frames {
            return None;
        }
        self.frames_since_update = 0;
        let step = self.accumulator.min(MAX_STEP);
        self.accumulator = 0.0;
        (step > 0.0).then_some(step)
    }
}
