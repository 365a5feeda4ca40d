//! Numerical constants for the jelly simulation.
//!
//! ## Thresholds
//!
//! Distances below [`CENTER_EPSILON`] are treated as "at the pivot" and the
//! vertex is skipped, which keeps the radial direction well defined.
//! The radius constraint uses [`RADIUS_EPSILON`] both as the minimum rest
//! distance it acts on and as the tolerance before it corrects anything.

/// Vertices closer than this to the pivot are left untouched (meters).
pub const CENTER_EPSILON: f32 = 1e-3;

/// Radius constraint tolerance and minimum rest distance (meters).
pub const RADIUS_EPSILON: f32 = 1e-3;

/// Squared pivot displacement above which rest distances are rebuilt.
pub const PIVOT_MOVE_EPSILON_SQ: f32 = 1e-4;

/// Radius constraint blend per second at full strength.
pub const RADIUS_BLEND_RATE: f32 = 10.0;

/// Constraint strength above which radial velocity is also removed.
pub const RADIAL_VELOCITY_STRENGTH: f32 = 0.5;

// =============================================================================
// GOVERNOR
// =============================================================================

/// Largest single integration step (seconds), applied after frame hitches.
pub const MAX_STEP: f32 = 1.0 / 30.0;

/// Update interval at the lowest performance level (ticks skipped between runs).
pub const MAX_UPDATE_INTERVAL: u32 = 5;

/// Time scale at effective level 1.0.
pub const MIN_TIME_SCALE: f32 = 0.7;

/// Lower bound on vertices per parallel work item.
pub const MIN_BATCH_SIZE: usize = 32;

/// Upper bound on vertices per parallel work item.
pub const MAX_BATCH_SIZE: usize = 512;
