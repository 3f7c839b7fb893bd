//! Voidrunners - arcade space-combat simulation core
//!
//! Core modules:
//! - `sim`: Frame-stepped simulation (entities, equipment, collisions, game modes)
//! - `audio`: Sound cues and the audio collaborator contract
//! - `render`: Visual proxy / effect / camera collaborator contract
//! - `input`: Pilot intents and the input collaborator contract
//! - `ui`: On-screen widget collaborator contract
//! - `tuning`: Data-driven match balance
//! - `error`: Fatal simulation errors

pub mod audio;
pub mod error;
pub mod input;
pub mod render;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use error::{SimError, SimResult};
pub use tuning::MatchTuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal frame rate the per-frame damping constants were tuned at
    pub const REFERENCE_FPS: f32 = 60.0;

    /// Fixed simulation timestep used by the headless driver (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default arena half extents (world units)
    pub const ARENA_HALF_WIDTH: f32 = 20.0;
    pub const ARENA_HALF_HEIGHT: f32 = 20.0;

    /// Squared distance at which positional sounds fall silent
    pub const SOUND_FALLOFF_DIST_SQ: f32 = 100.0;

    /// Default volumes
    pub const BULLET_VOLUME: f32 = 0.5;
    pub const MUSIC_VOLUME: f32 = 0.6;

    /// Overtime wind-down after the timer hits zero
    pub const AFTER_GAME_SLOWDOWN_SECONDS: f32 = 3.0;
    /// Slowest the simulation gets during wind-down
    pub const MIN_SLOWDOWN_FACTOR: f32 = 0.2;
    /// Countdown widget becomes visible this many seconds before the end
    pub const COUNTDOWN_SECONDS: f32 = 5.0;

    /// Camera follow smoothing (fraction per frame)
    pub const CAMERA_LERP: f32 = 0.1;
    /// Aim stick deadzone for camera look-ahead
    pub const AIM_DEADZONE: f32 = 0.24;
    /// Movement stick deadzone for steering
    pub const MOVE_DEADZONE: f32 = 0.2;

    /// Rejection sampling cap for encounter placement
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 1000;

    /// Maximum simultaneous vortices the renderer can distort
    pub const MAX_VORTICES: usize = 16;

    /// Maximum held items per entity
    pub const INVENTORY_CAPACITY: usize = 32;
}

/// Wrap an angle into [-π, π]
///
/// Inputs that land on the seam may come back as either -π or +π.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Unit vector pointing along `angle` (radians, 0 = +x)
#[inline]
pub fn direction_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Heading of a vector in radians (0 = +x)
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Quadratic ease-in
#[inline]
pub fn smooth_start2(t: f32) -> f32 {
    t * t
}

/// Convert a per-frame retention factor into one for an arbitrary dt
#[inline]
pub fn frame_damping(per_frame: f32, dt: f32) -> f32 {
    per_frame.powf(dt * consts::REFERENCE_FPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::{PI, TAU};

    /// Same direction, allowing for a full-turn difference
    fn same_heading(a: f32, b: f32) -> bool {
        let diff = (a - b).rem_euclid(TAU);
        diff < 0.001 || TAU - diff < 0.001
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(0.5) - 0.5).abs() < 0.0001);
        assert!((normalize_angle(2.5 * PI) - PI / 2.0).abs() < 0.0001);
        assert!((normalize_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 0.0001);
        assert!((normalize_angle(-2.5 * PI) + PI / 2.0).abs() < 0.0001);
    }

    #[test]
    fn test_normalize_angle_on_the_seam() {
        let seam = normalize_angle(3.0 * PI);
        assert!(seam.abs() <= PI + 0.0001);
        assert!(same_heading(seam, -PI));
    }

    #[test]
    fn test_direction_roundtrip() {
        let dir = direction_from_angle(PI / 3.0);
        assert!((angle_of(dir) - PI / 3.0).abs() < 0.0001);
        assert!((dir.length() - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_frame_damping_matches_reference_rate() {
        let dt = 1.0 / consts::REFERENCE_FPS;
        assert!((frame_damping(0.9, dt) - 0.9).abs() < 0.0001);
        assert!((frame_damping(0.9, 2.0 * dt) - 0.81).abs() < 0.0001);
    }

    proptest! {
        #[test]
        fn prop_normalize_angle_stays_in_range(angle in -100.0f32..100.0) {
            let wrapped = normalize_angle(angle);
            prop_assert!(wrapped.abs() <= PI + 0.0001);
            prop_assert!(same_heading(wrapped, angle));
        }
    }
}
