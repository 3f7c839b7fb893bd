//! Match balance and tuning
//!
//! Designer-facing knobs for a single game mode. Loaded from JSON so a
//! match can be rebalanced without a rebuild; any missing key falls back to
//! the default.

use std::ops::RangeInclusive;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{ARENA_HALF_HEIGHT, ARENA_HALF_WIDTH};
use crate::error::{SimError, SimResult};

/// Per-mode tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchTuning {
    /// Seed for the mode's RNG
    pub seed: u64,

    // === Timing ===
    /// Match length in seconds
    pub game_length_seconds: f32,

    // === Arena ===
    /// Half extents of the playable rectangle, centered on the origin
    pub arena_half_extents: Vec2,

    // === Rules ===
    /// Dead players may respawn
    pub respawn_allowed: bool,
    /// Each player gets their own spawn point (otherwise random pick)
    pub unique_player_spawns: bool,
    /// Destroyed props may drop items
    pub drop_items_on_death: bool,

    // === Encounters ===
    pub minor_encounters: (u32, u32),
    pub major_encounters: (u32, u32),
    pub minor_radius: (f32, f32),
    pub major_radius: (f32, f32),

    // === Geometry ===
    /// Asteroids scattered at match start
    pub starting_asteroids: u32,
    /// Seconds between periodic crate/drone spawns (0 = never)
    pub spawn_interval_seconds: f32,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            seed: 0x5EED_CAFE,
            game_length_seconds: 120.0,
            arena_half_extents: Vec2::new(ARENA_HALF_WIDTH, ARENA_HALF_HEIGHT),
            respawn_allowed: true,
            unique_player_spawns: false,
            drop_items_on_death: true,
            minor_encounters: (3, 5),
            major_encounters: (1, 2),
            minor_radius: (1.5, 2.5),
            major_radius: (2.5, 4.0),
            starting_asteroids: 0,
            spawn_interval_seconds: 0.0,
        }
    }
}

impl MatchTuning {
    /// Free-for-all gear-up round
    pub fn assembly() -> Self {
        Self {
            game_length_seconds: 120.0,
            starting_asteroids: 12,
            spawn_interval_seconds: 5.0,
            ..Self::default()
        }
    }

    /// Last-ship-standing minigame
    pub fn death_battle() -> Self {
        Self {
            game_length_seconds: 120.0,
            respawn_allowed: false,
            unique_player_spawns: true,
            starting_asteroids: 20,
            minor_encounters: (0, 0),
            major_encounters: (0, 0),
            ..Self::default()
        }
    }

    pub fn minor_encounter_range(&self) -> RangeInclusive<u32> {
        self.minor_encounters.0..=self.minor_encounters.1
    }

    pub fn major_encounter_range(&self) -> RangeInclusive<u32> {
        self.major_encounters.0..=self.major_encounters.1
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> SimResult<()> {
        if self.game_length_seconds <= 0.0 {
            return Err(SimError::InvalidTuning {
                field: "game_length_seconds",
                reason: "must be positive",
            });
        }
        if self.arena_half_extents.x <= 0.0 || self.arena_half_extents.y <= 0.0 {
            return Err(SimError::InvalidTuning {
                field: "arena_half_extents",
                reason: "must be positive",
            });
        }
        if self.minor_encounters.0 > self.minor_encounters.1 {
            return Err(SimError::InvalidTuning {
                field: "minor_encounters",
                reason: "min exceeds max",
            });
        }
        if self.major_encounters.0 > self.major_encounters.1 {
            return Err(SimError::InvalidTuning {
                field: "major_encounters",
                reason: "min exceeds max",
            });
        }
        for (field, (lo, hi)) in [
            ("minor_radius", self.minor_radius),
            ("major_radius", self.major_radius),
        ] {
            if lo <= 0.0 || lo > hi {
                return Err(SimError::InvalidTuning {
                    field,
                    reason: "radius range must be positive and ordered",
                });
            }
        }
        if self.spawn_interval_seconds < 0.0 {
            return Err(SimError::InvalidTuning {
                field: "spawn_interval_seconds",
                reason: "must not be negative",
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded match tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = MatchTuning::from_json_str(r#"{ "game_length_seconds": 45.0 }"#).unwrap();
        assert_eq!(tuning.game_length_seconds, 45.0);
        assert_eq!(tuning.major_encounters, MatchTuning::default().major_encounters);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = MatchTuning::from_json_str(r#"{ "minor_encounters": [4, 2] }"#).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidTuning {
                field: "minor_encounters",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        let err = MatchTuning::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SimError::TuningParse(_)));
    }

    #[test]
    fn test_presets_validate() {
        MatchTuning::assembly().validate().unwrap();
        MatchTuning::death_battle().validate().unwrap();
        assert!(!MatchTuning::death_battle().respawn_allowed);
    }

    #[test]
    fn test_json_survives_reload() {
        let tuning = MatchTuning::death_battle();
        let json = tuning.to_json().unwrap();
        assert_eq!(MatchTuning::from_json_str(&json).unwrap(), tuning);
    }
}
