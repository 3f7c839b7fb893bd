//! What distinguishes one game mode from another
//!
//! The frame loop, timer, and bookkeeping are shared by every mode in
//! [`GameMode`](super::mode::GameMode); [`ModeRules`] only decides how the
//! arena is populated, what happens between frames, and how players score.

use super::scoring::PlayerStats;
use crate::tuning::MatchTuning;

/// Seconds-alive bonus given to anyone who never died
pub const SURVIVOR_BONUS: f64 = 10_000.0;
/// Radius the death battle's black hole starts at
pub const DEATH_BATTLE_BLACK_HOLE_RADIUS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRules {
    /// Free-for-all gear-up round with periodic crates and drones
    Assembly,
    /// No respawns; last ship flying wins
    DeathBattle,
}

impl ModeRules {
    pub fn name(self) -> &'static str {
        match self {
            ModeRules::Assembly => "ASSEMBLY",
            ModeRules::DeathBattle => "DEATH BATTLE",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModeRules::Assembly => "Collect parts and power-ups for your ship!",
            ModeRules::DeathBattle => "No Respawns, Get as many kills as you can!",
        }
    }

    pub fn default_tuning(self) -> MatchTuning {
        match self {
            ModeRules::Assembly => MatchTuning::assembly(),
            ModeRules::DeathBattle => MatchTuning::death_battle(),
        }
    }

    /// Death battle plays on bare starfield
    pub fn shows_background(self) -> bool {
        self != ModeRules::DeathBattle
    }

    /// Deaths record how long the player lasted
    pub fn tracks_time_alive(self) -> bool {
        self == ModeRules::DeathBattle
    }

    /// Match ends as soon as one ship is left
    pub fn ends_on_last_survivor(self) -> bool {
        self == ModeRules::DeathBattle
    }

    /// Ranking score; higher is better
    pub fn score(self, stats: &PlayerStats) -> f64 {
        match self {
            ModeRules::Assembly => f64::from(stats.kills) - f64::from(stats.deaths),
            ModeRules::DeathBattle => {
                let time_alive = stats.time_alive.map_or(SURVIVOR_BONUS, f64::from);
                f64::from(stats.kills) + time_alive
            }
        }
    }

    /// Player score widget text
    pub fn score_text(self, stats: &PlayerStats) -> String {
        match self {
            ModeRules::Assembly => format!("Kills: {:02}  Deaths: {:02}", stats.kills, stats.deaths),
            ModeRules::DeathBattle => format!("Kills: {:03}", stats.kills),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_score_is_net_kills() {
        let stats = PlayerStats {
            kills: 3,
            deaths: 5,
            time_alive: None,
        };
        assert_eq!(ModeRules::Assembly.score(&stats), -2.0);
    }

    #[test]
    fn test_death_battle_rewards_survival() {
        let survivor = PlayerStats {
            kills: 0,
            ..Default::default()
        };
        let killer = PlayerStats {
            kills: 4,
            deaths: 1,
            time_alive: Some(60.5),
        };
        assert_eq!(ModeRules::DeathBattle.score(&survivor), SURVIVOR_BONUS);
        assert!((ModeRules::DeathBattle.score(&killer) - 64.5).abs() < 0.0001);
        assert!(ModeRules::DeathBattle.score(&survivor) > ModeRules::DeathBattle.score(&killer));
    }

    #[test]
    fn test_score_text() {
        let stats = PlayerStats {
            kills: 7,
            deaths: 2,
            time_alive: None,
        };
        assert_eq!(ModeRules::DeathBattle.score_text(&stats), "Kills: 007");
        assert_eq!(ModeRules::Assembly.score_text(&stats), "Kills: 07  Deaths: 02");
    }

    #[test]
    fn test_presets_match_rules() {
        assert!(!ModeRules::DeathBattle.default_tuning().respawn_allowed);
        assert!(ModeRules::Assembly.default_tuning().respawn_allowed);
        assert!(ModeRules::DeathBattle.default_tuning().unique_player_spawns);
    }
}
