//! Additive ship statistics
//!
//! Every source of stats (base, chassis, weapon, active, passive, power-ups)
//! is a [`Stats`] layer; the effective value of a stat is the plain sum of
//! all layers.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

use serde::{Deserialize, Serialize};

/// One layer of stat contributions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Maximum cruising speed (units/s)
    pub top_speed: f32,
    /// Thrust acceleration (units/s²)
    pub acceleration: f32,
    /// Turn rate (radians/s)
    pub handling: f32,
    /// Coasting deceleration (fraction of speed lost per second)
    pub braking: f32,
    /// Damage per projectile
    pub damage: f32,
    /// Shield cost per point of damage dealt
    pub shield_disruption: f32,
    /// Projectile turn rate toward targets (radians/s)
    pub shot_homing: f32,
    /// Shots per second
    pub rate_of_fire: f32,
    /// Maximum hull
    pub hp: f32,
    /// Maximum shield
    pub shield_capacity: f32,
    /// Shield regained per second
    pub shield_regen: f32,
    /// Chance weight for glancing incoming shots
    pub shot_deflection: f32,
}

/// Individual stat names (power-up kinds map one-to-one onto these)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    TopSpeed,
    Acceleration,
    Handling,
    Braking,
    Damage,
    ShieldDisruption,
    ShotHoming,
    RateOfFire,
    Hp,
    ShieldCapacity,
    ShieldRegen,
    ShotDeflection,
}

impl StatKind {
    pub const ALL: [StatKind; 12] = [
        StatKind::TopSpeed,
        StatKind::Acceleration,
        StatKind::Handling,
        StatKind::Braking,
        StatKind::Damage,
        StatKind::ShieldDisruption,
        StatKind::ShotHoming,
        StatKind::RateOfFire,
        StatKind::Hp,
        StatKind::ShieldCapacity,
        StatKind::ShieldRegen,
        StatKind::ShotDeflection,
    ];
}

impl Stats {
    pub const ZERO: Stats = Stats {
        top_speed: 0.0,
        acceleration: 0.0,
        handling: 0.0,
        braking: 0.0,
        damage: 0.0,
        shield_disruption: 0.0,
        shot_homing: 0.0,
        rate_of_fire: 0.0,
        hp: 0.0,
        shield_capacity: 0.0,
        shield_regen: 0.0,
        shot_deflection: 0.0,
    };

    /// Baseline every ship starts from
    pub fn ship_base() -> Self {
        Self {
            top_speed: 6.0,
            acceleration: 14.0,
            handling: 6.0,
            braking: 1.5,
            damage: 10.0,
            shield_disruption: 1.0,
            shot_homing: 0.0,
            rate_of_fire: 2.0,
            hp: 100.0,
            shield_capacity: 30.0,
            shield_regen: 6.0,
            shot_deflection: 0.0,
        }
    }

    /// A layer with a single stat set
    pub fn single(kind: StatKind, amount: f32) -> Self {
        let mut stats = Self::ZERO;
        *stats.get_mut(kind) = amount;
        stats
    }

    pub fn get(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::TopSpeed => self.top_speed,
            StatKind::Acceleration => self.acceleration,
            StatKind::Handling => self.handling,
            StatKind::Braking => self.braking,
            StatKind::Damage => self.damage,
            StatKind::ShieldDisruption => self.shield_disruption,
            StatKind::ShotHoming => self.shot_homing,
            StatKind::RateOfFire => self.rate_of_fire,
            StatKind::Hp => self.hp,
            StatKind::ShieldCapacity => self.shield_capacity,
            StatKind::ShieldRegen => self.shield_regen,
            StatKind::ShotDeflection => self.shot_deflection,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut f32 {
        match kind {
            StatKind::TopSpeed => &mut self.top_speed,
            StatKind::Acceleration => &mut self.acceleration,
            StatKind::Handling => &mut self.handling,
            StatKind::Braking => &mut self.braking,
            StatKind::Damage => &mut self.damage,
            StatKind::ShieldDisruption => &mut self.shield_disruption,
            StatKind::ShotHoming => &mut self.shot_homing,
            StatKind::RateOfFire => &mut self.rate_of_fire,
            StatKind::Hp => &mut self.hp,
            StatKind::ShieldCapacity => &mut self.shield_capacity,
            StatKind::ShieldRegen => &mut self.shield_regen,
            StatKind::ShotDeflection => &mut self.shot_deflection,
        }
    }

    fn zip_with(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut out = Self::ZERO;
        for kind in StatKind::ALL {
            *out.get_mut(kind) = f(self.get(kind), other.get(kind));
        }
        out
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, rhs: Stats) -> Stats {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Stats) {
        *self = *self + rhs;
    }
}

impl Sub for Stats {
    type Output = Stats;

    fn sub(self, rhs: Stats) -> Stats {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Neg for Stats {
    type Output = Stats;

    fn neg(self) -> Stats {
        Stats::ZERO - self
    }
}

impl Sum for Stats {
    fn sum<I: Iterator<Item = Stats>>(iter: I) -> Stats {
        iter.fold(Stats::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Stats> for Stats {
    fn sum<I: Iterator<Item = &'a Stats>>(iter: I) -> Stats {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_sum_per_field() {
        let base = Stats::ship_base();
        let weapon = Stats::single(StatKind::RateOfFire, -0.5);
        let powerup = Stats::single(StatKind::Damage, 2.0);
        let total: Stats = [base, weapon, powerup].iter().sum();
        assert!((total.rate_of_fire - 1.5).abs() < 0.0001);
        assert!((total.damage - 12.0).abs() < 0.0001);
        assert_eq!(total.hp, base.hp);
    }

    #[test]
    fn test_removing_a_layer_restores_total() {
        let base = Stats::ship_base();
        let chassis = Stats {
            hp: 50.0,
            top_speed: -1.0,
            ..Stats::ZERO
        };
        assert_eq!((base + chassis) - chassis, base);
        assert_eq!(base + -chassis, base - chassis);
    }

    #[test]
    fn test_single_touches_one_field() {
        for kind in StatKind::ALL {
            let layer = Stats::single(kind, 3.0);
            let nonzero = StatKind::ALL.iter().filter(|k| layer.get(**k) != 0.0).count();
            assert_eq!(nonzero, 1);
            assert_eq!(layer.get(kind), 3.0);
        }
    }
}
