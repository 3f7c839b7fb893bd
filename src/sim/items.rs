//! Equipment and power-ups
//!
//! Everything a ship can carry is an [`Item`]. Equipment occupies one of four
//! slots; power-ups ride in the inventory. Each item is one [`Stats`] layer.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::stats::{StatKind, Stats};
use crate::render::Tint;

/// Equipment slots (at most one item each)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Chassis,
    Active,
    Passive,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 4] = [
        EquipSlot::Weapon,
        EquipSlot::Chassis,
        EquipSlot::Active,
        EquipSlot::Passive,
    ];

    pub fn index(self) -> usize {
        match self {
            EquipSlot::Weapon => 0,
            EquipSlot::Chassis => 1,
            EquipSlot::Active => 2,
            EquipSlot::Passive => 3,
        }
    }
}

// === Weapons ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Single laser
    Blaster,
    /// Four lasers fanned out
    SpreadShot,
    /// Three plasma balls, two of them weaving
    WaveGun,
    /// One slow missile that steers toward targets
    HomingLauncher,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 4] = [
        WeaponKind::Blaster,
        WeaponKind::SpreadShot,
        WeaponKind::WaveGun,
        WeaponKind::HomingLauncher,
    ];

    pub fn stat_bonuses(self) -> Stats {
        match self {
            WeaponKind::Blaster => Stats::ZERO,
            WeaponKind::SpreadShot => Stats {
                damage: -4.0,
                rate_of_fire: -1.0,
                ..Stats::ZERO
            },
            WeaponKind::WaveGun => Stats {
                damage: -6.0,
                rate_of_fire: 1.0,
                ..Stats::ZERO
            },
            WeaponKind::HomingLauncher => Stats {
                damage: 5.0,
                rate_of_fire: -1.0,
                shot_homing: 3.0,
                ..Stats::ZERO
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub stat_bonuses: Stats,
}

impl Weapon {
    pub fn new(kind: WeaponKind) -> Self {
        Self {
            kind,
            stat_bonuses: kind.stat_bonuses(),
        }
    }

    /// A weapon with a hand-picked stat layer
    pub fn with_bonuses(kind: WeaponKind, stat_bonuses: Stats) -> Self {
        Self { kind, stat_bonuses }
    }

    /// What an empty weapon slot fires
    pub fn stock() -> Self {
        Self::with_bonuses(WeaponKind::Blaster, Stats::ZERO)
    }
}

// === Chassis ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChassisKind {
    Standard,
    Speedy,
    Tank,
    GlassCannon,
}

impl ChassisKind {
    pub const ALL: [ChassisKind; 4] = [
        ChassisKind::Standard,
        ChassisKind::Speedy,
        ChassisKind::Tank,
        ChassisKind::GlassCannon,
    ];

    pub fn stat_bonuses(self) -> Stats {
        match self {
            ChassisKind::Standard => Stats::ZERO,
            ChassisKind::Speedy => Stats {
                top_speed: 2.0,
                acceleration: 6.0,
                handling: 2.0,
                hp: -30.0,
                ..Stats::ZERO
            },
            ChassisKind::Tank => Stats {
                top_speed: -2.0,
                handling: -2.0,
                hp: 60.0,
                shield_capacity: 20.0,
                ..Stats::ZERO
            },
            ChassisKind::GlassCannon => Stats {
                damage: 6.0,
                rate_of_fire: 1.0,
                hp: -50.0,
                shield_capacity: -20.0,
                ..Stats::ZERO
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chassis {
    pub kind: ChassisKind,
    pub stat_bonuses: Stats,
}

impl Chassis {
    pub fn new(kind: ChassisKind) -> Self {
        Self {
            kind,
            stat_bonuses: kind.stat_bonuses(),
        }
    }
}

// === Actives ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveKind {
    /// Short charge, then jump forward
    Warp,
    /// Bounce incoming shots back at their owner
    Reflector,
    /// Temporary burst of speed
    Boost,
}

impl ActiveKind {
    pub const ALL: [ActiveKind; 3] = [ActiveKind::Warp, ActiveKind::Reflector, ActiveKind::Boost];

    pub fn cooldown(self) -> f32 {
        match self {
            ActiveKind::Warp => 4.0,
            ActiveKind::Reflector => 5.0,
            ActiveKind::Boost => 6.0,
        }
    }

    /// How long the effect lasts once triggered (warp: the charge time)
    pub fn duration(self) -> f32 {
        match self {
            ActiveKind::Warp => 0.5,
            ActiveKind::Reflector => 1.0,
            ActiveKind::Boost => 2.0,
        }
    }
}

/// What happened when an active item ticked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTick {
    Idle,
    /// The warp charge finished; jump now
    WarpReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Active {
    pub kind: ActiveKind,
    cooldown_remaining: f32,
    running_remaining: f32,
}

impl Active {
    /// Boost layer while running
    const BOOST: Stats = Stats {
        top_speed: 4.0,
        acceleration: 10.0,
        ..Stats::ZERO
    };

    pub fn new(kind: ActiveKind) -> Self {
        Self {
            kind,
            cooldown_remaining: 0.0,
            running_remaining: 0.0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    pub fn is_running(&self) -> bool {
        self.running_remaining > 0.0
    }

    /// Start the effect; false while cooling down
    pub fn trigger(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.cooldown_remaining = self.kind.cooldown();
        self.running_remaining = self.kind.duration();
        true
    }

    pub fn tick(&mut self, dt: f32) -> ActiveTick {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        if !self.is_running() {
            return ActiveTick::Idle;
        }
        self.running_remaining -= dt;
        if self.running_remaining <= 0.0 {
            self.running_remaining = 0.0;
            if self.kind == ActiveKind::Warp {
                return ActiveTick::WarpReady;
            }
        }
        ActiveTick::Idle
    }

    pub fn is_reflecting(&self) -> bool {
        self.kind == ActiveKind::Reflector && self.is_running()
    }

    pub fn stat_bonuses(&self) -> Stats {
        if self.kind == ActiveKind::Boost && self.is_running() {
            Self::BOOST
        } else {
            Stats::ZERO
        }
    }
}

// === Passives ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassiveKind {
    ShieldBattery,
    Afterburner,
    Plating,
    Sharpshooter,
}

impl PassiveKind {
    pub const ALL: [PassiveKind; 4] = [
        PassiveKind::ShieldBattery,
        PassiveKind::Afterburner,
        PassiveKind::Plating,
        PassiveKind::Sharpshooter,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Passive {
    pub kind: PassiveKind,
}

impl Passive {
    pub fn new(kind: PassiveKind) -> Self {
        Self { kind }
    }

    pub fn stat_bonuses(&self) -> Stats {
        match self.kind {
            PassiveKind::ShieldBattery => Stats {
                shield_capacity: 20.0,
                shield_regen: 3.0,
                ..Stats::ZERO
            },
            PassiveKind::Afterburner => Stats {
                top_speed: 1.5,
                acceleration: 4.0,
                ..Stats::ZERO
            },
            PassiveKind::Plating => Stats {
                hp: 40.0,
                top_speed: -0.5,
                shot_deflection: 2.0,
                ..Stats::ZERO
            },
            PassiveKind::Sharpshooter => Stats {
                damage: 3.0,
                shield_disruption: 0.5,
                ..Stats::ZERO
            },
        }
    }
}

// === Power-ups ===

/// A small permanent-until-death boost to one stat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub stat: StatKind,
}

impl PowerUp {
    pub fn new(stat: StatKind) -> Self {
        Self { stat }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::new(StatKind::ALL[rng.random_range(0..StatKind::ALL.len())])
    }

    pub fn stat_changes(&self) -> Stats {
        let amount = match self.stat {
            StatKind::TopSpeed => 0.5,
            StatKind::Acceleration => 1.5,
            StatKind::Handling => 0.5,
            StatKind::Braking => 0.25,
            StatKind::Damage => 1.0,
            StatKind::ShieldDisruption => 0.1,
            StatKind::ShotHoming => 0.3,
            StatKind::RateOfFire => 0.2,
            StatKind::Hp => 10.0,
            StatKind::ShieldCapacity => 5.0,
            StatKind::ShieldRegen => 1.0,
            StatKind::ShotDeflection => 1.0,
        };
        Stats::single(self.stat, amount)
    }
}

// === Items ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Weapon(Weapon),
    Chassis(Chassis),
    Active(Active),
    Passive(Passive),
    PowerUp(PowerUp),
}

impl Item {
    /// Equipment slot this item occupies; power-ups have none
    pub fn slot(&self) -> Option<EquipSlot> {
        match self {
            Item::Weapon(_) => Some(EquipSlot::Weapon),
            Item::Chassis(_) => Some(EquipSlot::Chassis),
            Item::Active(_) => Some(EquipSlot::Active),
            Item::Passive(_) => Some(EquipSlot::Passive),
            Item::PowerUp(_) => None,
        }
    }

    pub fn stats(&self) -> Stats {
        match self {
            Item::Weapon(w) => w.stat_bonuses,
            Item::Chassis(c) => c.stat_bonuses,
            Item::Active(a) => a.stat_bonuses(),
            Item::Passive(p) => p.stat_bonuses(),
            Item::PowerUp(p) => p.stat_changes(),
        }
    }

    /// Crate loot: mostly power-ups, sometimes a piece of equipment
    pub fn random(rng: &mut impl Rng) -> Self {
        if rng.random_bool(0.6) {
            return Item::PowerUp(PowerUp::random(rng));
        }
        match rng.random_range(0..4) {
            0 => Item::Weapon(Weapon::new(WeaponKind::ALL[rng.random_range(0..WeaponKind::ALL.len())])),
            1 => Item::Chassis(Chassis::new(
                ChassisKind::ALL[rng.random_range(0..ChassisKind::ALL.len())],
            )),
            2 => Item::Active(Active::new(ActiveKind::ALL[rng.random_range(0..ActiveKind::ALL.len())])),
            _ => Item::Passive(Passive::new(
                PassiveKind::ALL[rng.random_range(0..PassiveKind::ALL.len())],
            )),
        }
    }

    pub fn tint(&self) -> Tint {
        match self {
            Item::Weapon(_) => Tint::RED,
            Item::Chassis(_) => Tint::GRAY,
            Item::Active(_) => Tint::BLUE,
            Item::Passive(_) => Tint::GREEN,
            Item::PowerUp(_) => Tint::YELLOW,
        }
    }
}
