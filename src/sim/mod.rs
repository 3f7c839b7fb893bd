//! Frame-stepped simulation module
//!
//! All gameplay logic lives here. This module stays free of any concrete
//! renderer, audio engine, or input device:
//! - Variable dt in, collaborator commands out
//! - Seeded RNG only
//! - Stable iteration order (active list order)
//! - Entities referenced by generation-checked ids, never by pointer

pub mod arena;
pub mod collision;
pub mod encounter;
pub mod entity;
pub mod frame;
pub mod items;
pub mod mode;
pub mod pickup;
pub mod projectile;
pub mod props;
pub mod rules;
pub mod scoring;
pub mod session;
pub mod ship;
pub mod stats;
pub mod vortex;
pub mod weapon;

pub use arena::{EntityArena, EntityId};
pub use collision::{CollisionResult, circle_circle, circles_overlap};
pub use encounter::{Encounter, EncounterKind, find_space_for_encounter};
pub use entity::{Body, DamageResult, Entity, EntityFlags, EntityKind, Parent};
pub use frame::{Collaborators, FrameContext, GameEvent, TargetInfo};
pub use items::{
    Active, ActiveKind, Chassis, ChassisKind, EquipSlot, Item, Passive, PassiveKind, PowerUp, Weapon,
    WeaponKind,
};
pub use mode::{GameMode, MatchPhase, format_clock, slowdown_factor};
pub use pickup::Pickup;
pub use projectile::{Motion, Projectile, ProjectileKind};
pub use props::{Asteroid, ItemCrate};
pub use rules::ModeRules;
pub use scoring::{PlayerStats, competition_ranks};
pub use session::{Session, SessionState, Standing};
pub use ship::{DronePilot, Pilot, Ship};
pub use stats::{StatKind, Stats};
pub use vortex::{BlackHole, VortexRegistry, Wormhole};
pub use weapon::{Shooter, fire_interval};
