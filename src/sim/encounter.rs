//! Encounters: special zones placed at match start
//!
//! Placement is rejection sampling inside the arena. Running out of attempts
//! means the tuning asks for more than the arena can hold, which is fatal.

use glam::Vec2;
use rand::Rng;

use super::entity::Entity;
use super::items::Item;
use super::props::{Asteroid, ItemCrate};
use super::ship::Ship;
use super::vortex::{BlackHole, Wormhole};
use crate::consts::MAX_PLACEMENT_ATTEMPTS;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterKind {
    /// Field of small drifting asteroids
    Nebula,
    /// One oversized asteroid ringed by crates
    Bossteroid,
    /// A few hostile drones
    Squadron,
    BlackHole,
    /// Comes in linked pairs
    Wormhole,
}

impl EncounterKind {
    pub const MINOR: [EncounterKind; 3] = [
        EncounterKind::Nebula,
        EncounterKind::Bossteroid,
        EncounterKind::Squadron,
    ];
    pub const MAJOR: [EncounterKind; 2] = [EncounterKind::BlackHole, EncounterKind::Wormhole];

    pub fn needs_twin(self) -> bool {
        self == EncounterKind::Wormhole
    }

    pub fn random_minor(rng: &mut impl Rng) -> Self {
        Self::MINOR[rng.random_range(0..Self::MINOR.len())]
    }

    pub fn random_major(rng: &mut impl Rng) -> Self {
        Self::MAJOR[rng.random_range(0..Self::MAJOR.len())]
    }
}

/// A placed zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encounter {
    pub kind: EncounterKind,
    pub center: Vec2,
    pub radius: f32,
    /// Index of the linked encounter (wormholes)
    pub twin: Option<usize>,
}

/// Entities an encounter wants in the world
#[derive(Debug, Default)]
pub struct EncounterSpawn {
    pub entities: Vec<Entity>,
    /// Attached to the first entity, at the given offset
    pub satellites: Vec<(Entity, Vec2)>,
}

const NEBULA_DENSITY: f32 = 3.0;
const SQUADRON_SIZE: usize = 3;
const BOSSTEROID_CRATES: usize = 3;
/// Wormhole mouth relative to its encounter circle
const WORMHOLE_MOUTH: f32 = 0.5;

impl Encounter {
    pub fn new(kind: EncounterKind, center: Vec2, radius: f32) -> Self {
        Self {
            kind,
            center,
            radius,
            twin: None,
        }
    }

    /// Build this encounter's entities; `all` is the full encounter list
    /// (needed to find a wormhole's twin)
    pub fn spawn(&self, all: &[Encounter], rng: &mut impl Rng) -> EncounterSpawn {
        let mut out = EncounterSpawn::default();
        match self.kind {
            EncounterKind::Nebula => {
                let count = (self.radius * NEBULA_DENSITY).round().max(1.0) as usize;
                for _ in 0..count {
                    let pos = random_point_in_circle(rng, self.center, self.radius);
                    let asteroid = Asteroid::with_scale(rng.random_range(0.2..0.45))
                        .with_spin(rng.random_range(-2.0..2.0));
                    out.entities.push(Entity::asteroid(pos, asteroid));
                }
            }
            EncounterKind::Bossteroid => {
                let core_scale = self.radius * 0.5;
                let spin = if rng.random_bool(0.5) { 0.3 } else { -0.3 };
                out.entities
                    .push(Entity::asteroid(self.center, Asteroid::with_scale(core_scale).with_spin(spin)));
                let orbit = core_scale * Asteroid::RADIUS + ItemCrate::RADIUS + 0.2;
                let phase = rng.random_range(0.0..std::f32::consts::TAU);
                for i in 0..BOSSTEROID_CRATES {
                    let angle = phase + std::f32::consts::TAU * i as f32 / BOSSTEROID_CRATES as f32;
                    let offset = crate::direction_from_angle(angle) * orbit;
                    let contents = Some(Item::random(&mut *rng));
                    let item_crate = Entity::item_crate(self.center + offset, ItemCrate::new(contents));
                    out.satellites.push((item_crate, offset));
                }
            }
            EncounterKind::Squadron => {
                for i in 0..SQUADRON_SIZE {
                    let angle = std::f32::consts::TAU * i as f32 / SQUADRON_SIZE as f32;
                    let pos = self.center + crate::direction_from_angle(angle) * self.radius * 0.5;
                    let mut drone = Entity::ship(pos, Ship::drone(&mut *rng));
                    drone.body.rotation = angle;
                    out.entities.push(drone);
                }
            }
            EncounterKind::BlackHole => {
                out.entities
                    .push(Entity::black_hole(self.center, self.radius, BlackHole::new(false)));
            }
            EncounterKind::Wormhole => match self.twin.and_then(|i| all.get(i)) {
                Some(twin) => {
                    let wormhole = Wormhole::new(twin.center, twin.radius * WORMHOLE_MOUTH);
                    out.entities
                        .push(Entity::wormhole(self.center, self.radius * WORMHOLE_MOUTH, wormhole));
                }
                None => log::warn!("Wormhole at {:?} has no twin; skipped", self.center),
            },
        }
        out
    }
}

/// Uniform point in the arena, kept `inset` away from the walls
pub fn random_point_in_arena(rng: &mut impl Rng, half_extents: Vec2, inset: f32) -> Vec2 {
    let limit = (half_extents - Vec2::splat(inset)).max(Vec2::ZERO);
    Vec2::new(
        rng.random_range(-limit.x..=limit.x),
        rng.random_range(-limit.y..=limit.y),
    )
}

/// Uniform point inside a circle
pub fn random_point_in_circle(rng: &mut impl Rng, center: Vec2, radius: f32) -> Vec2 {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    let dist = radius * rng.random_range(0.0f32..=1.0).sqrt();
    center + crate::direction_from_angle(angle) * dist
}

/// Find a center for a circle of `radius` that overlaps none of `existing`
pub fn find_space_for_encounter(
    rng: &mut impl Rng,
    half_extents: Vec2,
    radius: f32,
    existing: &[Encounter],
) -> SimResult<Vec2> {
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let candidate = random_point_in_arena(rng, half_extents, radius);
        let clear = existing.iter().all(|e| {
            let min_dist = radius + e.radius;
            candidate.distance_squared(e.center) > min_dist * min_dist
        });
        if clear {
            return Ok(candidate);
        }
    }
    log::error!(
        "No room for an encounter of radius {radius} among {} others",
        existing.len()
    );
    Err(SimError::EncounterSpaceExhausted {
        radius,
        attempts: MAX_PLACEMENT_ATTEMPTS,
    })
}
