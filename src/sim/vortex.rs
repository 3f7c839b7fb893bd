//! Vortices: black holes and wormholes
//!
//! Both are invincible, immobile zones. The renderer distorts space around
//! each one, so live vortices hold a slot in a small [`VortexRegistry`].

use glam::Vec2;

use super::arena::EntityId;
use super::entity::{Body, Entity, EntityKind};
use super::frame::FrameContext;
use crate::audio::SoundCue;
use crate::consts::MAX_VORTICES;
use crate::render::Effect;

/// Pulls things in; grinds up whatever reaches the core
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackHole {
    pub grows_over_time: bool,
}

impl BlackHole {
    /// Velocity change per second at the center
    pub const PULL_STRENGTH: f32 = 30.0;
    /// Inner fraction of the radius that deals damage
    pub const CORE_FRACTION: f32 = 0.3;
    pub const CORE_DAMAGE_PER_SECOND: f32 = 40.0;
    /// Radius gained per second when growing
    pub const GROWTH_PER_SECOND: f32 = 0.05;
    pub const MAX_RADIUS: f32 = 6.0;
    const SPIN: f32 = 1.0;

    pub fn new(grows_over_time: bool) -> Self {
        Self { grows_over_time }
    }

    pub fn update(&self, body: &mut Body, dt: f32) {
        body.take_impulse();
        body.rotation = crate::normalize_angle(body.rotation + Self::SPIN * dt);
        if self.grows_over_time {
            let grown = (body.scale() + Self::GROWTH_PER_SECOND * dt).min(Self::MAX_RADIUS);
            body.set_scale(grown);
        }
    }

    pub fn resolve_collision(
        &self,
        body: &mut Body,
        other_id: EntityId,
        other: &mut Entity,
        ctx: &mut FrameContext<'_, '_>,
    ) {
        if other.is_vortex() || other.body.is_dead() {
            return;
        }
        let offset = body.pos - other.body.pos;
        let dist = offset.length();
        let radius = body.collision_radius();
        let falloff = (1.0 - dist / radius).clamp(0.0, 1.0);
        if !other.body.flags.immobile {
            other
                .body
                .apply_impulse(offset.normalize_or_zero() * Self::PULL_STRENGTH * falloff * ctx.dt);
        }
        if dist >= radius * Self::CORE_FRACTION {
            return;
        }
        if matches!(other.kind, EntityKind::Projectile(_) | EntityKind::Pickup(_)) {
            other.die(other_id, ctx);
        } else {
            other.take_damage(other_id, Self::CORE_DAMAGE_PER_SECOND * ctx.dt, 1.0, ctx);
        }
    }
}

/// Teleports whatever touches it to its linked twin
#[derive(Debug, Clone, PartialEq)]
pub struct Wormhole {
    pub exit: Vec2,
    pub exit_radius: f32,
    cooldowns: Vec<(EntityId, f32)>,
}

impl Wormhole {
    /// Same entity can't use this wormhole again for this long
    pub const REENTRY_COOLDOWN: f32 = 1.0;
    const SPIN: f32 = -1.5;
    const EXIT_MARGIN: f32 = 0.1;

    pub fn new(exit: Vec2, exit_radius: f32) -> Self {
        Self {
            exit,
            exit_radius,
            cooldowns: Vec::new(),
        }
    }

    pub fn update(&mut self, body: &mut Body, dt: f32) {
        body.take_impulse();
        body.rotation = crate::normalize_angle(body.rotation + Self::SPIN * dt);
        for (_, remaining) in self.cooldowns.iter_mut() {
            *remaining -= dt;
        }
        self.cooldowns.retain(|(_, remaining)| *remaining > 0.0);
    }

    pub fn resolve_collision(
        &mut self,
        body: &mut Body,
        other_id: EntityId,
        other: &mut Entity,
        ctx: &mut FrameContext<'_, '_>,
    ) {
        if other.body.flags.immobile || other.is_vortex() || other.body.is_dead() {
            return;
        }
        if self.cooldowns.iter().any(|(id, _)| *id == other_id) {
            return;
        }
        let away = (other.body.pos - body.pos).normalize_or(Vec2::X);
        let direction = other.body.velocity.normalize_or(away);
        let entry = other.body.pos;
        other.body.pos =
            self.exit + direction * (self.exit_radius + other.body.collision_radius() + Self::EXIT_MARGIN);
        if let Some(parent) = other.body.parent.take() {
            log::debug!("Wormhole detached {:?} from {:?}", other_id, parent.id);
        }
        self.cooldowns.push((other_id, Self::REENTRY_COOLDOWN));

        ctx.effect(Effect::WarpFlash, entry, None);
        ctx.effect(Effect::WarpFlash, other.body.pos, None);
        ctx.play_sound_at(SoundCue::Warp, other.body.pos, 1.0, 1.0);
    }
}

/// Fixed-capacity slot table for the renderer's vortex distortion
#[derive(Debug, Clone, Default)]
pub struct VortexRegistry {
    slots: [Option<EntityId>; MAX_VORTICES],
}

impl VortexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a free slot; `None` when all are taken
    pub fn register(&mut self, id: EntityId) -> Option<usize> {
        if let Some(slot) = self.slot_of(id) {
            return Some(slot);
        }
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(id);
        Some(slot)
    }

    pub fn release(&mut self, id: EntityId) {
        if let Some(slot) = self.slot_of(id) {
            self.slots[slot] = None;
        }
    }

    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(id))
    }

    pub fn clear(&mut self) {
        self.slots = [None; MAX_VORTICES];
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupied slots
    pub fn iter(&self) -> impl Iterator<Item = (usize, EntityId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, id)| id.map(|id| (slot, id)))
    }
}
