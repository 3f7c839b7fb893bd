//! Entities: a shared physical body plus a closed set of behaviors
//!
//! [`Body`] carries what every entity has (transform, health, shield, flags,
//! inventory). [`EntityKind`] picks the behavior, and [`Entity`] dispatches
//! `update`, `resolve_collision`, and `die` to it with an explicit match.

use glam::Vec2;

use super::arena::EntityId;
use super::collision;
use super::frame::{FrameContext, GameEvent};
use super::items::Item;
use super::pickup::Pickup;
use super::projectile::Projectile;
use super::props::{Asteroid, ItemCrate};
use super::ship::Ship;
use super::vortex::{BlackHole, Wormhole};
use crate::consts::INVENTORY_CAPACITY;
use crate::input::PlayerSlot;
use crate::render::{SpriteKind, Surface, Tint};

/// Shields never get better than this at soaking damage
const MIN_DISRUPTION: f32 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityFlags {
    /// Projectiles may hit this
    pub collides_with_bullets: bool,
    /// Clamped to the arena rectangle every frame
    pub stays_within_bounds: bool,
    /// Impulses are discarded
    pub immobile: bool,
    /// Damage is ignored
    pub invincible: bool,
    /// Skipped by the collision pass entirely
    pub no_collide: bool,
}

/// Transform link to another entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parent {
    pub id: EntityId,
    /// Offset in the parent's rotated frame
    pub offset: Vec2,
}

/// Outcome of a damage attempt
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageResult {
    /// Shield plus hull actually removed
    pub dealt: f32,
    /// This hit took the entity from alive to dead
    pub killed: bool,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub pos: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    impulse: Vec2,
    scale: f32,
    base_radius: f32,
    collision_radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub shield: f32,
    pub max_shield: f32,
    /// Seconds since spawn
    pub age: f32,
    dead: bool,
    /// Who fired / dropped this (attribution only)
    pub owner: Option<EntityId>,
    pub parent: Option<Parent>,
    pub inventory: Vec<Item>,
    pub flags: EntityFlags,
    pub surface: Surface,
}

impl Body {
    pub fn new(pos: Vec2, base_radius: f32, max_hp: f32) -> Self {
        Self {
            pos,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            impulse: Vec2::ZERO,
            scale: 1.0,
            base_radius,
            collision_radius: base_radius,
            hp: max_hp,
            max_hp,
            shield: 0.0,
            max_shield: 0.0,
            age: 0.0,
            dead: false,
            owner: None,
            parent: None,
            inventory: Vec::new(),
            flags: EntityFlags::default(),
            surface: Surface::Metal,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Rescale; the collision radius follows
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.collision_radius = self.base_radius * scale;
    }

    pub fn collision_radius(&self) -> f32 {
        self.collision_radius
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn forward(&self) -> Vec2 {
        crate::direction_from_angle(self.rotation)
    }

    pub fn is_colliding_with(&self, other: &Body) -> bool {
        collision::circles_overlap(self.pos, self.collision_radius, other.pos, other.collision_radius)
    }

    /// Accumulate a velocity change for this frame
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.impulse += impulse;
    }

    /// Impulse accumulated so far this frame
    pub fn impulse(&self) -> Vec2 {
        self.impulse
    }

    /// Consume the accumulated impulse
    pub fn take_impulse(&mut self) -> Vec2 {
        std::mem::take(&mut self.impulse)
    }

    /// Fold the impulse into velocity and advance position
    pub fn integrate(&mut self, dt: f32) {
        let impulse = self.take_impulse();
        if !self.flags.immobile {
            self.velocity += impulse;
        }
        self.pos += self.velocity * dt;
    }

    /// Shield soaks first, scaled by `disruption`; the rest hits the hull
    pub fn take_damage(&mut self, amount: f32, disruption: f32) -> DamageResult {
        if self.dead || self.flags.invincible || amount <= 0.0 {
            return DamageResult::default();
        }
        let disruption = disruption.max(MIN_DISRUPTION);
        let mut remaining = amount;
        let mut dealt = 0.0;

        if self.shield > 0.0 {
            let cost = remaining * disruption;
            if cost <= self.shield {
                self.shield -= cost;
                return DamageResult {
                    dealt: amount,
                    killed: false,
                };
            }
            let absorbed = self.shield / disruption;
            self.shield = 0.0;
            remaining -= absorbed;
            dealt += absorbed;
        }

        dealt += remaining.min(self.hp.max(0.0));
        self.hp -= remaining;
        let killed = self.hp <= 0.0 && self.mark_dead();
        DamageResult { dealt, killed }
    }

    /// Raise hull, never past max
    pub fn heal(&mut self, amount: f32) {
        if self.hp >= self.max_hp {
            return;
        }
        self.hp = (self.hp + amount.max(0.0)).min(self.max_hp);
    }

    /// Top the hull back up to max
    pub fn heal_full(&mut self) {
        self.heal(self.max_hp);
    }

    /// Flip to dead; false if it already was
    pub fn mark_dead(&mut self) -> bool {
        if self.dead {
            return false;
        }
        self.dead = true;
        self.shield = 0.0;
        true
    }

    /// Back to life with full hull and shield
    pub fn revive(&mut self) {
        self.dead = false;
        self.hp = self.max_hp;
        self.shield = self.max_shield;
        self.impulse = Vec2::ZERO;
    }

    /// Store an item; hands it back when the inventory is full
    pub fn store(&mut self, item: Item) -> Result<(), Item> {
        if self.inventory.len() >= INVENTORY_CAPACITY {
            return Err(item);
        }
        self.inventory.push(item);
        Ok(())
    }

    /// Keep inside the arena rectangle, killing velocity into the wall
    pub fn clamp_to_bounds(&mut self, half_extents: Vec2) {
        let limit = (half_extents - Vec2::splat(self.collision_radius)).max(Vec2::ZERO);
        if self.pos.x.abs() > limit.x {
            self.pos.x = self.pos.x.clamp(-limit.x, limit.x);
            self.velocity.x = 0.0;
        }
        if self.pos.y.abs() > limit.y {
            self.pos.y = self.pos.y.clamp(-limit.y, limit.y);
            self.velocity.y = 0.0;
        }
    }
}

#[derive(Debug, Clone)]
pub enum EntityKind {
    Ship(Box<Ship>),
    Projectile(Projectile),
    Asteroid(Asteroid),
    Crate(ItemCrate),
    Pickup(Pickup),
    BlackHole(BlackHole),
    Wormhole(Wormhole),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub body: Body,
    pub kind: EntityKind,
}

impl Entity {
    pub fn ship(pos: Vec2, ship: Ship) -> Self {
        let mut body = Body::new(pos, Ship::RADIUS, 1.0);
        body.flags.collides_with_bullets = true;
        body.flags.stays_within_bounds = true;
        body.surface = Surface::Metal;
        ship.sync_limits(&mut body);
        body.revive();
        Self {
            body,
            kind: EntityKind::Ship(Box::new(ship)),
        }
    }

    pub fn projectile(pos: Vec2, velocity: Vec2, owner: Option<EntityId>, projectile: Projectile) -> Self {
        let mut body = Body::new(pos, projectile.kind.radius(), 1.0);
        body.velocity = velocity;
        body.rotation = crate::angle_of(velocity);
        body.owner = owner;
        Self {
            body,
            kind: EntityKind::Projectile(projectile),
        }
    }

    pub fn asteroid(pos: Vec2, asteroid: Asteroid) -> Self {
        let mut body = Body::new(pos, Asteroid::RADIUS, 1.0);
        body.flags.collides_with_bullets = true;
        body.flags.stays_within_bounds = true;
        body.surface = Surface::Rock;
        asteroid.apply_scale(&mut body, asteroid.initial_scale());
        Self {
            body,
            kind: EntityKind::Asteroid(asteroid),
        }
    }

    pub fn item_crate(pos: Vec2, item_crate: ItemCrate) -> Self {
        let mut body = Body::new(pos, ItemCrate::RADIUS, ItemCrate::HP);
        body.flags.collides_with_bullets = true;
        body.flags.immobile = true;
        body.surface = Surface::Wood;
        Self {
            body,
            kind: EntityKind::Crate(item_crate),
        }
    }

    pub fn pickup(pos: Vec2, item: Item) -> Self {
        let mut body = Body::new(pos, Pickup::RADIUS, 1.0);
        body.flags.stays_within_bounds = true;
        body.flags.invincible = true;
        Self {
            body,
            kind: EntityKind::Pickup(Pickup::new(item)),
        }
    }

    pub fn black_hole(pos: Vec2, radius: f32, black_hole: BlackHole) -> Self {
        let mut body = Body::new(pos, 1.0, 1.0);
        body.set_scale(radius);
        body.flags.immobile = true;
        body.flags.invincible = true;
        Self {
            body,
            kind: EntityKind::BlackHole(black_hole),
        }
    }

    pub fn wormhole(pos: Vec2, radius: f32, wormhole: Wormhole) -> Self {
        let mut body = Body::new(pos, 1.0, 1.0);
        body.set_scale(radius);
        body.flags.immobile = true;
        body.flags.invincible = true;
        Self {
            body,
            kind: EntityKind::Wormhole(wormhole),
        }
    }

    pub fn as_ship(&self) -> Option<&Ship> {
        match &self.kind {
            EntityKind::Ship(ship) => Some(&**ship),
            _ => None,
        }
    }

    pub fn as_ship_mut(&mut self) -> Option<&mut Ship> {
        match &mut self.kind {
            EntityKind::Ship(ship) => Some(&mut **ship),
            _ => None,
        }
    }

    /// Ship behavior and its body, borrowed together
    pub fn split_ship_mut(&mut self) -> Option<(&mut Ship, &mut Body)> {
        match &mut self.kind {
            EntityKind::Ship(ship) => Some((&mut **ship, &mut self.body)),
            _ => None,
        }
    }

    pub fn player_slot(&self) -> Option<PlayerSlot> {
        self.as_ship().and_then(Ship::player_slot)
    }

    pub fn is_player(&self) -> bool {
        self.player_slot().is_some()
    }

    pub fn is_vortex(&self) -> bool {
        matches!(self.kind, EntityKind::BlackHole(_) | EntityKind::Wormhole(_))
    }

    /// Solid things push each other apart
    pub fn is_solid(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Ship(_) | EntityKind::Asteroid(_) | EntityKind::Crate(_)
        )
    }

    pub fn sprite(&self) -> (SpriteKind, Tint) {
        match &self.kind {
            EntityKind::Ship(ship) => ship.sprite(),
            EntityKind::Projectile(p) => (p.kind.sprite(), Tint::WHITE),
            EntityKind::Asteroid(_) => (SpriteKind::Asteroid, Tint::GRAY),
            EntityKind::Crate(_) => (SpriteKind::Crate, Tint::WHITE),
            EntityKind::Pickup(p) => (SpriteKind::Pickup, p.item.tint()),
            EntityKind::BlackHole(_) => (SpriteKind::BlackHole, Tint::WHITE),
            EntityKind::Wormhole(_) => (SpriteKind::Wormhole, Tint::BLUE),
        }
    }

    pub fn is_colliding_with(&self, other: &Entity) -> bool {
        self.body.is_colliding_with(&other.body)
    }

    /// Advance one frame
    pub fn update(&mut self, id: EntityId, dt: f32, ctx: &mut FrameContext<'_, '_>) {
        self.body.age += dt;
        let Entity { body, kind } = self;
        match kind {
            EntityKind::Ship(ship) => ship.update(body, id, dt, ctx),
            EntityKind::Projectile(p) => p.update(body, dt, ctx),
            EntityKind::Asteroid(a) => a.update(body, dt),
            EntityKind::Crate(_) => {
                body.take_impulse();
            }
            EntityKind::Pickup(p) => p.update(body, dt),
            EntityKind::BlackHole(b) => b.update(body, dt),
            EntityKind::Wormhole(w) => w.update(body, dt),
        }
        if body.flags.stays_within_bounds {
            body.clamp_to_bounds(ctx.arena_half_extents);
        }
    }

    /// React to overlapping `other`; only this side's behavior runs
    pub fn resolve_collision(
        &mut self,
        other_id: EntityId,
        other: &mut Entity,
        ctx: &mut FrameContext<'_, '_>,
    ) {
        let Entity { body, kind } = self;
        match kind {
            EntityKind::Ship(ship) => ship.resolve_collision(body, other_id, other, ctx),
            EntityKind::Projectile(p) => p.resolve_collision(body, other_id, other, ctx),
            EntityKind::Asteroid(a) => a.resolve_collision(body, other, ctx),
            EntityKind::Crate(_) => {}
            EntityKind::Pickup(p) => p.resolve_collision(body, other, ctx),
            EntityKind::BlackHole(b) => b.resolve_collision(body, other_id, other, ctx),
            EntityKind::Wormhole(w) => w.resolve_collision(body, other_id, other, ctx),
        }
    }

    /// Damage with death handling; `Die` runs at most once
    pub fn take_damage(
        &mut self,
        id: EntityId,
        amount: f32,
        disruption: f32,
        ctx: &mut FrameContext<'_, '_>,
    ) -> DamageResult {
        let result = self.body.take_damage(amount, disruption);
        if result.dealt > 0.0 {
            if let EntityKind::Ship(ship) = &mut self.kind {
                ship.note_hit();
            }
        }
        if result.killed {
            self.on_death(id, ctx);
        }
        result
    }

    /// Kill outright (no-op if already dead)
    pub fn die(&mut self, id: EntityId, ctx: &mut FrameContext<'_, '_>) {
        if self.body.mark_dead() {
            self.on_death(id, ctx);
        }
    }

    fn on_death(&mut self, id: EntityId, ctx: &mut FrameContext<'_, '_>) {
        let Entity { body, kind } = self;
        match kind {
            EntityKind::Ship(ship) => {
                ship.on_death(body, id, ctx);
                if ship.is_player() {
                    ctx.emit(GameEvent::PlayerDied { victim: id });
                }
            }
            EntityKind::Asteroid(a) => a.on_death(body, ctx),
            EntityKind::Crate(c) => c.on_death(body, ctx),
            EntityKind::Projectile(_)
            | EntityKind::Pickup(_)
            | EntityKind::BlackHole(_)
            | EntityKind::Wormhole(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::frame::testing::Harness;
    use proptest::prelude::*;

    fn shielded(hp: f32, shield: f32) -> Body {
        let mut body = Body::new(Vec2::ZERO, 1.0, hp);
        body.max_shield = shield;
        body.shield = shield;
        body
    }

    #[test]
    fn test_shield_overflow_spills_into_hull() {
        let mut body = shielded(100.0, 10.0);
        let result = body.take_damage(15.0, 1.0);
        assert_eq!(body.shield, 0.0);
        assert!((body.hp - 95.0).abs() < 0.0001);
        assert!((result.dealt - 15.0).abs() < 0.0001);
        assert!(!result.killed);
    }

    #[test]
    fn test_overflow_kill_fires_once() {
        let mut body = shielded(5.0, 10.0);
        let first = body.take_damage(15.0, 1.0);
        assert!(first.killed);
        assert!(body.is_dead());
        let hp = body.hp;
        let second = body.take_damage(15.0, 1.0);
        assert_eq!(second, DamageResult::default());
        assert_eq!(body.hp, hp);
    }

    #[test]
    fn test_heal_full_restores_max_hull() {
        let mut body = shielded(80.0, 0.0);
        body.take_damage(55.0, 1.0);
        assert!((body.hp - 25.0).abs() < 0.0001);
        body.heal_full();
        assert_eq!(body.hp, body.max_hp);
        body.heal_full();
        assert_eq!(body.hp, 80.0);
    }

    #[test]
    fn test_low_disruption_soaks_more() {
        let mut body = shielded(100.0, 10.0);
        body.take_damage(15.0, 0.5);
        assert!((body.shield - 2.5).abs() < 0.0001);
        assert_eq!(body.hp, 100.0);
    }

    #[test]
    fn test_invincible_ignores_damage() {
        let mut body = Body::new(Vec2::ZERO, 1.0, 10.0);
        body.flags.invincible = true;
        assert_eq!(body.take_damage(50.0, 1.0), DamageResult::default());
        assert_eq!(body.hp, 10.0);
    }

    #[test]
    fn test_impulses_add_and_clear() {
        let mut body = Body::new(Vec2::ZERO, 1.0, 1.0);
        body.apply_impulse(Vec2::new(1.0, 0.0));
        body.apply_impulse(Vec2::new(0.0, 2.0));
        assert_eq!(body.impulse(), Vec2::new(1.0, 2.0));
        body.integrate(0.5);
        assert_eq!(body.velocity, Vec2::new(1.0, 2.0));
        assert_eq!(body.pos, Vec2::new(0.5, 1.0));
        assert_eq!(body.impulse(), Vec2::ZERO);
    }

    #[test]
    fn test_immobile_discards_impulse() {
        let mut body = Body::new(Vec2::ZERO, 1.0, 1.0);
        body.flags.immobile = true;
        body.apply_impulse(Vec2::ONE);
        body.integrate(1.0);
        assert_eq!(body.pos, Vec2::ZERO);
    }

    #[test]
    fn test_scale_drives_radius() {
        let mut body = Body::new(Vec2::ZERO, 2.0, 1.0);
        body.set_scale(0.25);
        assert!((body.collision_radius() - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_clamp_to_bounds_stops_wall_velocity() {
        let mut body = Body::new(Vec2::new(30.0, 0.0), 1.0, 1.0);
        body.velocity = Vec2::new(5.0, 1.0);
        body.clamp_to_bounds(Vec2::splat(20.0));
        assert_eq!(body.pos.x, 19.0);
        assert_eq!(body.velocity, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_inventory_is_bounded() {
        let mut body = Body::new(Vec2::ZERO, 1.0, 1.0);
        let item = Item::PowerUp(crate::sim::items::PowerUp::new(crate::sim::StatKind::Damage));
        for _ in 0..INVENTORY_CAPACITY {
            body.store(item).unwrap();
        }
        assert!(body.store(item).is_err());
    }

    #[test]
    fn test_die_is_guarded() {
        let mut harness = Harness::new(1);
        let mut rock = Entity::asteroid(Vec2::ZERO, Asteroid::with_scale(1.0));
        let id = crate::sim::EntityArena::new().insert(rock.clone());
        harness.with_ctx(0.016, |ctx| {
            rock.die(id, ctx);
            rock.die(id, ctx);
        });
        assert_eq!(harness.spawned.iter().filter(|e| matches!(e.kind, EntityKind::Asteroid(_))).count(), 2);
    }

    proptest! {
        #[test]
        fn prop_heal_never_exceeds_max(max in 1.0f32..500.0, frac in 0.0f32..1.0, amount in 0.0f32..1000.0) {
            let mut body = Body::new(Vec2::ZERO, 1.0, max);
            body.hp = max * frac;
            body.heal(amount);
            prop_assert!(body.hp <= max);
        }

        #[test]
        fn prop_damage_after_death_is_noop(amount in 0.0f32..500.0, disruption in 0.0f32..3.0) {
            let mut body = shielded(10.0, 5.0);
            body.take_damage(1000.0, 1.0);
            prop_assume!(body.is_dead());
            let before = (body.hp, body.shield);
            let result = body.take_damage(amount, disruption);
            prop_assert!(!result.killed);
            prop_assert_eq!((body.hp, body.shield), before);
        }

        #[test]
        fn prop_collision_is_symmetric(
            ax in -30.0f32..30.0, ay in -30.0f32..30.0, ascale in 0.1f32..3.0,
            bx in -30.0f32..30.0, by in -30.0f32..30.0, bscale in 0.1f32..3.0,
        ) {
            let mut a = Body::new(Vec2::new(ax, ay), 1.0, 1.0);
            a.set_scale(ascale);
            let mut b = Body::new(Vec2::new(bx, by), 0.5, 1.0);
            b.set_scale(bscale);
            prop_assert_eq!(a.is_colliding_with(&b), b.is_colliding_with(&a));
        }
    }
}
