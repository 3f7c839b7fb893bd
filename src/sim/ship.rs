//! Ships: player- or drone-piloted, equipment-driven
//!
//! A ship's effective stats are the sum of its base layer, each equipped
//! item, and every power-up in its inventory. Movement, firing, shields,
//! and active items all read that sum each frame.

use glam::Vec2;
use rand::Rng;

use super::arena::EntityId;
use super::collision;
use super::entity::{Body, Entity};
use super::frame::{FrameContext, GameEvent};
use super::items::{Active, ActiveTick, Chassis, EquipSlot, Item, Passive, PowerUp, Weapon};
use super::stats::Stats;
use super::weapon::Shooter;
use crate::audio::SoundCue;
use crate::consts::MOVE_DEADZONE;
use crate::input::{PilotIntent, PlayerSlot};
use crate::render::{Effect, SpriteKind, Surface, Tint};
use crate::{angle_of, normalize_angle};

/// Colors handed out by player slot
const PLAYER_TINTS: [Tint; 4] = [Tint::RED, Tint::BLUE, Tint::GREEN, Tint::YELLOW];

/// Simple AI: drift along a slowly turning heading and shoot constantly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DronePilot {
    heading: f32,
    /// Radians per second
    turn_rate: f32,
    /// Stick deflection, 0.0 - 1.0
    throttle: f32,
}

impl DronePilot {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            heading: rng.random_range(0.0..std::f32::consts::TAU),
            turn_rate: rng.random_range(-0.5..0.5),
            throttle: rng.random_range(0.3..1.0),
        }
    }

    fn intent(&mut self, dt: f32) -> PilotIntent {
        self.heading = normalize_angle(self.heading + self.turn_rate * dt);
        PilotIntent {
            movement: crate::direction_from_angle(self.heading) * self.throttle,
            fire: true,
            ..Default::default()
        }
    }
}

/// Who is flying
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pilot {
    Player(PlayerSlot),
    Drone(DronePilot),
    /// Nobody; the ship coasts
    Idle,
}

#[derive(Debug, Clone)]
pub struct Ship {
    pub pilot: Pilot,
    pub base_stats: Stats,
    pub weapon: Option<Weapon>,
    pub chassis: Option<Chassis>,
    pub active: Option<Active>,
    pub passive: Option<Passive>,
    pub seconds_since_last_fired: f32,
    seconds_since_hit: f32,
    /// Per-target contact damage cooldowns
    contact_cooldowns: Vec<(EntityId, f32)>,
    /// Seconds each slot's eject button has been held
    eject_hold: [f32; 4],
    movement_locked: bool,
    pub tint: Tint,
    /// Running total of damage landed by this ship's shots
    pub total_damage_done: f32,
    /// Last intent read from the pilot (camera look-ahead uses the aim stick)
    pub last_intent: PilotIntent,
}

impl Ship {
    pub const RADIUS: f32 = 0.5;
    /// Shield waits this long after a hit before regenerating
    pub const SHIELD_REGEN_DELAY: f32 = 2.0;
    pub const CONTACT_COOLDOWN: f32 = 0.5;
    pub const CONTACT_DAMAGE: f32 = 5.0;
    pub const EJECT_HOLD_SECONDS: f32 = 1.0;
    pub const WARP_DISTANCE: f32 = 6.0;
    /// Fire intervals never get longer than 1 / this
    pub const MIN_RATE_OF_FIRE: f32 = 0.1;
    const BUMP_STIFFNESS: f32 = 30.0;
    const DROP_SCATTER: f32 = 1.0;
    const EJECT_DROP_DISTANCE: f32 = 1.2;

    fn new(pilot: Pilot, base_stats: Stats, tint: Tint) -> Self {
        Self {
            pilot,
            base_stats,
            weapon: None,
            chassis: None,
            active: None,
            passive: None,
            seconds_since_last_fired: 0.0,
            seconds_since_hit: Self::SHIELD_REGEN_DELAY,
            contact_cooldowns: Vec::new(),
            eject_hold: [0.0; 4],
            movement_locked: false,
            tint,
            total_damage_done: 0.0,
            last_intent: PilotIntent::default(),
        }
    }

    pub fn player(slot: PlayerSlot) -> Self {
        Self::new(
            Pilot::Player(slot),
            Stats::ship_base(),
            PLAYER_TINTS[slot.index() % PLAYER_TINTS.len()],
        )
    }

    pub fn drone(rng: &mut impl Rng) -> Self {
        let base = Stats {
            top_speed: 2.5,
            acceleration: 6.0,
            handling: 3.0,
            damage: 6.0,
            rate_of_fire: 0.7,
            hp: 30.0,
            shield_capacity: 0.0,
            shield_regen: 0.0,
            ..Stats::ship_base()
        };
        Self::new(Pilot::Drone(DronePilot::random(rng)), base, Tint::GRAY)
    }

    pub fn player_slot(&self) -> Option<PlayerSlot> {
        match self.pilot {
            Pilot::Player(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool {
        self.player_slot().is_some()
    }

    pub fn sprite(&self) -> (SpriteKind, Tint) {
        let kind = if self.is_player() {
            SpriteKind::PlayerShip
        } else {
            SpriteKind::Drone
        };
        (kind, self.tint)
    }

    /// Sum of every stat layer
    pub fn total_stats(&self, body: &Body) -> Stats {
        let equipment = [
            self.weapon.map(|w| w.stat_bonuses),
            self.chassis.map(|c| c.stat_bonuses),
            self.active.map(|a| a.stat_bonuses()),
            self.passive.map(|p| p.stat_bonuses()),
        ];
        let power_ups: Stats = body.inventory.iter().map(Item::stats).sum();
        self.base_stats + equipment.into_iter().flatten().sum::<Stats>() + power_ups
    }

    /// Push hull/shield maximums from stats into the body, clamping current values
    pub fn sync_limits(&self, body: &mut Body) {
        let stats = self.total_stats(body);
        body.max_hp = stats.hp.max(1.0);
        body.max_shield = stats.shield_capacity.max(0.0);
        body.hp = body.hp.min(body.max_hp);
        body.shield = body.shield.min(body.max_shield);
    }

    pub fn is_reflecting(&self) -> bool {
        self.active.is_some_and(|a| a.is_reflecting())
    }

    /// Chance an incoming shot glances off
    pub fn deflection_chance(&self, body: &Body) -> f32 {
        (self.total_stats(body).shot_deflection * 0.05).clamp(0.0, 0.5)
    }

    pub fn lock_movement(&mut self) {
        self.movement_locked = true;
    }

    pub fn unlock_movement(&mut self) {
        self.movement_locked = false;
    }

    pub fn is_movement_locked(&self) -> bool {
        self.movement_locked
    }

    /// Pause shield regeneration
    pub fn note_hit(&mut self) {
        self.seconds_since_hit = 0.0;
    }

    pub fn has_equipped(&self, slot: EquipSlot) -> bool {
        match slot {
            EquipSlot::Weapon => self.weapon.is_some(),
            EquipSlot::Chassis => self.chassis.is_some(),
            EquipSlot::Active => self.active.is_some(),
            EquipSlot::Passive => self.passive.is_some(),
        }
    }

    /// Put an item in its slot, returning whatever was there
    ///
    /// Power-ups have no slot and are handed straight back.
    pub fn equip(&mut self, item: Item) -> Option<Item> {
        match item {
            Item::Weapon(w) => self.weapon.replace(w).map(Item::Weapon),
            Item::Chassis(c) => self.chassis.replace(c).map(Item::Chassis),
            Item::Active(a) => self.active.replace(a).map(Item::Active),
            Item::Passive(p) => self.passive.replace(p).map(Item::Passive),
            Item::PowerUp(_) => Some(item),
        }
    }

    /// Empty a slot; `None` if it was already empty
    pub fn eject(&mut self, slot: EquipSlot) -> Option<Item> {
        match slot {
            EquipSlot::Weapon => self.weapon.take().map(Item::Weapon),
            EquipSlot::Chassis => self.chassis.take().map(Item::Chassis),
            EquipSlot::Active => self.active.take().map(Item::Active),
            EquipSlot::Passive => self.passive.take().map(Item::Passive),
        }
    }

    pub fn can_pick_up(&self, body: &Body, item: &Item) -> bool {
        match item.slot() {
            None => body.inventory.len() < crate::consts::INVENTORY_CAPACITY,
            Some(_) => true,
        }
    }

    /// Take an item; a displaced piece of equipment drops into the world
    pub fn pick_up(&mut self, body: &mut Body, item: Item, ctx: &mut FrameContext<'_, '_>) -> bool {
        if !self.can_pick_up(body, &item) {
            return false;
        }
        match item {
            Item::PowerUp(_) => {
                if body.store(item).is_err() {
                    return false;
                }
            }
            _ => {
                if let Some(old) = self.equip(item) {
                    ctx.spawn_pickup(old, body.pos, Self::DROP_SCATTER);
                }
            }
        }
        log::debug!("{:?} picked up {:?}", self.pilot, item);
        self.sync_limits(body);
        true
    }

    /// Fire the equipped weapon (or the stock blaster) if the cooldown allows
    pub fn attempt_fire(&mut self, body: &Body, id: EntityId, ctx: &mut FrameContext<'_, '_>) -> bool {
        let shooter = Shooter {
            id,
            pos: body.pos,
            rotation: body.rotation,
            velocity: body.velocity,
            radius: body.collision_radius(),
            stats: self.total_stats(body),
            player: self.player_slot(),
        };
        let weapon = self.weapon.unwrap_or_else(Weapon::stock);
        weapon.attempt_fire(&shooter, &mut self.seconds_since_last_fired, ctx)
    }

    pub fn update(&mut self, body: &mut Body, id: EntityId, dt: f32, ctx: &mut FrameContext<'_, '_>) {
        self.sync_limits(body);
        for (_, remaining) in self.contact_cooldowns.iter_mut() {
            *remaining -= dt;
        }
        self.contact_cooldowns.retain(|(_, remaining)| *remaining > 0.0);
        self.seconds_since_last_fired += dt;

        let intent = match &mut self.pilot {
            Pilot::Player(slot) => ctx.collab.input.intent(*slot),
            Pilot::Drone(drone) => drone.intent(dt),
            Pilot::Idle => PilotIntent::default(),
        };
        self.last_intent = intent;

        if body.is_dead() {
            body.take_impulse();
            if intent.respawn && ctx.respawn_allowed && self.is_player() {
                ctx.emit(GameEvent::RespawnRequested { ship: id });
            }
            return;
        }

        let intent = if self.movement_locked {
            PilotIntent {
                aim: intent.aim,
                accept: intent.accept,
                ..Default::default()
            }
        } else {
            intent
        };

        let stats = self.total_stats(body);
        self.seconds_since_hit += dt;
        if self.seconds_since_hit >= Self::SHIELD_REGEN_DELAY {
            body.shield = (body.shield + stats.shield_regen.max(0.0) * dt).min(body.max_shield);
        }

        steer(body, &intent, &stats, dt);
        if intent.fire {
            self.attempt_fire(body, id, ctx);
        }
        self.update_active(body, &intent, dt, ctx);
        self.update_eject(body, &intent, dt, ctx);
        body.integrate(dt);
    }

    fn update_active(&mut self, body: &mut Body, intent: &PilotIntent, dt: f32, ctx: &mut FrameContext<'_, '_>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if intent.activate && active.trigger() {
            log::debug!("{:?} triggered {:?}", self.pilot, active.kind);
            ctx.play_sound_at(SoundCue::ActiveTrigger, body.pos, 1.0, 1.0);
        }
        if active.tick(dt) == ActiveTick::WarpReady {
            let from = body.pos;
            let jump = body.forward() * Self::WARP_DISTANCE;
            body.pos += jump;
            body.clamp_to_bounds(ctx.arena_half_extents);
            ctx.effect(Effect::WarpFlash, from, None);
            ctx.effect(Effect::WarpFlash, body.pos, None);
            ctx.play_sound_at(SoundCue::Warp, body.pos, 1.0, 1.0);
        }
    }

    fn update_eject(&mut self, body: &Body, intent: &PilotIntent, dt: f32, ctx: &mut FrameContext<'_, '_>) {
        for slot in EquipSlot::ALL {
            let held = &mut self.eject_hold[slot.index()];
            if intent.eject != Some(slot) {
                *held = 0.0;
                continue;
            }
            *held += dt;
            if *held < Self::EJECT_HOLD_SECONDS {
                continue;
            }
            *held = 0.0;
            if let Some(item) = self.eject(slot) {
                log::debug!("{:?} ejected {:?}", self.pilot, item);
                let drop_at = body.pos - body.forward() * Self::EJECT_DROP_DISTANCE;
                ctx.spawn_pickup(item, drop_at, 0.0);
                ctx.play_sound_at(SoundCue::Eject, body.pos, 1.0, 1.0);
            }
        }
    }

    fn contact_ready(&self, other: EntityId) -> bool {
        !self.contact_cooldowns.iter().any(|(id, _)| *id == other)
    }

    /// Bump solids apart and ram them for contact damage
    pub fn resolve_collision(
        &mut self,
        body: &mut Body,
        other_id: EntityId,
        other: &mut Entity,
        ctx: &mut FrameContext<'_, '_>,
    ) {
        if body.is_dead() || !other.is_solid() {
            return;
        }
        let contact = collision::circle_circle(
            body.pos,
            body.collision_radius(),
            other.body.pos,
            other.body.collision_radius(),
        );
        body.apply_impulse(collision::separation_impulse(&contact, Self::BUMP_STIFFNESS, ctx.dt));

        if other.body.flags.collides_with_bullets && self.contact_ready(other_id) {
            self.contact_cooldowns.push((other_id, Self::CONTACT_COOLDOWN));
            other.take_damage(other_id, Self::CONTACT_DAMAGE, 1.0, ctx);
        }
    }

    /// Wreck the ship: stop, scatter the inventory, hide players
    pub fn on_death(&mut self, body: &mut Body, id: EntityId, ctx: &mut FrameContext<'_, '_>) {
        body.velocity = Vec2::ZERO;
        body.take_impulse();
        self.eject_hold = [0.0; 4];
        for item in std::mem::take(&mut body.inventory) {
            ctx.spawn_pickup(item, body.pos, Self::DROP_SCATTER);
        }
        self.sync_limits(body);
        ctx.effect(Effect::Explosion, body.pos, Some(Surface::Metal));
        ctx.play_sound_at(SoundCue::ShipExplode, body.pos, 1.0, 1.0);

        match self.pilot {
            Pilot::Player(slot) => {
                log::debug!("Player {} destroyed", slot.0);
                ctx.collab.renderer.set_visible(id, false);
            }
            Pilot::Drone(_) => {
                if ctx.drop_items_on_death && ctx.coin_flip() {
                    let power_up = PowerUp::random(&mut *ctx.rng);
                    ctx.spawn_pickup(Item::PowerUp(power_up), body.pos, 0.0);
                }
            }
            Pilot::Idle => {}
        }
    }

    /// Bring a dead (or living) ship back at `spawn_point`
    pub fn respawn(&mut self, body: &mut Body, spawn_point: Vec2) {
        self.sync_limits(body);
        body.pos = spawn_point;
        body.velocity = Vec2::ZERO;
        body.revive();
        self.eject_hold = [0.0; 4];
        self.seconds_since_hit = Self::SHIELD_REGEN_DELAY;
        self.contact_cooldowns.clear();
    }

    /// Revive in place with full health (between modes)
    pub fn revive(&mut self, body: &mut Body) {
        let pos = body.pos;
        self.respawn(body, pos);
    }
}

/// Turn toward the stick and thrust, or coast on the brakes
fn steer(body: &mut Body, intent: &PilotIntent, stats: &Stats, dt: f32) {
    let throttle = intent.movement.length().min(1.0);
    if throttle > MOVE_DEADZONE {
        let delta = normalize_angle(angle_of(intent.movement) - body.rotation);
        let max_turn = stats.handling.max(0.0) * dt;
        body.rotation = normalize_angle(body.rotation + delta.clamp(-max_turn, max_turn));

        let target = body.forward() * stats.top_speed.max(0.0) * throttle;
        let step = (target - body.velocity).clamp_length_max(stats.acceleration.max(0.0) * dt);
        body.velocity += step;
    } else {
        body.velocity *= (1.0 - stats.braking.max(0.0) * dt).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EntityKind;
    use crate::sim::frame::testing::Harness;
    use crate::sim::items::{ActiveKind, ChassisKind, WeaponKind};
    use crate::sim::stats::StatKind;
    use crate::sim::EntityArena;

    fn player_entity() -> (Entity, EntityId) {
        let entity = Entity::ship(Vec2::ZERO, Ship::player(PlayerSlot(0)));
        let id = EntityArena::new().insert(entity.clone());
        (entity, id)
    }

    fn split(entity: &mut Entity) -> (&mut Ship, &mut Body) {
        entity.split_ship_mut().unwrap()
    }

    #[test]
    fn test_fire_gated_by_rate_of_fire() {
        let mut harness = Harness::new(3);
        let (mut entity, id) = player_entity();
        let (ship, body) = split(&mut entity);
        ship.weapon = Some(Weapon::with_bonuses(
            WeaponKind::Blaster,
            Stats::single(StatKind::RateOfFire, -0.5),
        ));

        ship.seconds_since_last_fired = 0.5;
        let fired = harness.with_ctx(0.016, |ctx| ship.attempt_fire(body, id, ctx));
        assert!(!fired);
        assert!(harness.spawned.is_empty());

        ship.seconds_since_last_fired = 0.7;
        let fired = harness.with_ctx(0.016, |ctx| ship.attempt_fire(body, id, ctx));
        assert!(fired);
        assert_eq!(ship.seconds_since_last_fired, 0.0);
        assert_eq!(harness.spawned.len(), 1);
        assert_eq!(harness.input.rumbles.len(), 1);
    }

    #[test]
    fn test_equipment_layers_sum() {
        let (mut entity, _) = player_entity();
        let (ship, body) = split(&mut entity);
        ship.equip(Item::Chassis(Chassis::new(ChassisKind::Tank)));
        body.store(Item::PowerUp(PowerUp::new(StatKind::Hp))).unwrap();
        let stats = ship.total_stats(body);
        assert!((stats.hp - (100.0 + 60.0 + 10.0)).abs() < 0.0001);
    }

    #[test]
    fn test_equip_swaps_and_eject_clears() {
        let (mut entity, _) = player_entity();
        let (ship, _) = split(&mut entity);
        assert!(ship.equip(Item::Weapon(Weapon::new(WeaponKind::SpreadShot))).is_none());
        let old = ship.equip(Item::Weapon(Weapon::new(WeaponKind::WaveGun)));
        assert!(matches!(old, Some(Item::Weapon(w)) if w.kind == WeaponKind::SpreadShot));
        assert!(ship.eject(EquipSlot::Weapon).is_some());
        assert!(ship.eject(EquipSlot::Weapon).is_none());
        assert!(!ship.has_equipped(EquipSlot::Weapon));
    }

    #[test]
    fn test_holding_eject_drops_item() {
        let mut harness = Harness::new(4);
        let (mut entity, id) = player_entity();
        entity
            .as_ship_mut()
            .unwrap()
            .equip(Item::Active(Active::new(ActiveKind::Boost)));
        harness.input.set(
            PlayerSlot(0),
            PilotIntent {
                eject: Some(EquipSlot::Active),
                ..Default::default()
            },
        );
        for _ in 0..70 {
            harness.with_ctx(1.0 / 60.0, |ctx| entity.update(id, 1.0 / 60.0, ctx));
        }
        assert!(!entity.as_ship().unwrap().has_equipped(EquipSlot::Active));
        assert_eq!(harness.spawned.len(), 1);
        assert!(matches!(harness.spawned[0].kind, EntityKind::Pickup(_)));
    }

    #[test]
    fn test_death_drops_inventory_and_hides() {
        let mut harness = Harness::new(5);
        let (mut entity, id) = player_entity();
        for _ in 0..3 {
            entity
                .body
                .store(Item::PowerUp(PowerUp::new(StatKind::Damage)))
                .unwrap();
        }
        entity.body.velocity = Vec2::new(3.0, 0.0);
        harness.with_ctx(0.016, |ctx| entity.take_damage(id, 10_000.0, 1.0, ctx));
        assert!(entity.body.is_dead());
        assert_eq!(entity.body.velocity, Vec2::ZERO);
        assert!(entity.body.inventory.is_empty());
        assert_eq!(harness.spawned.len(), 3);
        assert!(harness.renderer.hidden.contains(&id));
        assert_eq!(harness.events, vec![GameEvent::PlayerDied { victim: id }]);
    }

    #[test]
    fn test_respawn_restores_and_moves() {
        let mut harness = Harness::new(6);
        let (mut entity, id) = player_entity();
        harness.with_ctx(0.016, |ctx| entity.take_damage(id, 10_000.0, 1.0, ctx));
        let (ship, body) = split(&mut entity);
        ship.respawn(body, Vec2::new(5.0, -5.0));
        assert!(!body.is_dead());
        assert_eq!(body.hp, body.max_hp);
        assert_eq!(body.shield, body.max_shield);
        assert_eq!(body.pos, Vec2::new(5.0, -5.0));
    }

    #[test]
    fn test_dead_player_requests_respawn() {
        let mut harness = Harness::new(7);
        let (mut entity, id) = player_entity();
        harness.with_ctx(0.016, |ctx| entity.take_damage(id, 10_000.0, 1.0, ctx));
        harness.events.clear();
        harness.input.set(
            PlayerSlot(0),
            PilotIntent {
                respawn: true,
                ..Default::default()
            },
        );
        harness.with_ctx(0.016, |ctx| entity.update(id, 0.016, ctx));
        assert_eq!(harness.events, vec![GameEvent::RespawnRequested { ship: id }]);
    }

    #[test]
    fn test_locked_ship_ignores_stick() {
        let mut harness = Harness::new(8);
        let (mut entity, id) = player_entity();
        entity.as_ship_mut().unwrap().lock_movement();
        harness.input.set(
            PlayerSlot(0),
            PilotIntent {
                movement: Vec2::X,
                fire: true,
                ..Default::default()
            },
        );
        for _ in 0..30 {
            harness.with_ctx(1.0 / 60.0, |ctx| entity.update(id, 1.0 / 60.0, ctx));
        }
        assert_eq!(entity.body.pos, Vec2::ZERO);
        assert!(harness.spawned.is_empty());
    }

    #[test]
    fn test_thrust_caps_at_top_speed() {
        let mut harness = Harness::new(9);
        let (mut entity, id) = player_entity();
        harness.input.set(
            PlayerSlot(0),
            PilotIntent {
                movement: Vec2::X,
                ..Default::default()
            },
        );
        for _ in 0..60 {
            harness.with_ctx(1.0 / 60.0, |ctx| entity.update(id, 1.0 / 60.0, ctx));
        }
        let top = Stats::ship_base().top_speed;
        assert!(entity.body.velocity.length() <= top + 0.001);
        assert!(entity.body.velocity.x > top * 0.9);
    }

    #[test]
    fn test_shield_regen_waits_after_hit() {
        let mut harness = Harness::new(10);
        let (mut entity, id) = player_entity();
        harness.with_ctx(0.016, |ctx| entity.take_damage(id, 10.0, 1.0, ctx));
        let after_hit = entity.body.shield;
        for _ in 0..60 {
            harness.with_ctx(1.0 / 60.0, |ctx| entity.update(id, 1.0 / 60.0, ctx));
        }
        assert_eq!(entity.body.shield, after_hit);
        for _ in 0..120 {
            harness.with_ctx(1.0 / 60.0, |ctx| entity.update(id, 1.0 / 60.0, ctx));
        }
        assert!(entity.body.shield > after_hit);
    }

    #[test]
    fn test_contact_damage_is_rate_limited() {
        let mut harness = Harness::new(11);
        let mut arena = EntityArena::new();
        let a = arena.insert(Entity::ship(Vec2::ZERO, Ship::player(PlayerSlot(0))));
        let b = arena.insert(Entity::asteroid(
            Vec2::new(0.5, 0.0),
            crate::sim::props::Asteroid::with_scale(1.0),
        ));
        let start = arena.get(b).unwrap().body.hp;
        for _ in 0..3 {
            let (ship, rock) = arena.get_pair_mut(a, b).unwrap();
            harness.with_ctx(0.016, |ctx| ship.resolve_collision(b, rock, ctx));
        }
        let hp = arena.get(b).unwrap().body.hp;
        assert!((start - hp - Ship::CONTACT_DAMAGE).abs() < 0.0001);
    }
}
