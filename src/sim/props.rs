//! Destructible scenery: asteroids and item crates

use rand::Rng;

use super::collision;
use super::entity::{Body, Entity};
use super::frame::FrameContext;
use super::items::{Item, PowerUp};
use crate::audio::SoundCue;
use crate::frame_damping;
use crate::render::{Effect, Surface};

/// Rock that splits in two when destroyed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Asteroid {
    initial_scale: f32,
    /// Radians per second
    spin: f32,
}

impl Asteroid {
    /// Collision radius at scale 1.0
    pub const RADIUS: f32 = 1.0;
    pub const HP_PER_SCALE: f32 = 30.0;
    /// Only asteroids at least this big split on death
    pub const SPLIT_THRESHOLD: f32 = 0.3;
    /// Asteroids no bigger than this can be pushed around
    pub const MOBILE_SCALE: f32 = 0.5;
    /// Random scale variance added to each child
    pub const CHILD_SCALE_JITTER: f32 = 0.1;
    /// Outward velocity change given to each child
    pub const SPLIT_IMPULSE: f32 = 3.0;
    const DAMPING_PER_FRAME: f32 = 0.9;
    const BUMP_STIFFNESS: f32 = 20.0;

    pub fn with_scale(scale: f32) -> Self {
        Self {
            initial_scale: scale,
            spin: 0.0,
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            initial_scale: rng.random_range(0.5..1.5),
            spin: rng.random_range(-1.0..1.0),
        }
    }

    pub fn with_spin(mut self, spin: f32) -> Self {
        self.spin = spin;
        self
    }

    pub fn initial_scale(&self) -> f32 {
        self.initial_scale
    }

    /// Resize: radius, hull, and mobility all follow scale
    pub fn apply_scale(&self, body: &mut Body, scale: f32) {
        body.set_scale(scale);
        body.max_hp = Self::HP_PER_SCALE * scale;
        body.hp = body.max_hp;
        body.flags.immobile = scale > Self::MOBILE_SCALE;
    }

    pub fn update(&self, body: &mut Body, dt: f32) {
        body.rotation = crate::normalize_angle(body.rotation + self.spin * dt);
        if body.flags.immobile {
            body.take_impulse();
            return;
        }
        let impulse = body.take_impulse();
        body.velocity += impulse;
        body.velocity *= frame_damping(Self::DAMPING_PER_FRAME, dt);
        body.pos += body.velocity * dt;
    }

    pub fn resolve_collision(&self, body: &mut Body, other: &Entity, ctx: &mut FrameContext<'_, '_>) {
        if body.flags.immobile || !other.is_solid() {
            return;
        }
        let contact = collision::circle_circle(
            body.pos,
            body.collision_radius(),
            other.body.pos,
            other.body.collision_radius(),
        );
        body.apply_impulse(collision::separation_impulse(&contact, Self::BUMP_STIFFNESS, ctx.dt));
    }

    pub fn on_death(&self, body: &mut Body, ctx: &mut FrameContext<'_, '_>) {
        ctx.effect(Effect::CrateDestroyed, body.pos, Some(Surface::Rock));
        ctx.play_sound_at(SoundCue::CratePop, body.pos, 1.0, 1.0);
        if !ctx.is_playing {
            return;
        }

        let scale = body.scale();
        if scale >= Self::SPLIT_THRESHOLD {
            log::debug!("Asteroid of scale {scale:.2} split");
            for _ in 0..2 {
                let jitter = ctx
                    .rng
                    .random_range(-Self::CHILD_SCALE_JITTER..Self::CHILD_SCALE_JITTER);
                let child_scale = (scale * 0.5 + jitter).max(0.05);
                let spin = ctx.rng.random_range(-1.5..1.5);
                let mut child = Entity::asteroid(body.pos, Asteroid::with_scale(child_scale).with_spin(spin));
                let direction = ctx.random_direction();
                child.body.apply_impulse(direction * Self::SPLIT_IMPULSE);
                ctx.spawn(child);
            }

            if ctx.drop_items_on_death && ctx.coin_flip() {
                let power_up = PowerUp::random(&mut *ctx.rng);
                ctx.spawn_pickup(Item::PowerUp(power_up), body.pos, 0.0);
            }
        }
    }
}

/// Breakable box with loot inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemCrate {
    /// Fixed loot; random when `None`
    pub contents: Option<Item>,
}

impl ItemCrate {
    pub const RADIUS: f32 = 0.6;
    pub const HP: f32 = 20.0;

    pub fn new(contents: Option<Item>) -> Self {
        Self { contents }
    }

    pub fn on_death(&self, body: &mut Body, ctx: &mut FrameContext<'_, '_>) {
        ctx.effect(Effect::CrateDestroyed, body.pos, Some(Surface::Wood));
        ctx.play_sound_at(SoundCue::CratePop, body.pos, 1.0, 1.0);
        let item = match self.contents {
            Some(item) => item,
            None => Item::random(&mut *ctx.rng),
        };
        ctx.spawn_pickup(item, body.pos, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::EntityArena;
    use crate::sim::entity::EntityKind;
    use crate::sim::frame::testing::Harness;
    use glam::Vec2;

    fn kill(entity: &mut Entity, harness: &mut Harness) {
        let id = EntityArena::new().insert(entity.clone());
        harness.with_ctx(1.0 / 60.0, |ctx| entity.die(id, ctx));
    }

    #[test]
    fn test_split_spawns_two_half_scale_children() {
        let mut harness = Harness::new(11);
        let pos = Vec2::new(3.0, -2.0);
        let mut rock = Entity::asteroid(pos, Asteroid::with_scale(1.0));
        kill(&mut rock, &mut harness);

        assert_eq!(harness.spawned.len(), 2);
        for child in &harness.spawned {
            assert!(matches!(child.kind, EntityKind::Asteroid(_)));
            assert_eq!(child.body.pos, pos);
            assert!((child.body.scale() - 0.5).abs() <= Asteroid::CHILD_SCALE_JITTER + 0.0001);
            assert!(child.body.impulse().length() > 0.0);
        }
    }

    #[test]
    fn test_no_split_outside_play() {
        let mut harness = Harness::new(12);
        harness.is_playing = false;
        let mut rock = Entity::asteroid(Vec2::ZERO, Asteroid::with_scale(1.0));
        kill(&mut rock, &mut harness);
        assert!(harness.spawned.is_empty());
        assert_eq!(harness.renderer.effect_count(Effect::CrateDestroyed), 1);
    }

    #[test]
    fn test_tiny_asteroid_does_not_split() {
        let mut harness = Harness::new(13);
        let mut rock = Entity::asteroid(Vec2::ZERO, Asteroid::with_scale(0.2));
        kill(&mut rock, &mut harness);
        assert!(harness.spawned.is_empty());
    }

    #[test]
    fn test_tiny_asteroid_never_drops_loot() {
        for seed in 0..16 {
            let mut harness = Harness::new(seed);
            harness.drop_items_on_death = true;
            let mut rock = Entity::asteroid(Vec2::ZERO, Asteroid::with_scale(0.2));
            kill(&mut rock, &mut harness);
            assert!(harness.spawned.is_empty(), "seed {seed}");
        }
    }

    #[test]
    fn test_splitting_asteroid_may_drop_power_up() {
        let dropped = (0..16).any(|seed| {
            let mut harness = Harness::new(seed);
            harness.drop_items_on_death = true;
            let mut rock = Entity::asteroid(Vec2::ZERO, Asteroid::with_scale(1.0));
            kill(&mut rock, &mut harness);
            harness
                .spawned
                .iter()
                .any(|e| matches!(&e.kind, EntityKind::Pickup(p) if matches!(p.item, Item::PowerUp(_))))
        });
        assert!(dropped);
    }

    #[test]
    fn test_scale_drives_hp_and_mobility() {
        let big = Entity::asteroid(Vec2::ZERO, Asteroid::with_scale(1.0));
        let small = Entity::asteroid(Vec2::ZERO, Asteroid::with_scale(0.4));
        assert!((big.body.max_hp - Asteroid::HP_PER_SCALE).abs() < 0.0001);
        assert!((small.body.max_hp - 0.4 * Asteroid::HP_PER_SCALE).abs() < 0.0001);
        assert!(big.body.flags.immobile);
        assert!(!small.body.flags.immobile);
    }

    #[test]
    fn test_mobile_asteroid_slows_down() {
        let asteroid = Asteroid::with_scale(0.4);
        let mut rock = Entity::asteroid(Vec2::ZERO, asteroid);
        rock.body.apply_impulse(Vec2::X * 5.0);
        asteroid.update(&mut rock.body, 1.0 / 60.0);
        assert!((rock.body.velocity.x - 4.5).abs() < 0.001);
        asteroid.update(&mut rock.body, 1.0 / 60.0);
        assert!(rock.body.velocity.x < 4.5);
    }

    #[test]
    fn test_crate_drops_its_contents() {
        let mut harness = Harness::new(14);
        let loot = Item::PowerUp(PowerUp::new(crate::sim::StatKind::Damage));
        let mut crate_entity = Entity::item_crate(Vec2::ZERO, ItemCrate::new(Some(loot)));
        kill(&mut crate_entity, &mut harness);
        assert_eq!(harness.spawned.len(), 1);
        assert!(matches!(&harness.spawned[0].kind, EntityKind::Pickup(p) if p.item == loot));
    }
}
