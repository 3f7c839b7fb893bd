//! Items floating in the world, waiting for a player to fly through them

use super::entity::{Body, Entity, EntityKind};
use super::frame::FrameContext;
use super::items::Item;
use crate::audio::SoundCue;
use crate::frame_damping;
use crate::render::Effect;

/// Fresh drops can't be collected for this long
pub const PICKUP_GRACE_SECONDS: f32 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub item: Item,
}

impl Pickup {
    pub const RADIUS: f32 = 0.4;
    const SPIN: f32 = 2.0;
    const DAMPING_PER_FRAME: f32 = 0.95;

    pub fn new(item: Item) -> Self {
        Self { item }
    }

    pub fn update(&self, body: &mut Body, dt: f32) {
        body.rotation = crate::normalize_angle(body.rotation + Self::SPIN * dt);
        let impulse = body.take_impulse();
        body.velocity += impulse;
        body.velocity *= frame_damping(Self::DAMPING_PER_FRAME, dt);
        body.pos += body.velocity * dt;
    }

    /// Living player ships collect the item on contact
    pub fn resolve_collision(&self, body: &mut Body, other: &mut Entity, ctx: &mut FrameContext<'_, '_>) {
        if body.is_dead() || body.age < PICKUP_GRACE_SECONDS {
            return;
        }
        let Entity {
            body: other_body,
            kind,
        } = other;
        let EntityKind::Ship(ship) = kind else {
            return;
        };
        if !ship.is_player() || other_body.is_dead() {
            return;
        }
        if !ship.pick_up(other_body, self.item, ctx) {
            return;
        }
        body.mark_dead();
        ctx.effect(Effect::PickupSparkle, body.pos, None);
        ctx.play_sound_at(SoundCue::Pickup, body.pos, 1.0, 1.0);
    }
}
