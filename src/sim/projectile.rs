//! Projectiles
//!
//! One struct for every bullet type; the flight path is picked by [`Motion`].
//! A projectile lives until its lifespan runs out or it lands a single hit.

use glam::Vec2;
use rand::Rng;

use super::arena::EntityId;
use super::collision;
use super::entity::{Body, Entity, EntityKind};
use super::frame::{FrameContext, GameEvent, TargetInfo};
use super::stats::Stats;
use crate::audio::SoundCue;
use crate::render::{Effect, SpriteKind};
use crate::{angle_of, direction_from_angle, normalize_angle};

/// Wave oscillation rate (degrees/s)
const WAVE_DEGREES_PER_SECOND: f32 = 540.0;
/// Peak sideways offset of a fresh wave shot; shrinks as 1 / (age + 1)
const WAVE_AMPLITUDE: f32 = 1.0;
/// Homing only considers targets this close
const HOMING_RANGE: f32 = 12.0;
const HIT_VOLUME: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileKind {
    Laser,
    PlasmaBall,
    Missile,
}

impl ProjectileKind {
    pub fn radius(self) -> f32 {
        match self {
            ProjectileKind::Laser => 0.15,
            ProjectileKind::PlasmaBall => 0.25,
            ProjectileKind::Missile => 0.2,
        }
    }

    pub fn speed(self) -> f32 {
        match self {
            ProjectileKind::Laser => 14.0,
            ProjectileKind::PlasmaBall => 10.0,
            ProjectileKind::Missile => 8.0,
        }
    }

    pub fn lifespan(self) -> f32 {
        match self {
            ProjectileKind::Laser => 1.0,
            ProjectileKind::PlasmaBall => 0.75,
            ProjectileKind::Missile => 2.0,
        }
    }

    /// Velocity change given to whatever gets hit
    pub fn knockback(self) -> f32 {
        match self {
            ProjectileKind::Laser => 1.0,
            ProjectileKind::PlasmaBall => 0.8,
            ProjectileKind::Missile => 1.5,
        }
    }

    pub fn sprite(self) -> SpriteKind {
        match self {
            ProjectileKind::Laser => SpriteKind::Laser,
            ProjectileKind::PlasmaBall => SpriteKind::PlasmaBall,
            ProjectileKind::Missile => SpriteKind::Missile,
        }
    }
}

/// Flight law
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Constant velocity plus knockback
    Straight,
    /// Sinusoidal weave around an invisible straight-line carrier
    Wave {
        /// +1 weaves left first, -1 right
        side: f32,
        /// Radians
        phase: f32,
        carrier_pos: Vec2,
        carrier_vel: Vec2,
    },
    /// Straight, but always steering toward the nearest target
    Homing,
}

impl Motion {
    pub fn wave(side: f32, pos: Vec2, velocity: Vec2) -> Self {
        Motion::Wave {
            side,
            phase: 0.0,
            carrier_pos: pos,
            carrier_vel: velocity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub motion: Motion,
    pub damage: f32,
    pub disruption: f32,
    /// Turn rate toward targets (radians/s)
    pub homing: f32,
    pub knockback: f32,
    pub lifespan: f32,
    /// Credit landed damage to the owner's running total
    pub report_damage: bool,
    /// The owner was a player when this was fired
    pub owner_is_player: bool,
    /// Already glanced off something once
    deflected: bool,
}

impl Projectile {
    /// Missiles get this much homing on top of the shooter's stat
    const MISSILE_HOMING: f32 = 2.0;

    pub fn new(kind: ProjectileKind, motion: Motion, stats: &Stats, owner_is_player: bool) -> Self {
        let bonus = if motion == Motion::Homing {
            Self::MISSILE_HOMING
        } else {
            0.0
        };
        Self {
            kind,
            motion,
            damage: stats.damage.max(0.0),
            disruption: stats.shield_disruption,
            homing: (stats.shot_homing + bonus).max(0.0),
            knockback: kind.knockback(),
            lifespan: kind.lifespan(),
            report_damage: owner_is_player,
            owner_is_player,
            deflected: false,
        }
    }

    pub fn update(&mut self, body: &mut Body, dt: f32, ctx: &mut FrameContext<'_, '_>) {
        if body.is_dead() {
            return;
        }
        if body.age >= self.lifespan {
            body.mark_dead();
            return;
        }

        match &mut self.motion {
            Motion::Wave {
                side,
                phase,
                carrier_pos,
                carrier_vel,
            } => {
                body.take_impulse();
                *carrier_pos += *carrier_vel * dt;
                *phase += WAVE_DEGREES_PER_SECOND.to_radians() * dt;
                let lateral = carrier_vel.perp().normalize_or_zero();
                let amplitude = WAVE_AMPLITUDE / (body.age + 1.0);
                let next = *carrier_pos + lateral * phase.sin() * amplitude * *side;
                if dt > 0.0 {
                    body.velocity = (next - body.pos) / dt;
                }
                body.pos = next;
            }
            Motion::Straight | Motion::Homing => {
                if self.homing > 0.0 {
                    steer_toward_nearest(body, self.homing, ctx.targets, dt);
                }
                body.integrate(dt);
            }
        }
        if body.velocity.length_squared() > 0.0 {
            body.rotation = angle_of(body.velocity);
        }
    }

    /// Hit `other` once: knockback, damage, impact, attribution
    pub fn resolve_collision(
        &mut self,
        body: &mut Body,
        other_id: EntityId,
        other: &mut Entity,
        ctx: &mut FrameContext<'_, '_>,
    ) {
        if body.is_dead() || other.body.is_dead() {
            return;
        }
        if body.owner == Some(other_id) || !other.body.flags.collides_with_bullets {
            return;
        }

        if let EntityKind::Ship(ship) = &other.kind {
            let normal = (body.pos - other.body.pos).normalize_or(Vec2::X);
            if ship.is_reflecting() {
                body.velocity = collision::reflect_velocity(body.velocity, normal);
                body.owner = Some(other_id);
                self.owner_is_player = ship.is_player();
                self.report_damage = self.owner_is_player;
                ctx.effect(Effect::Deflect, body.pos, None);
                return;
            }
            let chance = ship.deflection_chance(&other.body);
            if !self.deflected && chance > 0.0 && ctx.rng.random_bool(chance as f64) {
                self.deflected = true;
                body.velocity = collision::reflect_velocity(body.velocity, normal);
                body.pos = other.body.pos
                    + normal * (other.body.collision_radius() + body.collision_radius() + 0.01);
                ctx.effect(Effect::Deflect, body.pos, None);
                return;
            }
        }

        let push = (other.body.pos - body.pos).normalize_or_zero() * self.knockback;
        other.body.apply_impulse(push);
        let result = other.take_damage(other_id, self.damage, self.disruption, ctx);
        body.mark_dead();

        ctx.effect(Effect::Impact, body.pos, Some(other.body.surface));
        ctx.play_sound_at(SoundCue::Hit, body.pos, HIT_VOLUME, 1.0);

        let Some(owner) = body.owner else {
            return;
        };
        if self.report_damage && result.dealt > 0.0 {
            ctx.emit(GameEvent::DamageDealt {
                owner,
                amount: result.dealt,
            });
        }
        if result.killed && self.owner_is_player && other.is_player() {
            ctx.emit(GameEvent::PlayerKill {
                killer: owner,
                victim: other_id,
            });
        }
    }
}

/// Rotate velocity toward the closest target that is not the owner
fn steer_toward_nearest(body: &mut Body, turn_rate: f32, targets: &[TargetInfo], dt: f32) {
    let speed = body.velocity.length();
    if speed <= 0.0 {
        return;
    }
    let owner = body.owner;
    let pos = body.pos;
    let nearest = targets
        .iter()
        .filter(|t| Some(t.id) != owner)
        .map(|t| (t, t.pos.distance_squared(pos)))
        .filter(|(_, d)| *d < HOMING_RANGE * HOMING_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    let Some((target, _)) = nearest else {
        return;
    };
    let heading = angle_of(body.velocity);
    let delta = normalize_angle(angle_of(target.pos - pos) - heading);
    let max_turn = turn_rate * dt;
    body.velocity = direction_from_angle(heading + delta.clamp(-max_turn, max_turn)) * speed;
}
