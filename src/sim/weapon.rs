//! Weapon firing patterns
//!
//! All weapons share one contract: gate on the shooter's effective rate of
//! fire, spawn the pattern's projectiles, then give feedback. Only the
//! pattern differs per [`WeaponKind`].

use glam::Vec2;
use rand::Rng;

use super::arena::EntityId;
use super::entity::Entity;
use super::frame::FrameContext;
use super::items::{Weapon, WeaponKind};
use super::projectile::{Motion, Projectile, ProjectileKind};
use super::ship::Ship;
use super::stats::Stats;
use crate::audio::SoundCue;
use crate::consts::BULLET_VOLUME;
use crate::input::PlayerSlot;
use crate::render::Effect;

/// Full fan width of the spread shot (degrees)
const SPREAD_DEGREES: f32 = 75.0;
const SPREAD_COUNT: usize = 4;
/// Camera kick per shot
const RECOIL: f32 = 0.05;
const RUMBLE_STRENGTH: f32 = 0.1;
const RUMBLE_SECONDS: f32 = 0.075;

/// Snapshot of whoever is pulling the trigger
#[derive(Debug, Clone, Copy)]
pub struct Shooter {
    pub id: EntityId,
    pub pos: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub radius: f32,
    /// Effective stats (all layers summed)
    pub stats: Stats,
    pub player: Option<PlayerSlot>,
}

impl Shooter {
    fn forward(&self) -> Vec2 {
        crate::direction_from_angle(self.rotation)
    }

    fn muzzle(&self) -> Vec2 {
        self.pos + self.forward() * (self.radius + 0.1)
    }
}

/// Seconds that must pass between shots at this rate of fire
pub fn fire_interval(stats: &Stats) -> f32 {
    1.0 / stats.rate_of_fire.max(Ship::MIN_RATE_OF_FIRE)
}

/// One projectile of a pattern: angle offset from the shooter's facing
struct Shot {
    kind: ProjectileKind,
    angle_offset: f32,
    wave_side: Option<f32>,
}

impl Weapon {
    fn pattern(&self) -> Vec<Shot> {
        match self.kind {
            WeaponKind::Blaster => vec![Shot {
                kind: ProjectileKind::Laser,
                angle_offset: 0.0,
                wave_side: None,
            }],
            WeaponKind::SpreadShot => {
                let spread = SPREAD_DEGREES.to_radians();
                let step = spread / (SPREAD_COUNT - 1) as f32;
                (0..SPREAD_COUNT)
                    .map(|i| Shot {
                        kind: ProjectileKind::Laser,
                        angle_offset: -spread / 2.0 + step * i as f32,
                        wave_side: None,
                    })
                    .collect()
            }
            WeaponKind::WaveGun => [None, Some(1.0), Some(-1.0)]
                .into_iter()
                .map(|wave_side| Shot {
                    kind: ProjectileKind::PlasmaBall,
                    angle_offset: 0.0,
                    wave_side,
                })
                .collect(),
            WeaponKind::HomingLauncher => vec![Shot {
                kind: ProjectileKind::Missile,
                angle_offset: 0.0,
                wave_side: None,
            }],
        }
    }

    fn sound(&self, rng: &mut impl Rng) -> SoundCue {
        match self.kind {
            WeaponKind::Blaster => SoundCue::BlasterFire,
            WeaponKind::SpreadShot => SoundCue::SpreadFire,
            WeaponKind::WaveGun => SoundCue::WaveFire(rng.random_range(0..2)),
            WeaponKind::HomingLauncher => SoundCue::MissileFire,
        }
    }

    /// Fire if the cooldown has elapsed; returns whether anything was fired
    pub fn attempt_fire(
        &self,
        shooter: &Shooter,
        seconds_since_last_fired: &mut f32,
        ctx: &mut FrameContext<'_, '_>,
    ) -> bool {
        if *seconds_since_last_fired <= fire_interval(&shooter.stats) {
            return false;
        }
        *seconds_since_last_fired = 0.0;

        let muzzle = shooter.muzzle();
        for shot in self.pattern() {
            let dir = crate::direction_from_angle(shooter.rotation + shot.angle_offset);
            // Shots inherit forward motion but never lose speed to a retreating ship
            let speed = shot.kind.speed() + dir.dot(shooter.velocity).max(0.0);
            let velocity = dir * speed;
            let motion = match shot.wave_side {
                Some(side) => Motion::wave(side, muzzle, velocity),
                None if shot.kind == ProjectileKind::Missile => Motion::Homing,
                None => Motion::Straight,
            };
            let projectile = Projectile::new(shot.kind, motion, &shooter.stats, shooter.player.is_some());
            ctx.spawn(Entity::projectile(muzzle, velocity, Some(shooter.id), projectile));
        }

        if let Some(slot) = shooter.player {
            ctx.collab.input.rumble(slot, RUMBLE_STRENGTH, RUMBLE_SECONDS);
            ctx.collab.input.recoil(slot, -shooter.forward() * RECOIL);
        }
        ctx.effect(Effect::MuzzleFlash, muzzle, None);
        let cue = self.sound(&mut *ctx.rng);
        let pitch = ctx.rng.random_range(0.9..1.1);
        ctx.play_sound_at(cue, shooter.pos, BULLET_VOLUME, pitch);
        true
    }
}
