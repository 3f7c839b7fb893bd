//! Per-frame context handed to entity behavior
//!
//! Entities never reach the mode or any collaborator through globals. During
//! a frame they get a [`FrameContext`]: the RNG, the collaborators, a queue
//! for newly spawned entities, and an event queue the mode drains after the
//! collision pass.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::arena::EntityId;
use super::entity::Entity;
use super::items::Item;
use crate::audio::{self, AudioSink, SoundCue};
use crate::input::InputSource;
use crate::render::{Effect, Renderer, Surface};
use crate::ui::Hud;

/// The external systems the simulation talks to
pub struct Collaborators<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub audio: &'a mut dyn AudioSink,
    pub input: &'a mut dyn InputSource,
    pub hud: &'a mut dyn Hud,
}

/// Things that happened mid-frame that the mode must account for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// A player ship died (from any cause)
    PlayerDied { victim: EntityId },
    /// A player's projectile killed another player
    PlayerKill { killer: EntityId, victim: EntityId },
    /// A reporting projectile landed a hit for its owner
    DamageDealt { owner: EntityId, amount: f32 },
    /// A dead player asked to come back
    RespawnRequested { ship: EntityId },
}

/// Snapshot of something projectiles may home in on
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub id: EntityId,
    pub pos: Vec2,
}

pub struct FrameContext<'f, 'c> {
    pub dt: f32,
    pub rng: &'f mut Pcg32,
    pub collab: &'f mut Collaborators<'c>,
    /// Match is running (props only split while it is)
    pub is_playing: bool,
    /// Destroyed things may drop loot
    pub drop_items_on_death: bool,
    /// Dead players may ask to respawn
    pub respawn_allowed: bool,
    pub arena_half_extents: Vec2,
    /// Player positions, for sound attenuation
    pub listeners: &'f [Vec2],
    /// Homing candidates as of the start of the frame
    pub targets: &'f [TargetInfo],
    pub(crate) spawned: &'f mut Vec<Entity>,
    pub(crate) events: &'f mut Vec<GameEvent>,
}

impl FrameContext<'_, '_> {
    /// Queue an entity; it joins the active list at the end of the frame
    pub fn spawn(&mut self, entity: Entity) {
        self.spawned.push(entity);
    }

    /// Drop an item into the world with a little scatter
    pub fn spawn_pickup(&mut self, item: Item, pos: Vec2, scatter: f32) {
        let offset = if scatter > 0.0 {
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            crate::direction_from_angle(angle) * self.rng.random_range(0.0..scatter)
        } else {
            Vec2::ZERO
        };
        self.spawn(Entity::pickup(pos + offset, item));
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn effect(&mut self, effect: Effect, pos: Vec2, surface: Option<Surface>) {
        self.collab.renderer.spawn_effect(effect, pos, surface);
    }

    /// Play a sound attenuated by distance to the nearest player
    pub fn play_sound_at(&mut self, cue: SoundCue, pos: Vec2, max_volume: f32, pitch: f32) {
        let volume = audio::attenuation(self.listeners, pos).min(max_volume);
        self.collab.audio.play(cue, volume, pitch);
    }

    pub fn coin_flip(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    pub fn random_direction(&mut self) -> Vec2 {
        crate::direction_from_angle(self.rng.random_range(0.0..std::f32::consts::TAU))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Owned backing storage for building a `FrameContext` in unit tests

    use super::*;
    use crate::audio::RecordingAudio;
    use crate::input::ScriptedInput;
    use crate::render::RecordingRenderer;
    use crate::ui::RecordingHud;
    use rand::SeedableRng;

    pub struct Harness {
        pub rng: Pcg32,
        pub renderer: RecordingRenderer,
        pub audio: RecordingAudio,
        pub input: ScriptedInput,
        pub hud: RecordingHud,
        pub spawned: Vec<Entity>,
        pub events: Vec<GameEvent>,
        pub listeners: Vec<Vec2>,
        pub targets: Vec<TargetInfo>,
        pub is_playing: bool,
        pub drop_items_on_death: bool,
    }

    impl Harness {
        pub fn new(seed: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed),
                renderer: RecordingRenderer::default(),
                audio: RecordingAudio::default(),
                input: ScriptedInput::default(),
                hud: RecordingHud::default(),
                spawned: Vec::new(),
                events: Vec::new(),
                listeners: vec![Vec2::ZERO],
                targets: Vec::new(),
                is_playing: true,
                drop_items_on_death: false,
            }
        }

        /// Run `f` with a context borrowing this harness
        pub fn with_ctx<R>(&mut self, dt: f32, f: impl FnOnce(&mut FrameContext<'_, '_>) -> R) -> R {
            let mut collab = Collaborators {
                renderer: &mut self.renderer,
                audio: &mut self.audio,
                input: &mut self.input,
                hud: &mut self.hud,
            };
            let mut ctx = FrameContext {
                dt,
                rng: &mut self.rng,
                collab: &mut collab,
                is_playing: self.is_playing,
                drop_items_on_death: self.drop_items_on_death,
                respawn_allowed: true,
                arena_half_extents: Vec2::splat(20.0),
                listeners: &self.listeners,
                targets: &self.targets,
                spawned: &mut self.spawned,
                events: &mut self.events,
            };
            f(&mut ctx)
        }
    }
}
