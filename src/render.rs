//! Rendering collaborator contract
//!
//! Sprites, particles, and cameras belong to the renderer. The simulation
//! only creates/destroys proxies keyed by entity handle and pushes transforms.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::EntityId;

/// RGBA tint (linear, 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Tint {
    pub const WHITE: Tint = Tint::rgb(1.0, 1.0, 1.0);
    pub const RED: Tint = Tint::rgb(1.0, 0.2, 0.2);
    pub const BLUE: Tint = Tint::rgb(0.3, 0.5, 1.0);
    pub const GREEN: Tint = Tint::rgb(0.3, 1.0, 0.4);
    pub const YELLOW: Tint = Tint::rgb(1.0, 0.9, 0.2);
    pub const GRAY: Tint = Tint::rgb(0.5, 0.5, 0.5);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// What a visual proxy should look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    PlayerShip,
    Drone,
    Laser,
    PlasmaBall,
    Missile,
    Asteroid,
    Crate,
    Pickup,
    BlackHole,
    Wormhole,
}

/// Surface an entity shows when struck (drives impact particle color)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Metal,
    Rock,
    Wood,
    Shield,
}

/// One-shot particle effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    MuzzleFlash,
    Impact,
    Explosion,
    CrateDestroyed,
    PickupSparkle,
    WarpFlash,
    Deflect,
}

/// Named visual layers the simulation toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Background,
    Starfield,
    PlayerUi,
}

/// Fire-and-forget rendering commands
pub trait Renderer {
    fn create_proxy(&mut self, id: EntityId, kind: SpriteKind, tint: Tint);
    fn destroy_proxy(&mut self, id: EntityId);
    fn set_transform(&mut self, id: EntityId, pos: Vec2, rotation: f32, scale: f32);
    fn set_tint(&mut self, id: EntityId, tint: Tint);
    fn set_visible(&mut self, id: EntityId, visible: bool);
    fn spawn_effect(&mut self, effect: Effect, pos: Vec2, surface: Option<Surface>);
    fn set_camera_position(&mut self, viewport: usize, pos: Vec2);
    fn set_layer_enabled(&mut self, layer: Layer, enabled: bool);
    fn set_vortex(&mut self, slot: usize, pos: Vec2, radius: f32);
    fn clear_vortices(&mut self);
}

/// Renderer that ignores everything
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn create_proxy(&mut self, _id: EntityId, _kind: SpriteKind, _tint: Tint) {}
    fn destroy_proxy(&mut self, _id: EntityId) {}
    fn set_transform(&mut self, _id: EntityId, _pos: Vec2, _rotation: f32, _scale: f32) {}
    fn set_tint(&mut self, _id: EntityId, _tint: Tint) {}
    fn set_visible(&mut self, _id: EntityId, _visible: bool) {}
    fn spawn_effect(&mut self, _effect: Effect, _pos: Vec2, _surface: Option<Surface>) {}
    fn set_camera_position(&mut self, _viewport: usize, _pos: Vec2) {}
    fn set_layer_enabled(&mut self, _layer: Layer, _enabled: bool) {}
    fn set_vortex(&mut self, _slot: usize, _pos: Vec2, _radius: f32) {}
    fn clear_vortices(&mut self) {}
}

/// Renderer that keeps a tally of proxies, effects, and cameras
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub proxies: Vec<(EntityId, SpriteKind)>,
    pub hidden: Vec<EntityId>,
    pub effects: Vec<(Effect, Vec2, Option<Surface>)>,
    pub cameras: Vec<Vec2>,
    pub disabled_layers: Vec<Layer>,
    pub vortices: Vec<Option<(Vec2, f32)>>,
}

impl RecordingRenderer {
    pub fn effect_count(&self, effect: Effect) -> usize {
        self.effects.iter().filter(|(e, _, _)| *e == effect).count()
    }

    pub fn has_proxy(&self, id: EntityId) -> bool {
        self.proxies.iter().any(|(p, _)| *p == id)
    }
}

impl Renderer for RecordingRenderer {
    fn create_proxy(&mut self, id: EntityId, kind: SpriteKind, _tint: Tint) {
        self.proxies.push((id, kind));
    }

    fn destroy_proxy(&mut self, id: EntityId) {
        self.proxies.retain(|(p, _)| *p != id);
        self.hidden.retain(|h| *h != id);
    }

    fn set_transform(&mut self, _id: EntityId, _pos: Vec2, _rotation: f32, _scale: f32) {}

    fn set_tint(&mut self, _id: EntityId, _tint: Tint) {}

    fn set_visible(&mut self, id: EntityId, visible: bool) {
        self.hidden.retain(|h| *h != id);
        if !visible {
            self.hidden.push(id);
        }
    }

    fn spawn_effect(&mut self, effect: Effect, pos: Vec2, surface: Option<Surface>) {
        self.effects.push((effect, pos, surface));
    }

    fn set_camera_position(&mut self, viewport: usize, pos: Vec2) {
        if self.cameras.len() <= viewport {
            self.cameras.resize(viewport + 1, Vec2::ZERO);
        }
        self.cameras[viewport] = pos;
    }

    fn set_layer_enabled(&mut self, layer: Layer, enabled: bool) {
        self.disabled_layers.retain(|l| *l != layer);
        if !enabled {
            self.disabled_layers.push(layer);
        }
    }

    fn set_vortex(&mut self, slot: usize, pos: Vec2, radius: f32) {
        if self.vortices.len() <= slot {
            self.vortices.resize(slot + 1, None);
        }
        self.vortices[slot] = Some((pos, radius));
    }

    fn clear_vortices(&mut self) {
        self.vortices.clear();
    }
}
