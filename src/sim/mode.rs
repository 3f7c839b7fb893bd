//! Game mode: owns the entities of one match and drives its frame loop
//!
//! Each frame runs in a fixed order:
//! 1. Advance the match timer (overtime slows the world down)
//! 2. Update every active entity and resolve its collisions
//! 3. Apply mid-frame events (deaths, kills, respawns)
//! 4. Merge newly spawned entities into the active list
//! 5. Sweep dead entities, except player ships
//! 6. Mode rules, cameras, and renderer sync
//!
//! Nothing mutates the active list while it is being iterated; entities
//! spawned mid-frame wait in `pending` and dead ones wait for the sweep.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::arena::{EntityArena, EntityId};
use super::encounter::{self, Encounter, EncounterKind};
use super::entity::{Entity, Parent};
use super::frame::{Collaborators, FrameContext, GameEvent, TargetInfo};
use super::items::Item;
use super::props::{Asteroid, ItemCrate};
use super::rules::{DEATH_BATTLE_BLACK_HOLE_RADIUS, ModeRules};
use super::scoring::{PlayerStats, competition_ranks};
use super::ship::Ship;
use super::vortex::{BlackHole, VortexRegistry};
use crate::audio::{self, SoundCue};
use crate::consts::{
    AFTER_GAME_SLOWDOWN_SECONDS, AIM_DEADZONE, CAMERA_LERP, COUNTDOWN_SECONDS, MIN_SLOWDOWN_FACTOR,
    MUSIC_VOLUME,
};
use crate::error::{SimError, SimResult};
use crate::input::PlayerSlot;
use crate::render::Layer;
use crate::tuning::MatchTuning;
use crate::ui::{Hud, Widget};

/// Player spawn corners sit this far in from the walls
const SPAWN_INSET: f32 = 3.0;
/// Props are cleared from around each spawn point
const SPAWN_CLEARANCE: f32 = 2.0;
const COUNTDOWN_TEXT_SIZE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Set up but the clock hasn't started
    NotPlaying,
    Playing,
    /// Clock hit zero; the world winds down
    TimeExpired,
    Stopped,
}

/// Match clock text: `m:ss` with a minute or more left, `:ss` otherwise
pub fn format_clock(seconds_remaining: f32) -> String {
    let total = seconds_remaining.max(0.0).ceil() as u32;
    let (minutes, seconds) = (total / 60, total % 60);
    if minutes > 0 {
        format!("{minutes}:{seconds:02}")
    } else {
        format!(":{seconds:02}")
    }
}

/// World speed multiplier after the clock runs out
pub fn slowdown_factor(overtime_seconds: f32) -> f32 {
    let t = 1.0 - overtime_seconds / AFTER_GAME_SLOWDOWN_SECONDS;
    crate::smooth_start2(t.max(0.0)).clamp(MIN_SLOWDOWN_FACTOR, 1.0)
}

pub struct GameMode {
    rules: ModeRules,
    tuning: MatchTuning,
    rng: Pcg32,
    arena: EntityArena,
    /// Spawn order; iteration order every frame
    active: Vec<EntityId>,
    pending: Vec<Entity>,
    events: Vec<GameEvent>,
    encounters: Vec<Encounter>,
    players: Vec<EntityId>,
    stats: Vec<(EntityId, PlayerStats)>,
    spawn_points: Vec<Vec2>,
    phase: MatchPhase,
    elapsed: f32,
    last_countdown: Option<u8>,
    cameras: Vec<Vec2>,
    vortices: VortexRegistry,
    spawn_timer: f32,
}

impl GameMode {
    pub fn new(rules: ModeRules, tuning: MatchTuning) -> SimResult<Self> {
        tuning.validate()?;
        Ok(Self {
            rules,
            rng: Pcg32::seed_from_u64(tuning.seed),
            tuning,
            arena: EntityArena::new(),
            active: Vec::new(),
            pending: Vec::new(),
            events: Vec::new(),
            encounters: Vec::new(),
            players: Vec::new(),
            stats: Vec::new(),
            spawn_points: Vec::new(),
            phase: MatchPhase::NotPlaying,
            elapsed: 0.0,
            last_countdown: None,
            cameras: Vec::new(),
            vortices: VortexRegistry::new(),
            spawn_timer: 0.0,
        })
    }

    pub fn with_default_tuning(rules: ModeRules) -> SimResult<Self> {
        Self::new(rules, rules.default_tuning())
    }

    // === Accessors ===

    pub fn rules(&self) -> ModeRules {
        self.rules
    }

    pub fn tuning(&self) -> &MatchTuning {
        &self.tuning
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Clock is running (including the overtime wind-down)
    pub fn is_playing(&self) -> bool {
        matches!(self.phase, MatchPhase::Playing | MatchPhase::TimeExpired)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.arena.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.arena.get_mut(id)
    }

    pub fn active_ids(&self) -> &[EntityId] {
        &self.active
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn players(&self) -> &[EntityId] {
        &self.players
    }

    pub fn encounters(&self) -> &[Encounter] {
        &self.encounters
    }

    pub fn vortices(&self) -> &VortexRegistry {
        &self.vortices
    }

    pub fn player_stats(&self, id: EntityId) -> Option<&PlayerStats> {
        self.stats.iter().find(|(p, _)| *p == id).map(|(_, s)| s)
    }

    fn player_stats_mut(&mut self, id: EntityId) -> Option<&mut PlayerStats> {
        self.stats.iter_mut().find(|(p, _)| *p == id).map(|(_, s)| s)
    }

    pub fn camera_position(&self, player_index: usize) -> Option<Vec2> {
        self.cameras.get(player_index).copied()
    }

    // === Lifecycle ===

    /// Take the player ships and build the arena around them
    pub fn initialize(&mut self, players: Vec<Entity>, collab: &mut Collaborators<'_>) -> SimResult<()> {
        log::info!(
            "Initializing {} with {} players",
            self.rules.name(),
            players.len()
        );
        let half = self.tuning.arena_half_extents;
        let corner = (half - Vec2::splat(SPAWN_INSET)).max(Vec2::ZERO);
        self.spawn_points = vec![
            Vec2::new(-corner.x, corner.y),
            Vec2::new(corner.x, corner.y),
            Vec2::new(-corner.x, -corner.y),
            Vec2::new(corner.x, -corner.y),
        ];

        for (i, mut player) in players.into_iter().enumerate() {
            let spawn = self.player_spawn_point(i)?;
            if let Some((ship, body)) = player.split_ship_mut() {
                ship.respawn(body, spawn);
            }
            let id = self.insert_entity(player, collab);
            self.players.push(id);
            self.stats.push((id, PlayerStats::default()));
            self.cameras.push(spawn);
        }

        self.populate_arena();
        self.merge_pending(collab);
        for point in self.spawn_points.clone() {
            self.remove_entities_in_circle(point, SPAWN_CLEARANCE, collab);
        }

        if self.rules == ModeRules::DeathBattle {
            let radius = DEATH_BATTLE_BLACK_HOLE_RADIUS;
            self.remove_entities_in_circle(Vec2::ZERO, radius, collab);
            let hole = Entity::black_hole(Vec2::ZERO, radius, BlackHole::new(true));
            self.insert_entity(hole, collab);
            self.encounters
                .push(Encounter::new(EncounterKind::BlackHole, Vec2::ZERO, radius));
        }

        self.spawn_encounters(collab)?;
        self.push_transforms(collab);
        Ok(())
    }

    /// Props every match of these rules starts with
    fn populate_arena(&mut self) {
        for _ in 0..self.tuning.starting_asteroids {
            let pos = self.random_location_in_arena(1.0);
            let asteroid = Asteroid::random(&mut self.rng);
            self.spawn_entity(Entity::asteroid(pos, asteroid));
        }
        if self.rules == ModeRules::Assembly {
            for pos in [Vec2::splat(2.0), Vec2::splat(1.0)] {
                self.spawn_entity(Entity::item_crate(pos, ItemCrate::new(None)));
            }
            for pos in [Vec2::splat(-2.0), Vec2::splat(-1.0)] {
                let drone = Ship::drone(&mut self.rng);
                self.spawn_entity(Entity::ship(pos, drone));
            }
        }
    }

    /// Start the clock
    pub fn start_playing(&mut self, collab: &mut Collaborators<'_>) {
        if self.phase != MatchPhase::NotPlaying {
            log::warn!("start_playing called in phase {:?}", self.phase);
            return;
        }
        log::info!("{} started", self.rules.name());
        self.phase = MatchPhase::Playing;
        collab.audio.play_looped(SoundCue::Music, MUSIC_VOLUME);
        collab.audio.set_frequency_multiplier(SoundCue::Music, 1.0);
        collab
            .renderer
            .set_layer_enabled(Layer::Background, self.rules.shows_background());
        collab.hud.set_text(Widget::Timer, &format_clock(self.time_remaining()));
        collab.hud.set_visible(Widget::Timer, true);
        collab.hud.set_visible(Widget::Countdown, false);
        for slot in self.player_slots() {
            collab.hud.set_visible(Widget::Score(slot), true);
        }
        self.update_score_widgets(collab.hud);
    }

    /// Stop the clock and hide the timer widgets; safe to call repeatedly
    pub fn stop_playing(&mut self, hud: &mut dyn Hud) {
        if self.phase != MatchPhase::Stopped {
            log::info!("{} stopped after {:.1}s", self.rules.name(), self.elapsed);
        }
        self.phase = MatchPhase::Stopped;
        hud.set_visible(Widget::Countdown, false);
        hud.set_visible(Widget::Timer, false);
    }

    /// Tear down the match and hand the player ships back
    pub fn cleanup(&mut self, collab: &mut Collaborators<'_>) -> Vec<Entity> {
        self.stop_playing(&mut *collab.hud);
        collab.audio.stop(SoundCue::Music);
        collab.renderer.clear_vortices();
        self.vortices.clear();
        for slot in self.player_slots() {
            collab.hud.set_visible(Widget::Score(slot), false);
        }

        for id in std::mem::take(&mut self.active) {
            collab.renderer.destroy_proxy(id);
            if !self.players.contains(&id) {
                self.arena.remove(id);
            }
        }
        self.pending.clear();
        self.events.clear();
        self.encounters.clear();
        self.stats.clear();
        self.cameras.clear();

        let players: Vec<Entity> = std::mem::take(&mut self.players)
            .into_iter()
            .filter_map(|id| self.arena.remove(id))
            .collect();
        log::info!("{} cleaned up; returning {} players", self.rules.name(), players.len());
        players
    }

    // === Frame ===

    pub fn update(&mut self, dt: f32, collab: &mut Collaborators<'_>) -> SimResult<()> {
        if !self.is_playing() {
            return Ok(());
        }
        let dt = self.advance_timer(dt, collab);
        if !self.is_playing() {
            return Ok(());
        }

        self.run_periodic_spawns(dt);
        self.simulate(dt, collab);
        self.process_events(collab)?;
        self.follow_parents();
        self.merge_pending(collab);
        self.sweep_dead(collab);

        if self.rules.ends_on_last_survivor() && self.players.len() >= 2 {
            let alive = self
                .players
                .iter()
                .filter(|id| self.arena.get(**id).is_some_and(|e| !e.body.is_dead()))
                .count();
            if alive <= 1 {
                log::info!("{} over: {alive} player(s) left", self.rules.name());
                self.stop_playing(&mut *collab.hud);
            }
        }
        self.update_score_widgets(collab.hud);
        self.update_cameras(collab);
        self.push_transforms(collab);
        Ok(())
    }

    /// Tick the clock and its widgets; returns the (possibly slowed) dt
    fn advance_timer(&mut self, dt: f32, collab: &mut Collaborators<'_>) -> f32 {
        self.elapsed += dt;
        let remaining = self.tuning.game_length_seconds - self.elapsed;

        if remaining > 0.0 {
            collab.hud.set_text(Widget::Timer, &format_clock(remaining));
            if remaining <= COUNTDOWN_SECONDS {
                let number = ((remaining + 1.0).floor() as u8).clamp(1, COUNTDOWN_SECONDS as u8);
                collab.hud.set_visible(Widget::Countdown, true);
                collab.hud.set_text(Widget::Countdown, &number.to_string());
                collab.hud.set_text_size(
                    Widget::Countdown,
                    COUNTDOWN_TEXT_SIZE + 3.0 / (f32::from(number) + 1.0),
                );
                if self.last_countdown != Some(number) {
                    self.last_countdown = Some(number);
                    collab.audio.play(SoundCue::Countdown(number), 1.0, 1.0);
                }
            }
            return dt;
        }

        if self.phase == MatchPhase::Playing {
            log::info!("{} time expired", self.rules.name());
            self.phase = MatchPhase::TimeExpired;
            collab.audio.play(SoundCue::TimeUp, 1.0, 1.0);
            collab.hud.set_text(Widget::Timer, ":00");
            collab.hud.set_visible(Widget::Countdown, true);
            collab.hud.set_text(Widget::Countdown, "TIME!");
            collab.hud.set_text_size(Widget::Countdown, COUNTDOWN_TEXT_SIZE);
        }

        let overtime = -remaining;
        let factor = slowdown_factor(overtime);
        collab.audio.set_frequency_multiplier(SoundCue::Music, factor);
        if overtime >= AFTER_GAME_SLOWDOWN_SECONDS {
            self.stop_playing(&mut *collab.hud);
        }
        dt * factor
    }

    /// Assembly keeps dropping crates and drones into the arena
    fn run_periodic_spawns(&mut self, dt: f32) {
        let interval = self.tuning.spawn_interval_seconds;
        if self.rules != ModeRules::Assembly || interval <= 0.0 {
            return;
        }
        self.spawn_timer += dt;
        if self.spawn_timer <= interval {
            return;
        }
        self.spawn_timer = 0.0;
        let crate_pos = self.random_location_in_arena(1.0);
        self.spawn_entity(Entity::item_crate(crate_pos, ItemCrate::new(None)));
        let drone_pos = self.random_location_in_arena(1.0);
        let drone = Ship::drone(&mut self.rng);
        self.spawn_entity(Entity::ship(drone_pos, drone));
    }

    /// Update everything, then test each entity against every other
    fn simulate(&mut self, dt: f32, collab: &mut Collaborators<'_>) {
        let listeners = self.listener_positions();
        let targets: Vec<TargetInfo> = self
            .active
            .iter()
            .filter_map(|&id| {
                let e = self.arena.get(id)?;
                let homeable = e.is_solid() && e.body.flags.collides_with_bullets && !e.body.is_dead();
                homeable.then_some(TargetInfo { id, pos: e.body.pos })
            })
            .collect();
        let ids = self.active.clone();

        let mut ctx = FrameContext {
            dt,
            rng: &mut self.rng,
            collab,
            is_playing: true,
            drop_items_on_death: self.tuning.drop_items_on_death,
            respawn_allowed: self.tuning.respawn_allowed,
            arena_half_extents: self.tuning.arena_half_extents,
            listeners: &listeners,
            targets: &targets,
            spawned: &mut self.pending,
            events: &mut self.events,
        };

        for &id in &ids {
            let Some(entity) = self.arena.get_mut(id) else {
                continue;
            };
            if entity.body.is_dead() && !entity.is_player() {
                continue;
            }
            entity.update(id, dt, &mut ctx);

            for &other_id in &ids {
                if other_id == id {
                    continue;
                }
                let Some((entity, other)) = self.arena.get_pair_mut(id, other_id) else {
                    continue;
                };
                if entity.body.is_dead() {
                    break;
                }
                if other.body.is_dead() || entity.body.flags.no_collide || other.body.flags.no_collide {
                    continue;
                }
                if entity.is_colliding_with(other) {
                    entity.resolve_collision(other_id, other, &mut ctx);
                }
            }
        }
    }

    fn process_events(&mut self, collab: &mut Collaborators<'_>) -> SimResult<()> {
        for event in std::mem::take(&mut self.events) {
            match event {
                GameEvent::PlayerDied { victim } => self.record_player_death(victim),
                GameEvent::PlayerKill { killer, victim } => self.record_player_kill(killer, victim)?,
                GameEvent::DamageDealt { owner, amount } => {
                    if let Some(ship) = self.arena.get_mut(owner).and_then(Entity::as_ship_mut) {
                        ship.total_damage_done += amount;
                    }
                }
                GameEvent::RespawnRequested { ship } => self.respawn_player(ship, collab)?,
            }
        }
        Ok(())
    }

    fn record_player_death(&mut self, victim: EntityId) {
        let elapsed = self.elapsed;
        let tracks_time = self.rules.tracks_time_alive();
        let Some(stats) = self.player_stats_mut(victim) else {
            log::warn!("No stats record for dead player {victim:?}");
            return;
        };
        stats.deaths += 1;
        if tracks_time {
            stats.time_alive = Some(elapsed);
        }
        log::debug!("Player {victim:?} died ({} deaths)", stats.deaths);
    }

    /// Credit a kill; both sides must be tracked players
    pub fn record_player_kill(&mut self, killer: EntityId, victim: EntityId) -> SimResult<()> {
        if self.player_stats(victim).is_none() {
            log::error!("Kill credited against non-player {victim:?}");
            return Err(SimError::KillAttribution { killer, victim });
        }
        let Some(stats) = self.player_stats_mut(killer) else {
            log::error!("Kill credited to non-player {killer:?}");
            return Err(SimError::KillAttribution { killer, victim });
        };
        stats.kills += 1;
        log::debug!("Player {killer:?} killed {victim:?} ({} kills)", stats.kills);
        Ok(())
    }

    fn respawn_player(&mut self, id: EntityId, collab: &mut Collaborators<'_>) -> SimResult<()> {
        if !self.tuning.respawn_allowed {
            return Ok(());
        }
        let Some(index) = self.players.iter().position(|p| *p == id) else {
            log::warn!("Respawn requested by non-player {id:?}");
            return Ok(());
        };
        let spawn = self.player_spawn_point(index)?;
        if let Some((ship, body)) = self.arena.get_mut(id).and_then(Entity::split_ship_mut) {
            ship.respawn(body, spawn);
            collab.renderer.set_visible(id, true);
            log::debug!("Player {index} respawned at {spawn:?}");
        }
        self.play_sound_at(SoundCue::Respawn, spawn, 1.0, 1.0, collab);
        Ok(())
    }

    /// Satellites ride along with their parent's position and spin
    fn follow_parents(&mut self) {
        for &id in &self.active {
            let Some(parent) = self.arena.get(id).and_then(|e| e.body.parent) else {
                continue;
            };
            let anchor = self
                .arena
                .get(parent.id)
                .filter(|p| !p.body.is_dead())
                .map(|p| (p.body.pos, p.body.rotation));
            let Some(entity) = self.arena.get_mut(id) else {
                continue;
            };
            match anchor {
                Some((pos, rotation)) => {
                    entity.body.pos = pos + Vec2::from_angle(rotation).rotate(parent.offset);
                    entity.body.velocity = Vec2::ZERO;
                }
                None => entity.body.parent = None,
            }
        }
    }

    fn insert_entity(&mut self, entity: Entity, collab: &mut Collaborators<'_>) -> EntityId {
        let (sprite, tint) = entity.sprite();
        let is_vortex = entity.is_vortex();
        let (pos, rotation, scale) = (entity.body.pos, entity.body.rotation, entity.body.scale());
        let id = self.arena.insert(entity);
        collab.renderer.create_proxy(id, sprite, tint);
        collab.renderer.set_transform(id, pos, rotation, scale);
        if is_vortex && self.vortices.register(id).is_none() {
            log::warn!("Vortex registry full; {id:?} won't distort space");
        }
        self.active.push(id);
        id
    }

    /// Move this frame's spawns into the active list
    fn merge_pending(&mut self, collab: &mut Collaborators<'_>) {
        for entity in std::mem::take(&mut self.pending) {
            self.insert_entity(entity, collab);
        }
    }

    /// Destroy dead entities; player ships persist through death
    fn sweep_dead(&mut self, collab: &mut Collaborators<'_>) {
        let dead: Vec<EntityId> = self
            .active
            .iter()
            .copied()
            .filter(|&id| {
                self.arena
                    .get(id)
                    .is_none_or(|e| e.body.is_dead() && !self.players.contains(&id))
            })
            .collect();
        if dead.is_empty() {
            return;
        }
        self.active.retain(|id| !dead.contains(id));
        for id in dead {
            self.destroy(id, collab);
        }
    }

    fn destroy(&mut self, id: EntityId, collab: &mut Collaborators<'_>) {
        self.arena.remove(id);
        self.vortices.release(id);
        collab.renderer.destroy_proxy(id);
    }

    fn update_score_widgets(&self, hud: &mut dyn Hud) {
        for &id in &self.players {
            let (Some(slot), Some(stats)) = (
                self.arena.get(id).and_then(Entity::player_slot),
                self.player_stats(id),
            ) else {
                continue;
            };
            hud.set_text(Widget::Score(slot), &self.rules.score_text(stats));
        }
    }

    /// Ease each camera toward its player, leading along the aim stick
    fn update_cameras(&mut self, collab: &mut Collaborators<'_>) {
        for (i, &id) in self.players.iter().enumerate() {
            let Some(entity) = self.arena.get(id) else {
                continue;
            };
            let mut target = entity.body.pos;
            if let Some(ship) = entity.as_ship() {
                let aim = ship.last_intent.aim;
                if !entity.body.is_dead() && aim.length_squared() > AIM_DEADZONE * AIM_DEADZONE {
                    target += aim;
                }
            }
            let Some(camera) = self.cameras.get_mut(i) else {
                continue;
            };
            *camera = camera.lerp(target, CAMERA_LERP);
            let viewport = entity.player_slot().map_or(i, PlayerSlot::index);
            collab.renderer.set_camera_position(viewport, *camera);
        }
    }

    fn push_transforms(&self, collab: &mut Collaborators<'_>) {
        for &id in &self.active {
            if let Some(e) = self.arena.get(id) {
                collab
                    .renderer
                    .set_transform(id, e.body.pos, e.body.rotation, e.body.scale());
            }
        }
        self.push_vortices(collab);
    }

    fn push_vortices(&self, collab: &mut Collaborators<'_>) {
        collab.renderer.clear_vortices();
        for (slot, id) in self.vortices.iter() {
            if let Some(e) = self.arena.get(id) {
                collab
                    .renderer
                    .set_vortex(slot, e.body.pos, e.body.collision_radius());
            }
        }
    }

    // === Encounters ===

    /// Place a circle of `radius` clear of every existing encounter
    pub fn find_space_for_encounter(&mut self, radius: f32) -> SimResult<Vec2> {
        encounter::find_space_for_encounter(
            &mut self.rng,
            self.tuning.arena_half_extents,
            radius,
            &self.encounters,
        )
    }

    /// Roll, place, and populate this match's encounters (majors first)
    pub fn spawn_encounters(&mut self, collab: &mut Collaborators<'_>) -> SimResult<()> {
        let first_new = self.encounters.len();
        let majors = self.rng.random_range(self.tuning.major_encounter_range());
        let minors = self.rng.random_range(self.tuning.minor_encounter_range());

        let mut placed = 0;
        while placed < majors {
            let kind = EncounterKind::random_major(&mut self.rng);
            placed += self.place_encounter(kind, self.tuning.major_radius)?;
        }
        let mut placed = 0;
        while placed < minors {
            let kind = EncounterKind::random_minor(&mut self.rng);
            placed += self.place_encounter(kind, self.tuning.minor_radius)?;
        }

        for index in first_new..self.encounters.len() {
            let zone = self.encounters[index];
            self.remove_entities_in_circle(zone.center, zone.radius, collab);
            let spawn = zone.spawn(&self.encounters, &mut self.rng);
            let mut anchor = None;
            for entity in spawn.entities {
                let id = self.insert_entity(entity, collab);
                anchor.get_or_insert(id);
            }
            for (mut satellite, offset) in spawn.satellites {
                satellite.body.parent = anchor.map(|id| Parent { id, offset });
                self.insert_entity(satellite, collab);
            }
        }
        log::info!(
            "Placed {} encounters ({majors} major, {minors} minor rolled)",
            self.encounters.len() - first_new
        );
        self.push_vortices(collab);
        Ok(())
    }

    /// Place one encounter (and its twin if it needs one); returns how many were placed
    fn place_encounter(&mut self, kind: EncounterKind, radius_range: (f32, f32)) -> SimResult<u32> {
        let radius = self.rng.random_range(radius_range.0..=radius_range.1);
        let center = self.find_space_for_encounter(radius)?;
        let index = self.encounters.len();
        self.encounters.push(Encounter::new(kind, center, radius));
        log::debug!("{kind:?} encounter at {center:?} (r={radius:.2})");
        if !kind.needs_twin() {
            return Ok(1);
        }

        let twin_radius = self.rng.random_range(radius_range.0..=radius_range.1);
        let twin_center = self.find_space_for_encounter(twin_radius)?;
        let mut twin = Encounter::new(kind, twin_center, twin_radius);
        twin.twin = Some(index);
        self.encounters.push(twin);
        self.encounters[index].twin = Some(index + 1);
        Ok(2)
    }

    // === Queries and spawning ===

    /// Active entities overlapping the circle
    pub fn entities_in_radius(&self, center: Vec2, radius: f32) -> Vec<EntityId> {
        self.active
            .iter()
            .copied()
            .filter(|&id| {
                self.arena.get(id).is_some_and(|e| {
                    let reach = radius + e.body.collision_radius();
                    e.body.pos.distance_squared(center) < reach * reach
                })
            })
            .collect()
    }

    /// Destroy every non-player entity overlapping the circle
    pub fn remove_entities_in_circle(&mut self, center: Vec2, radius: f32, collab: &mut Collaborators<'_>) -> usize {
        let doomed: Vec<EntityId> = self
            .entities_in_radius(center, radius)
            .into_iter()
            .filter(|id| !self.players.contains(id))
            .collect();
        self.active.retain(|id| !doomed.contains(id));
        let count = doomed.len();
        for id in doomed {
            self.destroy(id, collab);
        }
        count
    }

    pub fn random_location_in_arena(&mut self, inset: f32) -> Vec2 {
        encounter::random_point_in_arena(&mut self.rng, self.tuning.arena_half_extents, inset)
    }

    /// Where player `index` (re)enters the arena
    pub fn player_spawn_point(&mut self, index: usize) -> SimResult<Vec2> {
        if self.spawn_points.is_empty() {
            log::warn!("No spawn points; finding open space for player {index}");
            return self.find_space_for_encounter(1.0);
        }
        if self.tuning.unique_player_spawns {
            if let Some(point) = self.spawn_points.get(index) {
                return Ok(*point);
            }
        }
        let pick = self.rng.random_range(0..self.spawn_points.len());
        Ok(self.spawn_points[pick])
    }

    /// Queue an entity; it goes live at the end of the current frame
    pub fn spawn_entity(&mut self, entity: Entity) {
        self.pending.push(entity);
    }

    pub fn spawn_pickup(&mut self, item: Item, pos: Vec2) {
        self.spawn_entity(Entity::pickup(pos, item));
    }

    fn listener_positions(&self) -> Vec<Vec2> {
        self.players
            .iter()
            .filter_map(|id| self.arena.get(*id).map(|e| e.body.pos))
            .collect()
    }

    /// Play a sound attenuated by distance to the nearest player
    pub fn play_sound_at(
        &self,
        cue: SoundCue,
        pos: Vec2,
        max_volume: f32,
        pitch: f32,
        collab: &mut Collaborators<'_>,
    ) {
        let volume = audio::attenuation(&self.listener_positions(), pos).min(max_volume);
        collab.audio.play(cue, volume, pitch);
    }

    // === Timer and scoring ===

    pub fn set_time_remaining(&mut self, seconds: f32) {
        self.elapsed = self.tuning.game_length_seconds - seconds;
    }

    pub fn time_remaining(&self) -> f32 {
        (self.tuning.game_length_seconds - self.elapsed).max(0.0)
    }

    pub fn mark_timer_paused(&self, hud: &mut dyn Hud) {
        hud.set_text(Widget::Timer, "Paused");
    }

    fn player_slots(&self) -> Vec<PlayerSlot> {
        self.players
            .iter()
            .filter_map(|id| self.arena.get(*id).and_then(Entity::player_slot))
            .collect()
    }

    /// Competition ranks per player slot, in player order
    pub fn rank_players(&self) -> Vec<(PlayerSlot, usize)> {
        let scored: Vec<(PlayerSlot, f64)> = self
            .players
            .iter()
            .filter_map(|&id| {
                let slot = self.arena.get(id).and_then(Entity::player_slot)?;
                let stats = self.player_stats(id).copied().unwrap_or_default();
                Some((slot, self.rules.score(&stats)))
            })
            .collect();
        let scores: Vec<f64> = scored.iter().map(|(_, score)| *score).collect();
        scored
            .iter()
            .zip(competition_ranks(&scores))
            .map(|((slot, _), rank)| (*slot, rank))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::input::{PilotIntent, ScriptedInput};
    use crate::render::RecordingRenderer;
    use crate::sim::entity::EntityKind;
    use crate::ui::RecordingHud;

    #[derive(Default)]
    struct Rig {
        renderer: RecordingRenderer,
        audio: RecordingAudio,
        input: ScriptedInput,
        hud: RecordingHud,
    }

    impl Rig {
        fn collab(&mut self) -> Collaborators<'_> {
            Collaborators {
                renderer: &mut self.renderer,
                audio: &mut self.audio,
                input: &mut self.input,
                hud: &mut self.hud,
            }
        }
    }

    fn quiet_tuning() -> MatchTuning {
        MatchTuning {
            starting_asteroids: 0,
            minor_encounters: (0, 0),
            major_encounters: (0, 0),
            spawn_interval_seconds: 0.0,
            ..MatchTuning::default()
        }
    }

    fn ships(count: u8) -> Vec<Entity> {
        (0..count)
            .map(|i| Entity::ship(Vec2::ZERO, Ship::player(PlayerSlot(i))))
            .collect()
    }

    fn started(rules: ModeRules, tuning: MatchTuning, players: u8, rig: &mut Rig) -> GameMode {
        let mut mode = GameMode::new(rules, tuning).unwrap();
        mode.initialize(ships(players), &mut rig.collab()).unwrap();
        mode.start_playing(&mut rig.collab());
        mode
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(format_clock(125.0), "2:05");
        assert_eq!(format_clock(59.2), "1:00");
        assert_eq!(format_clock(42.5), ":43");
        assert_eq!(format_clock(5.0), ":05");
        assert_eq!(format_clock(-3.0), ":00");
    }

    #[test]
    fn test_slowdown_curve() {
        assert!((slowdown_factor(0.0) - 1.0).abs() < 0.0001);
        assert!((slowdown_factor(1.5) - 0.25).abs() < 0.0001);
        assert!((slowdown_factor(2.9) - MIN_SLOWDOWN_FACTOR).abs() < 0.0001);
        assert!((slowdown_factor(10.0) - MIN_SLOWDOWN_FACTOR).abs() < 0.0001);
    }

    #[test]
    fn test_stop_playing_is_idempotent() {
        let mut rig = Rig::default();
        let mut once = started(ModeRules::Assembly, quiet_tuning(), 2, &mut rig);
        once.stop_playing(&mut rig.hud);
        let phase = once.phase();
        let timer = rig.hud.get(Widget::Timer).cloned();
        let countdown = rig.hud.get(Widget::Countdown).cloned();

        once.stop_playing(&mut rig.hud);
        assert_eq!(once.phase(), phase);
        assert_eq!(rig.hud.get(Widget::Timer).cloned(), timer);
        assert_eq!(rig.hud.get(Widget::Countdown).cloned(), countdown);
        assert!(!rig.hud.is_visible(Widget::Timer));
        assert!(!once.is_playing());
    }

    #[test]
    fn test_ranking_shares_ties() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 4, &mut rig);
        let players = mode.players().to_vec();
        for (id, kills) in players.iter().zip([5, 3, 5, 1]) {
            mode.player_stats_mut(*id).unwrap().kills = kills;
        }
        let ranks: Vec<usize> = mode.rank_players().into_iter().map(|(_, r)| r).collect();
        assert_eq!(ranks, vec![1, 3, 1, 4]);
    }

    #[test]
    fn test_countdown_plays_each_number_once() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        mode.set_time_remaining(4.5);
        mode.update(0.01, &mut rig.collab()).unwrap();
        mode.update(0.01, &mut rig.collab()).unwrap();
        assert!(rig.hud.is_visible(Widget::Countdown));
        assert_eq!(rig.hud.text(Widget::Countdown), "5");
        assert_eq!(rig.audio.count(SoundCue::Countdown(5)), 1);

        mode.update(0.5, &mut rig.collab()).unwrap();
        assert_eq!(rig.hud.text(Widget::Countdown), "4");
        assert_eq!(rig.audio.count(SoundCue::Countdown(4)), 1);
    }

    #[test]
    fn test_expiry_winds_down_then_stops() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        mode.set_time_remaining(0.01);
        mode.update(0.02, &mut rig.collab()).unwrap();
        assert_eq!(mode.phase(), MatchPhase::TimeExpired);
        assert_eq!(rig.hud.text(Widget::Timer), ":00");
        assert_eq!(rig.hud.text(Widget::Countdown), "TIME!");
        assert_eq!(mode.time_remaining(), 0.0);

        mode.update(0.02, &mut rig.collab()).unwrap();
        assert_eq!(rig.audio.count(SoundCue::TimeUp), 1);
        assert!(rig.audio.frequency.is_some_and(|f| f < 1.0));

        mode.update(AFTER_GAME_SLOWDOWN_SECONDS, &mut rig.collab()).unwrap();
        assert_eq!(mode.phase(), MatchPhase::Stopped);
        assert!(!rig.hud.is_visible(Widget::Timer));
    }

    #[test]
    fn test_kill_against_non_player_is_fatal() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        mode.spawn_entity(Entity::asteroid(Vec2::new(5.0, 5.0), Asteroid::with_scale(0.4)));
        mode.update(0.016, &mut rig.collab()).unwrap();
        let rock = *mode.active_ids().last().unwrap();
        let player = mode.players()[0];

        mode.events.push(GameEvent::PlayerKill {
            killer: player,
            victim: rock,
        });
        let err = mode.update(0.016, &mut rig.collab()).unwrap_err();
        assert!(matches!(err, SimError::KillAttribution { victim, .. } if victim == rock));
    }

    #[test]
    fn test_spawns_merge_at_frame_end_and_dead_are_swept() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        let before = mode.active_ids().len();
        mode.spawn_entity(Entity::asteroid(Vec2::new(8.0, 8.0), Asteroid::with_scale(1.0)));
        assert_eq!(mode.pending_count(), 1);
        assert_eq!(mode.active_ids().len(), before);

        mode.update(0.016, &mut rig.collab()).unwrap();
        assert_eq!(mode.pending_count(), 0);
        assert_eq!(mode.active_ids().len(), before + 1);
        let rock = *mode.active_ids().last().unwrap();
        assert!(rig.renderer.has_proxy(rock));

        mode.entity_mut(rock).unwrap().body.mark_dead();
        mode.update(0.016, &mut rig.collab()).unwrap();
        assert!(mode.entity(rock).is_none());
        assert!(!mode.active_ids().contains(&rock));
        assert!(!rig.renderer.has_proxy(rock));
    }

    #[test]
    fn test_dead_players_stay_in_the_match() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 2, &mut rig);
        let victim = mode.players()[1];
        mode.entity_mut(victim).unwrap().body.mark_dead();
        mode.update(0.016, &mut rig.collab()).unwrap();
        assert!(mode.active_ids().contains(&victim));
        assert!(mode.entity(victim).unwrap().body.is_dead());
    }

    #[test]
    fn test_respawn_on_request() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        let player = mode.players()[0];
        mode.entity_mut(player).unwrap().body.mark_dead();
        rig.input.set(
            PlayerSlot(0),
            PilotIntent {
                respawn: true,
                ..Default::default()
            },
        );
        mode.update(0.016, &mut rig.collab()).unwrap();
        let body = &mode.entity(player).unwrap().body;
        assert!(!body.is_dead());
        assert_eq!(body.hp, body.max_hp);
        assert_eq!(rig.audio.count(SoundCue::Respawn), 1);
    }

    #[test]
    fn test_death_battle_ends_with_last_survivor() {
        let mut rig = Rig::default();
        let tuning = MatchTuning {
            starting_asteroids: 0,
            ..MatchTuning::death_battle()
        };
        let mut mode = started(ModeRules::DeathBattle, tuning, 2, &mut rig);
        let [winner, loser] = [mode.players()[0], mode.players()[1]];
        assert_ne!(
            mode.entity(winner).unwrap().body.pos,
            mode.entity(loser).unwrap().body.pos
        );

        mode.update(1.0, &mut rig.collab()).unwrap();
        mode.events.push(GameEvent::PlayerDied { victim: loser });
        mode.entity_mut(loser).unwrap().body.mark_dead();
        mode.update(0.016, &mut rig.collab()).unwrap();

        assert_eq!(mode.phase(), MatchPhase::Stopped);
        let time_alive = mode.player_stats(loser).unwrap().time_alive.unwrap();
        assert!(time_alive > 1.0 && time_alive < 1.1);
        let ranks = mode.rank_players();
        assert_eq!(ranks, vec![(PlayerSlot(0), 1), (PlayerSlot(1), 2)]);
    }

    #[test]
    fn test_death_battle_black_hole_is_registered() {
        let mut rig = Rig::default();
        let mode = started(ModeRules::DeathBattle, MatchTuning::death_battle(), 2, &mut rig);
        assert_eq!(mode.vortices().len(), 1);
        assert_eq!(mode.encounters().len(), 1);
        assert!(rig.renderer.vortices.iter().flatten().count() >= 1);
    }

    #[test]
    fn test_encounters_do_not_overlap() {
        let mut rig = Rig::default();
        let tuning = MatchTuning {
            minor_encounters: (3, 3),
            major_encounters: (1, 2),
            ..quiet_tuning()
        };
        let mode = started(ModeRules::Assembly, tuning, 2, &mut rig);
        let placed = mode.encounters();
        assert!(placed.len() >= 4);
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                let min_dist = a.radius + b.radius;
                assert!(a.center.distance_squared(b.center) > min_dist * min_dist);
            }
            if let Some(twin) = a.twin {
                assert_eq!(placed[twin].twin, Some(i));
            }
        }
    }

    #[test]
    fn test_remove_entities_in_circle_spares_players() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        let player = mode.players()[0];
        let spot = mode.entity(player).unwrap().body.pos;
        mode.spawn_entity(Entity::asteroid(spot + Vec2::X, Asteroid::with_scale(0.4)));
        mode.update(0.0, &mut rig.collab()).unwrap();
        assert_eq!(mode.entities_in_radius(spot, 1.0).len(), 2);

        let removed = mode.remove_entities_in_circle(spot, 1.0, &mut rig.collab());
        assert_eq!(removed, 1);
        assert_eq!(mode.entities_in_radius(spot, 1.0), vec![player]);
    }

    #[test]
    fn test_assembly_drops_crates_and_drones_periodically() {
        let mut rig = Rig::default();
        let tuning = MatchTuning {
            spawn_interval_seconds: 0.5,
            ..quiet_tuning()
        };
        let mut mode = started(ModeRules::Assembly, tuning, 1, &mut rig);
        let crates = |m: &GameMode| {
            m.active_ids()
                .iter()
                .filter(|id| matches!(m.entity(**id).unwrap().kind, EntityKind::Crate(_)))
                .count()
        };
        let before = crates(&mode);
        for _ in 0..40 {
            mode.update(1.0 / 60.0, &mut rig.collab()).unwrap();
        }
        assert_eq!(crates(&mode), before + 1);
    }

    #[test]
    fn test_cleanup_returns_players() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 3, &mut rig);
        let players = mode.cleanup(&mut rig.collab());
        assert_eq!(players.len(), 3);
        assert!(players.iter().all(Entity::is_player));
        assert!(mode.active_ids().is_empty());
        assert!(rig.audio.looping.is_empty());
        assert!(rig.renderer.proxies.is_empty());
    }

    #[test]
    fn test_cameras_follow_players_with_aim_lead() {
        let mut rig = Rig::default();
        let mut mode = GameMode::new(ModeRules::DeathBattle, quiet_tuning()).unwrap();
        let players = [PlayerSlot(2), PlayerSlot(0), PlayerSlot(1)]
            .into_iter()
            .map(|slot| Entity::ship(Vec2::ZERO, Ship::player(slot)))
            .collect();
        mode.initialize(players, &mut rig.collab()).unwrap();
        mode.start_playing(&mut rig.collab());

        let lead = Vec2::new(0.8, 0.0);
        let aim = |aim: Vec2| PilotIntent {
            aim,
            ..Default::default()
        };
        rig.input.set(PlayerSlot(2), aim(lead));
        rig.input.set(PlayerSlot(0), aim(Vec2::new(0.0, AIM_DEADZONE * 0.5)));
        rig.input.set(PlayerSlot(1), aim(lead));
        let ids = mode.players().to_vec();
        mode.entity_mut(ids[2]).unwrap().body.mark_dead();
        let before: Vec<Vec2> = (0..3).map(|i| mode.camera_position(i).unwrap()).collect();

        mode.update(0.001, &mut rig.collab()).unwrap();
        let pos = |i: usize| mode.entity(ids[i]).unwrap().body.pos;
        let expected = [
            before[0].lerp(pos(0) + lead, CAMERA_LERP),
            before[1].lerp(pos(1), CAMERA_LERP),
            before[2].lerp(pos(2), CAMERA_LERP),
        ];
        for (i, want) in expected.iter().enumerate() {
            let got = mode.camera_position(i).unwrap();
            assert!(got.distance(*want) < 0.0001, "camera {i}: {got:?} vs {want:?}");
        }

        // Viewports follow the player slot, not the join order
        assert_eq!(rig.renderer.cameras.len(), 3);
        assert!(rig.renderer.cameras[2].distance(expected[0]) < 0.0001);
        assert!(rig.renderer.cameras[0].distance(expected[1]) < 0.0001);
        assert!(rig.renderer.cameras[1].distance(expected[2]) < 0.0001);
    }

    #[test]
    fn test_default_tuning_follows_rules() {
        let battle = GameMode::with_default_tuning(ModeRules::DeathBattle).unwrap();
        assert_eq!(battle.tuning(), &MatchTuning::death_battle());
        let assembly = GameMode::with_default_tuning(ModeRules::Assembly).unwrap();
        assert!(assembly.tuning().respawn_allowed);
        assert!(!battle.tuning().respawn_allowed);
    }

    #[test]
    fn test_paused_timer_text() {
        let mut rig = Rig::default();
        let mut mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        mode.mark_timer_paused(&mut rig.hud);
        assert_eq!(rig.hud.text(Widget::Timer), "Paused");

        mode.update(0.1, &mut rig.collab()).unwrap();
        assert_ne!(rig.hud.text(Widget::Timer), "Paused");
    }

    #[test]
    fn test_positional_sound_attenuates() {
        let mut rig = Rig::default();
        let mode = started(ModeRules::Assembly, quiet_tuning(), 1, &mut rig);
        let near = mode.entity(mode.players()[0]).unwrap().body.pos;
        mode.play_sound_at(SoundCue::Hit, near, 0.5, 1.0, &mut rig.collab());
        mode.play_sound_at(SoundCue::Hit, near + Vec2::splat(50.0), 1.0, 1.0, &mut rig.collab());
        let volumes: Vec<f32> = rig.audio.played.iter().filter(|p| p.cue == SoundCue::Hit).map(|p| p.volume).collect();
        assert_eq!(volumes, vec![0.5, 0.0]);
    }
}
