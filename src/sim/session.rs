//! Session: the run of modes a group of players plays through
//!
//! Flow: Assembly, its results screen, then each queued minigame followed by
//! its own results screen, then game over. The session owns the player ships
//! between modes and lends them to whichever [`GameMode`] is running.

use std::collections::VecDeque;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::arena::{EntityArena, EntityId};
use super::entity::Entity;
use super::frame::{Collaborators, FrameContext};
use super::mode::GameMode;
use super::rules::ModeRules;
use super::scoring::competition_ranks;
use super::ship::Ship;
use crate::error::SimResult;
use crate::input::PlayerSlot;
use crate::tuning::MatchTuning;

/// Results screens ignore `accept` for this long
pub const TIME_BEFORE_PLAYERS_CAN_ADVANCE: f32 = 1.0;
/// Ships park this far from the center on results screens
const RESULTS_PARKING: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AssemblyPlaying,
    AssemblyResults,
    MinigamePlaying,
    MinigameResults,
    GameOver,
}

/// One player's placements across the minigames played so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub slot: PlayerSlot,
    pub placements: Vec<usize>,
}

impl Standing {
    pub fn total(&self) -> usize {
        self.placements.iter().sum()
    }
}

pub struct Session {
    state: SessionState,
    seconds_in_state: f32,
    mode: Option<GameMode>,
    assembly_tuning: MatchTuning,
    minigames: VecDeque<(ModeRules, MatchTuning)>,
    /// Player ships while no mode holds them
    lobby: EntityArena,
    lobby_ids: Vec<EntityId>,
    standings: Vec<Standing>,
    rng: Pcg32,
}

impl Session {
    pub fn new(
        player_count: u8,
        assembly_tuning: MatchTuning,
        minigames: impl IntoIterator<Item = (ModeRules, MatchTuning)>,
    ) -> SimResult<Self> {
        assembly_tuning.validate()?;
        let minigames: VecDeque<_> = minigames.into_iter().collect();
        for (_, tuning) in &minigames {
            tuning.validate()?;
        }

        let mut lobby = EntityArena::new();
        let mut lobby_ids = Vec::new();
        let mut standings = Vec::new();
        for i in 0..player_count {
            let slot = PlayerSlot(i);
            lobby_ids.push(lobby.insert(Entity::ship(Vec2::ZERO, Ship::player(slot))));
            standings.push(Standing {
                slot,
                placements: Vec::new(),
            });
        }

        Ok(Self {
            state: SessionState::AssemblyPlaying,
            seconds_in_state: 0.0,
            mode: None,
            rng: Pcg32::seed_from_u64(assembly_tuning.seed),
            assembly_tuning,
            minigames,
            lobby,
            lobby_ids,
            standings,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> Option<&GameMode> {
        self.mode.as_ref()
    }

    pub fn mode_mut(&mut self) -> Option<&mut GameMode> {
        self.mode.as_mut()
    }

    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    pub fn minigames_left(&self) -> usize {
        self.minigames.len()
    }

    /// Player ships parked in the lobby (empty while a mode holds them)
    pub fn lobby_ships(&self) -> impl Iterator<Item = &Entity> {
        self.lobby_ids.iter().filter_map(|id| self.lobby.get(*id))
    }

    /// Overall placement: fewest total placement points wins
    pub fn final_ranks(&self) -> Vec<(PlayerSlot, usize)> {
        let scores: Vec<f64> = self
            .standings
            .iter()
            .map(|s| -(s.total() as f64))
            .collect();
        self.standings
            .iter()
            .zip(competition_ranks(&scores))
            .map(|(s, rank)| (s.slot, rank))
            .collect()
    }

    /// Kick off the assembly round
    pub fn start(&mut self, collab: &mut Collaborators<'_>) -> SimResult<()> {
        let tuning = self.assembly_tuning.clone();
        self.enter_mode(ModeRules::Assembly, tuning, SessionState::AssemblyPlaying, collab)
    }

    pub fn update(&mut self, dt: f32, collab: &mut Collaborators<'_>) -> SimResult<()> {
        self.seconds_in_state += dt;
        match self.state {
            SessionState::AssemblyPlaying | SessionState::MinigamePlaying => {
                let Some(mode) = self.mode.as_mut() else {
                    return Ok(());
                };
                mode.update(dt, collab)?;
                if !mode.is_playing() {
                    self.finish_mode(collab);
                }
            }
            SessionState::AssemblyResults | SessionState::MinigameResults => {
                let accepted = self.update_lobby(dt, collab);
                if accepted && self.seconds_in_state >= TIME_BEFORE_PLAYERS_CAN_ADVANCE {
                    self.leave_results(collab)?;
                }
            }
            SessionState::GameOver => {}
        }
        Ok(())
    }

    fn set_state(&mut self, state: SessionState) {
        log::info!("Session {:?} -> {:?}", self.state, state);
        self.state = state;
        self.seconds_in_state = 0.0;
    }

    fn enter_mode(
        &mut self,
        rules: ModeRules,
        tuning: MatchTuning,
        state: SessionState,
        collab: &mut Collaborators<'_>,
    ) -> SimResult<()> {
        let mut mode = GameMode::new(rules, tuning)?;
        let ships: Vec<Entity> = std::mem::take(&mut self.lobby_ids)
            .into_iter()
            .filter_map(|id| {
                collab.renderer.destroy_proxy(id);
                self.lobby.remove(id)
            })
            .collect();
        if let Err(err) = mode.initialize(ships, collab) {
            log::error!("{} failed to start: {err}", rules.name());
            for ship in mode.cleanup(collab) {
                self.park(ship, collab);
            }
            return Err(err);
        }
        mode.start_playing(collab);
        self.mode = Some(mode);
        self.set_state(state);
        Ok(())
    }

    /// Score the finished mode and park its ships on the results screen
    fn finish_mode(&mut self, collab: &mut Collaborators<'_>) {
        let Some(mut mode) = self.mode.take() else {
            return;
        };
        let is_minigame = mode.rules() != ModeRules::Assembly;
        if is_minigame {
            for (slot, rank) in mode.rank_players() {
                if let Some(standing) = self.standings.iter_mut().find(|s| s.slot == slot) {
                    standing.placements.push(rank);
                }
                log::info!("{}: player {} placed {rank}", mode.rules().name(), slot.0);
            }
        }

        for (i, mut ship) in mode.cleanup(collab).into_iter().enumerate() {
            let x = if i % 2 == 0 { -RESULTS_PARKING } else { RESULTS_PARKING };
            let y = if i >= 2 { -RESULTS_PARKING } else { RESULTS_PARKING };
            ship.body.pos = Vec2::new(x, y);
            ship.body.velocity = Vec2::ZERO;
            if let Some(s) = ship.as_ship_mut() {
                s.lock_movement();
            }
            self.park(ship, collab);
        }
        collab.renderer.set_camera_position(0, Vec2::ZERO);

        self.set_state(if is_minigame {
            SessionState::MinigameResults
        } else {
            SessionState::AssemblyResults
        });
    }

    /// Hand a ship to the lobby and give it a proxy again
    fn park(&mut self, ship: Entity, collab: &mut Collaborators<'_>) {
        let (sprite, tint) = ship.sprite();
        let dead = ship.body.is_dead();
        let id = self.lobby.insert(ship);
        collab.renderer.create_proxy(id, sprite, tint);
        collab.renderer.set_visible(id, !dead);
        self.lobby_ids.push(id);
    }

    /// Let parked ships idle; returns whether anyone pressed accept
    fn update_lobby(&mut self, dt: f32, collab: &mut Collaborators<'_>) -> bool {
        let mut spawned = Vec::new();
        let mut events = Vec::new();
        let mut ctx = FrameContext {
            dt,
            rng: &mut self.rng,
            collab,
            is_playing: false,
            drop_items_on_death: false,
            respawn_allowed: false,
            arena_half_extents: self.assembly_tuning.arena_half_extents,
            listeners: &[],
            targets: &[],
            spawned: &mut spawned,
            events: &mut events,
        };

        let mut accepted = false;
        for &id in &self.lobby_ids {
            let Some(ship) = self.lobby.get_mut(id) else {
                continue;
            };
            ship.update(id, dt, &mut ctx);
            accepted |= ship.as_ship().is_some_and(|s| s.last_intent.accept);
            ctx.collab
                .renderer
                .set_transform(id, ship.body.pos, ship.body.rotation, ship.body.scale());
        }
        if !spawned.is_empty() || !events.is_empty() {
            log::debug!(
                "Dropped {} spawns and {} events from the results screen",
                spawned.len(),
                events.len()
            );
        }
        accepted
    }

    /// Unlock and heal everyone, then start the next minigame or end the session
    fn leave_results(&mut self, collab: &mut Collaborators<'_>) -> SimResult<()> {
        for &id in &self.lobby_ids {
            if let Some((ship, body)) = self.lobby.get_mut(id).and_then(Entity::split_ship_mut) {
                ship.unlock_movement();
                ship.revive(body);
                collab.renderer.set_visible(id, true);
            }
        }

        match self.minigames.pop_front() {
            Some((rules, tuning)) => {
                self.enter_mode(rules, tuning, SessionState::MinigamePlaying, collab)
            }
            None => {
                for (slot, rank) in self.final_ranks() {
                    log::info!("Final standings: player {} is #{rank}", slot.0);
                }
                self.set_state(SessionState::GameOver);
                Ok(())
            }
        }
    }
}
