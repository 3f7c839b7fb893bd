//! Pilot input contract
//!
//! Device polling and key mapping live outside the core. Each frame the mode
//! asks the [`InputSource`] for a [`PilotIntent`] per player slot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::EquipSlot;

/// Which human player (0-based, also the viewport index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerSlot(pub u8);

impl PlayerSlot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Everything a pilot wants this frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PilotIntent {
    /// Desired movement, length 0.0 - 1.0
    pub movement: Vec2,
    /// Aim / look-ahead stick, length 0.0 - 1.0
    pub aim: Vec2,
    /// Fire held
    pub fire: bool,
    /// Trigger the equipped active item
    pub activate: bool,
    /// Respawn request while dead
    pub respawn: bool,
    /// Confirm / advance (results screens)
    pub accept: bool,
    /// Eject button currently held for this slot
    pub eject: Option<EquipSlot>,
}

impl PilotIntent {
    /// Clamp stick vectors to unit length
    pub fn normalized(mut self) -> Self {
        self.movement = self.movement.clamp_length_max(1.0);
        self.aim = self.aim.clamp_length_max(1.0);
        self
    }
}

/// Source of player intents plus haptic feedback
pub trait InputSource {
    fn intent(&mut self, slot: PlayerSlot) -> PilotIntent;
    /// Light controller rumble
    fn rumble(&mut self, slot: PlayerSlot, strength: f32, seconds: f32);
    /// Camera kick opposite the firing direction
    fn recoil(&mut self, slot: PlayerSlot, offset: Vec2);
}

/// No players pressing anything
#[derive(Debug, Default)]
pub struct NullInput;

impl InputSource for NullInput {
    fn intent(&mut self, _slot: PlayerSlot) -> PilotIntent {
        PilotIntent::default()
    }
    fn rumble(&mut self, _slot: PlayerSlot, _strength: f32, _seconds: f32) {}
    fn recoil(&mut self, _slot: PlayerSlot, _offset: Vec2) {}
}

/// Fixed per-slot intents, with a log of feedback requests
#[derive(Debug, Default)]
pub struct ScriptedInput {
    pub intents: Vec<(PlayerSlot, PilotIntent)>,
    pub rumbles: Vec<(PlayerSlot, f32)>,
    pub recoils: Vec<(PlayerSlot, Vec2)>,
}

impl ScriptedInput {
    pub fn set(&mut self, slot: PlayerSlot, intent: PilotIntent) {
        self.intents.retain(|(s, _)| *s != slot);
        self.intents.push((slot, intent));
    }
}

impl InputSource for ScriptedInput {
    fn intent(&mut self, slot: PlayerSlot) -> PilotIntent {
        self.intents
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, intent)| intent.normalized())
            .unwrap_or_default()
    }

    fn rumble(&mut self, slot: PlayerSlot, strength: f32, _seconds: f32) {
        self.rumbles.push((slot, strength));
    }

    fn recoil(&mut self, slot: PlayerSlot, offset: Vec2) {
        self.recoils.push((slot, offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_defaults_unknown_slots() {
        let mut input = ScriptedInput::default();
        input.set(
            PlayerSlot(0),
            PilotIntent {
                movement: Vec2::new(3.0, 4.0),
                fire: true,
                ..Default::default()
            },
        );
        let p0 = input.intent(PlayerSlot(0));
        assert!(p0.fire);
        assert!((p0.movement.length() - 1.0).abs() < 0.0001);
        assert_eq!(input.intent(PlayerSlot(1)), PilotIntent::default());
    }
}
