//! Audio collaborator contract
//!
//! The simulation never owns a mixer. It names sounds with [`SoundCue`] and
//! issues fire-and-forget commands through an [`AudioSink`].

use glam::Vec2;

use crate::consts::SOUND_FALLOFF_DIST_SQ;

/// Sound assets the simulation can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Default blaster shot
    BlasterFire,
    /// Spread shot burst
    SpreadFire,
    /// Wave gun shot (two alternating samples)
    WaveFire(u8),
    /// Homing launcher
    MissileFire,
    /// Projectile impact
    Hit,
    /// Ship destroyed
    ShipExplode,
    /// Asteroid / crate destroyed
    CratePop,
    /// Item collected
    Pickup,
    /// Item ejected from a slot
    Eject,
    /// Active item triggered
    ActiveTrigger,
    /// Warp completed
    Warp,
    /// Countdown voice, 1..=5
    Countdown(u8),
    /// Timer expired
    TimeUp,
    /// Respawn
    Respawn,
    /// Looping background music for a mode
    Music,
}

/// Fire-and-forget audio commands
pub trait AudioSink {
    /// Play once at a volume (0.0 - 1.0) and pitch multiplier
    fn play(&mut self, cue: SoundCue, volume: f32, pitch: f32);
    /// Start a looping sound
    fn play_looped(&mut self, cue: SoundCue, volume: f32);
    /// Stop a sound if it is playing
    fn stop(&mut self, cue: SoundCue);
    /// Scale the playback frequency of a looping sound
    fn set_frequency_multiplier(&mut self, cue: SoundCue, multiplier: f32);
}

/// Positional attenuation: loudest over all listeners of `1 - distSq / falloff`,
/// clamped to [0, 1]
pub fn attenuation(listeners: &[Vec2], sound_pos: Vec2) -> f32 {
    listeners
        .iter()
        .map(|listener| 1.0 - listener.distance_squared(sound_pos) / SOUND_FALLOFF_DIST_SQ)
        .fold(0.0_f32, f32::max)
        .clamp(0.0, 1.0)
}

/// Sink that drops every command
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: SoundCue, _volume: f32, _pitch: f32) {}
    fn play_looped(&mut self, _cue: SoundCue, _volume: f32) {}
    fn stop(&mut self, _cue: SoundCue) {}
    fn set_frequency_multiplier(&mut self, _cue: SoundCue, _multiplier: f32) {}
}

/// A recorded `play` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayedSound {
    pub cue: SoundCue,
    pub volume: f32,
    pub pitch: f32,
}

/// Sink that remembers what it was asked to do (headless runs and tests)
#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub played: Vec<PlayedSound>,
    pub looping: Vec<SoundCue>,
    pub frequency: Option<f32>,
}

impl RecordingAudio {
    pub fn count(&self, cue: SoundCue) -> usize {
        self.played.iter().filter(|p| p.cue == cue).count()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: SoundCue, volume: f32, pitch: f32) {
        self.played.push(PlayedSound { cue, volume, pitch });
    }

    fn play_looped(&mut self, cue: SoundCue, _volume: f32) {
        if !self.looping.contains(&cue) {
            self.looping.push(cue);
        }
    }

    fn stop(&mut self, cue: SoundCue) {
        self.looping.retain(|c| *c != cue);
    }

    fn set_frequency_multiplier(&mut self, _cue: SoundCue, multiplier: f32) {
        self.frequency = Some(multiplier);
    }
}
