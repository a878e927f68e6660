//! Positional sound cues
//!
//! Entities request sounds at a world position during a step; after the
//! step the cues are panned relative to a camera and handed to the
//! application's audio backend.

use glam::Vec2;

use crate::sim::{Camera, WorldEvent};

/// A sound requested at a world position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundCue {
    /// Application-defined sound id
    pub sound: u16,
    pub at: Vec2,
}

/// Audio backend
pub trait AudioSink {
    /// Play `sound` with stereo `pan` in [-1, 1]
    fn play(&mut self, sound: u16, pan: f32);
}

impl AudioSink for Vec<(u16, f32)> {
    fn play(&mut self, sound: u16, pan: f32) {
        self.push((sound, pan));
    }
}

/// Play every sound cue in `events`, panned for `camera`.
/// Returns how many cues were played.
pub fn dispatch_sounds(events: &[WorldEvent], camera: &Camera, sink: &mut dyn AudioSink) -> usize {
    let mut played = 0;
    for event in events {
        if let WorldEvent::Sound(cue) = event {
            sink.play(cue.sound, camera.pan_for(cue.at));
            played += 1;
        }
    }
    played
}
