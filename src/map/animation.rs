//! Tile animation rules
//!
//! A rule animates the contiguous code range `[code, code + frames)`. Codes
//! inside the range double as phase offsets: a tile placed with `code + k`
//! shows the frame `k` steps ahead of the rule's shared frame, so neighbouring
//! tiles can run out of step without extra state.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// How a rule picks its next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnimationKind {
    /// 0, 1, .., n-1, 0, ..
    Forward = 0,
    /// 0, 1, .., n-1, n-2, .., 0, 1, ..
    PingPong = 1,
    /// One random frame per step, shared by every tile of the rule
    RandomGlobal = 2,
    /// Every query picks its own random frame
    RandomPerTile = 3,
}

impl AnimationKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Forward),
            1 => Some(Self::PingPong),
            2 => Some(Self::RandomGlobal),
            3 => Some(Self::RandomPerTile),
            _ => None,
        }
    }
}

/// A persisted animation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationRule {
    /// First code of the range (frame 0)
    pub code: u16,
    pub frames: u8,
    /// Game ticks each frame stays on screen
    pub ticks_per_frame: u8,
    pub kind: AnimationKind,
}

impl AnimationRule {
    pub fn new(code: u16, frames: u8, ticks_per_frame: u8, kind: AnimationKind) -> Self {
        Self {
            code,
            frames,
            ticks_per_frame,
            kind,
        }
    }

    /// Does this rule animate `code`?
    #[inline]
    pub fn covers(&self, code: u16) -> bool {
        code >= self.code && (code as u32) < self.code as u32 + self.frames as u32
    }
}

/// Shared per-rule playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Playback {
    frame: u8,
    dir: i8,
    timer: u8,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            frame: 0,
            dir: 1,
            timer: 0,
        }
    }
}

/// Step a deterministic frame sequence once
fn advance(kind: AnimationKind, frames: u8, frame: u8, dir: i8) -> (u8, i8) {
    match kind {
        AnimationKind::Forward => ((frame + 1) % frames.max(1), dir),
        AnimationKind::PingPong => {
            if frames < 2 {
                return (0, 1);
            }
            let mut dir = dir;
            let next = frame as i16 + dir as i16;
            if next < 0 || next >= frames as i16 {
                dir = -dir;
            }
            ((frame as i16 + dir as i16) as u8, dir)
        }
        AnimationKind::RandomPerTile | AnimationKind::RandomGlobal => (frame, dir),
    }
}

/// PCG stream for per-tile frames, apart from the playback generator
const FRAME_STREAM: u64 = 0xda3e_39cb_94b9_5bdb;

/// Evaluates animation rules for the tiles on screen
#[derive(Debug, Clone)]
pub struct TileAnimator {
    rules: Vec<AnimationRule>,
    playback: Vec<Playback>,
    rng: Pcg32,
    seed: u64,
    ticks: u64,
}

impl TileAnimator {
    pub fn new(rules: Vec<AnimationRule>, seed: u64) -> Self {
        let playback = vec![Playback::default(); rules.len()];
        Self {
            rules,
            playback,
            rng: Pcg32::seed_from_u64(seed),
            seed,
            ticks: 0,
        }
    }

    /// Generator for the per-tile frames of one drawn frame.
    ///
    /// Depends only on the seed and the ticks played so far, so drawing
    /// never feeds back into playback.
    pub fn frame_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed ^ self.ticks.wrapping_mul(0x9e37_79b9_7f4a_7c15), FRAME_STREAM)
    }

    pub fn rules(&self) -> &[AnimationRule] {
        &self.rules
    }

    /// Rewind every rule to frame 0
    pub fn reset(&mut self) {
        self.playback.fill(Playback::default());
        self.ticks = 0;
    }

    /// Advance every rule by one game tick
    pub fn tick(&mut self) {
        self.ticks += 1;
        for (rule, state) in self.rules.iter().zip(self.playback.iter_mut()) {
            if rule.frames == 0 {
                continue;
            }
            state.timer = state.timer.saturating_add(1);
            if state.timer < rule.ticks_per_frame.max(1) {
                continue;
            }
            state.timer = 0;
            match rule.kind {
                AnimationKind::RandomGlobal => {
                    state.frame = self.rng.random_range(0..rule.frames);
                }
                kind => {
                    let (frame, dir) = advance(kind, rule.frames, state.frame, state.dir);
                    state.frame = frame;
                    state.dir = dir;
                }
            }
        }
    }

    /// Code to display for a tile, `code` itself when no rule covers it.
    /// `RandomPerTile` frames are drawn from `rng`.
    pub fn resolve(&self, code: u16, rng: &mut Pcg32) -> u16 {
        let Some(index) = self.rules.iter().position(|r| r.covers(code)) else {
            return code;
        };
        let rule = self.rules[index];
        let state = self.playback[index];
        let offset = code - rule.code;

        let frame = match rule.kind {
            AnimationKind::Forward | AnimationKind::PingPong => {
                let (mut frame, mut dir) = (state.frame, state.dir);
                for _ in 0..offset {
                    (frame, dir) = advance(rule.kind, rule.frames, frame, dir);
                }
                frame
            }
            AnimationKind::RandomGlobal => state.frame,
            AnimationKind::RandomPerTile => rng.random_range(0..rule.frames),
        };
        rule.code.wrapping_add(frame as u16)
    }
}
