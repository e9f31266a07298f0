// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Amplitude envelope for a single voice.
//!
//! Attack and decay segments are parabolas evaluated by forward differencing:
//! each sample adds `slope` to the amplitude and `curve` to the slope. Both
//! segments end with zero slope so transitions don't click.

use serde::{Deserialize, Serialize};

use super::range::{seconds_to_frames, Range};

/// Soft start attack time in seconds.
pub const ATTACK: Range = Range::new(0.0, 0.001, 0.001);

/// Decay time in seconds.
pub const DECAY: Range = Range::new(0.0, 2.0, 2.0);

/// How a voice releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayType {
    /// Sustains until silenced; note off is ignored.
    #[default]
    Infinite,
    /// Starts decaying as soon as the note is triggered.
    Trigger,
    /// Sustains while the note is held, decays on note off.
    Gate,
}

impl DecayType {
    pub const ALL: [DecayType; 3] = [DecayType::Infinite, DecayType::Trigger, DecayType::Gate];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Off,
    Attack,
    Decay,
    Sustain,
}

#[derive(Debug, Clone, Copy, Default)]
struct Segment {
    amplitude: f64,
    slope: f64,
    curve: f64,
}

impl Segment {
    fn attack(length: usize) -> Segment {
        let (slope, curve) = Self::shape(length);
        Segment {
            amplitude: 0.0,
            slope,
            curve,
        }
    }

    fn decay(length: usize) -> Segment {
        let (slope, curve) = Self::shape(length);
        Segment {
            amplitude: 1.0,
            slope: slope + length as f64 * curve,
            curve,
        }
    }

    fn shape(length: usize) -> (f64, f64) {
        if length == 0 {
            return (0.0, 0.0);
        }
        let rdur = 1.0 / (2.0 * length as f64);
        let rdur2 = rdur * rdur;
        (4.0 * (rdur - rdur2), -8.0 * rdur2)
    }
}

/// The envelope state machine.
#[derive(Debug, Clone)]
pub struct Envelope {
    sample_rate: u32,
    state: State,
    decay_type: DecayType,
    soft_start: bool,
    attack: f32,
    decay: f32,
    attack_frames: usize,
    decay_frames: usize,
    offset: usize,
    segment: Segment,
}

impl Envelope {
    pub fn new(sample_rate: u32) -> Envelope {
        let mut envelope = Envelope {
            sample_rate,
            state: State::Off,
            decay_type: DecayType::default(),
            soft_start: false,
            attack: ATTACK.default,
            decay: DECAY.default,
            attack_frames: 0,
            decay_frames: 0,
            offset: 0,
            segment: Segment::default(),
        };
        envelope.attack_frames = seconds_to_frames(sample_rate, envelope.attack);
        envelope.decay_frames = seconds_to_frames(sample_rate, envelope.decay);
        envelope
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Off
    }

    pub fn decay_type(&self) -> DecayType {
        self.decay_type
    }

    pub fn set_decay_type(&mut self, decay_type: DecayType) {
        self.decay_type = decay_type;
    }

    pub fn soft_start(&self) -> bool {
        self.soft_start
    }

    pub fn set_soft_start(&mut self, soft_start: bool) {
        self.soft_start = soft_start;
    }

    pub fn attack(&self) -> f32 {
        self.attack
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = ATTACK.clamp(seconds);
        self.attack_frames = seconds_to_frames(self.sample_rate, self.attack);
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Sets the decay time. A decay already in progress keeps its shape and
    /// ends early if it is already past the new length.
    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = DECAY.clamp(seconds);
        self.decay_frames = seconds_to_frames(self.sample_rate, self.decay);
    }

    /// Hard retrigger from any state.
    pub fn note_on(&mut self) {
        self.offset = 0;
        if self.soft_start && self.attack_frames > 0 {
            self.segment = Segment::attack(self.attack_frames);
            self.state = State::Attack;
        } else if self.decay_type == DecayType::Trigger {
            self.start_decay();
        } else {
            self.state = State::Sustain;
        }
    }

    pub fn note_off(&mut self) {
        if self.state == State::Sustain && self.decay_type != DecayType::Infinite {
            self.start_decay();
        }
    }

    /// Stops immediately with no release.
    pub fn silence(&mut self) {
        if self.state != State::Off {
            self.state = State::Off;
            self.offset = 0;
        }
    }

    fn start_decay(&mut self) {
        self.offset = 0;
        self.segment = Segment::decay(self.decay_frames);
        self.state = State::Decay;
    }

    /// Applies the envelope to a block in place.
    pub fn filter(&mut self, block: &mut [f32]) {
        let mut position = 0;
        loop {
            match self.state {
                State::Off => {
                    block[position..].fill(0.0);
                    return;
                }
                State::Sustain => return,
                State::Attack => {
                    position = self.advance(block, position, self.attack_frames);
                    if self.offset < self.attack_frames {
                        return;
                    }
                    self.offset = 0;
                    if self.decay_type == DecayType::Trigger {
                        self.start_decay();
                    } else {
                        self.state = State::Sustain;
                    }
                }
                State::Decay => {
                    position = self.advance(block, position, self.decay_frames);
                    if self.offset < self.decay_frames {
                        return;
                    }
                    self.offset = 0;
                    self.state = State::Off;
                }
            }
        }
    }

    /// Steps the current segment through the block starting at `position`.
    /// Returns the position where the segment stopped.
    fn advance(&mut self, block: &mut [f32], position: usize, length: usize) -> usize {
        // A segment shortened mid-flight is complete.
        let steps = length
            .saturating_sub(self.offset)
            .min(block.len() - position);
        let Segment {
            mut amplitude,
            mut slope,
            curve,
        } = self.segment;
        for sample in &mut block[position..position + steps] {
            *sample = (*sample as f64 * amplitude) as f32;
            amplitude += slope;
            slope += curve;
        }
        self.segment = Segment {
            amplitude,
            slope,
            curve,
        };
        self.offset += steps;
        position + steps
    }
}
