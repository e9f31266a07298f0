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
use serde::{Deserialize, Serialize};

use super::wsola::{Parameters, Wsola, AUTO, DEFAULT_OVERLAP_MS};
use super::PullSource;
use crate::dsp::range::Range;

/// Tempo multiplier. 1 leaves the sample untouched.
pub const STRETCH: Range = Range::new(0.0, 4.0, 1.0);

/// Upper bound on silence fed to flush the algorithm after the source ends.
const MAX_FLUSH_FRAMES: usize = 8192;

const BYPASS_EPSILON: f32 = 1e-10;

/// Quality presets for the stretch algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StretchType {
    /// Sequence and seek lengths follow the tempo.
    #[default]
    Auto,
    Speech,
    ModeA,
    ModeB,
}

impl StretchType {
    pub const ALL: [StretchType; 4] = [
        StretchType::Auto,
        StretchType::Speech,
        StretchType::ModeA,
        StretchType::ModeB,
    ];

    pub(crate) fn parameters(self) -> Parameters {
        match self {
            StretchType::Auto => Parameters::new(AUTO, AUTO, DEFAULT_OVERLAP_MS),
            StretchType::Speech => Parameters::new(40, 15, 8),
            StretchType::ModeA => Parameters::new(28, 14, 7),
            StretchType::ModeB => Parameters::new(24, 12, 6),
        }
    }
}

/// Changes tempo without changing pitch.
pub struct TimeStretch<S: PullSource> {
    source: S,
    wsola: Wsola,
    stretch: f32,
    stretch_type: StretchType,
    scratch: Vec<f32>,
    flush_blocks: usize,
    flushed: bool,
}

impl<S: PullSource> TimeStretch<S> {
    pub fn new(source: S, block_size: usize) -> TimeStretch<S> {
        let wsola = Wsola::new(source.sample_rate(), block_size);
        TimeStretch {
            source,
            wsola,
            stretch: STRETCH.default,
            stretch_type: StretchType::default(),
            scratch: vec![0.0; block_size],
            flush_blocks: MAX_FLUSH_FRAMES / block_size.max(1),
            flushed: true,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn stretch(&self) -> f32 {
        self.stretch
    }

    pub fn set_stretch(&mut self, stretch: f32) {
        self.stretch = STRETCH.clamp(stretch);
        self.wsola.set_tempo(self.stretch as f64);
    }

    pub fn stretch_type(&self) -> StretchType {
        self.stretch_type
    }

    /// Takes effect on the next reset.
    pub fn set_stretch_type(&mut self, stretch_type: StretchType) {
        self.stretch_type = stretch_type;
    }

    fn is_bypassed(&self) -> bool {
        (self.stretch - STRETCH.default).abs() < BYPASS_EPSILON
    }
}

impl<S: PullSource> PullSource for TimeStretch<S> {
    fn receive(&mut self, out: &mut [f32]) -> usize {
        if self.is_bypassed() {
            self.wsola.clear();
            return self.source.receive(out);
        }

        let block = out.len().min(self.scratch.len());
        let mut received = 0;
        while self.wsola.available() < block {
            received = self.source.receive(&mut self.scratch[..block]);
            if received == 0 {
                break;
            }
            self.wsola.put(&self.scratch[..received]);
        }

        if received == 0 && !self.flushed && self.wsola.available() < block {
            let last = self.wsola.available();
            for _ in 0..self.flush_blocks {
                if self.wsola.available() != last {
                    break;
                }
                self.wsola.put_silence(block);
            }
            self.flushed = true;
        }

        self.wsola.receive(&mut out[..block])
    }

    fn reset(&mut self) {
        self.wsola.clear();
        self.source.reset();
        // Nothing to stretch means nothing to flush.
        self.flushed = self.source.is_finished();
        self.wsola
            .set_parameters(self.source.sample_rate(), self.stretch_type.parameters());
    }

    fn is_finished(&self) -> bool {
        if self.is_bypassed() {
            return self.source.is_finished();
        }
        self.flushed && self.wsola.available() == 0
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::WaveSource;
    use crate::testutil::{ramp, sine};

    const RATE: u32 = 44100;
    const BLOCK: usize = 128;

    fn drain<S: PullSource>(stage: &mut S) -> usize {
        let mut out = vec![0.0; BLOCK];
        let mut total = 0;
        for _ in 0..10_000 {
            let count = stage.receive(&mut out);
            if count == 0 {
                break;
            }
            total += count;
        }
        total
    }

    #[test]
    fn unity_is_a_passthrough() {
        let mut stretch = TimeStretch::new(WaveSource::new(Some(ramp(RATE, 1000)), RATE), BLOCK);
        stretch.reset();
        let mut out = vec![0.0; BLOCK];
        assert_eq!(stretch.receive(&mut out), BLOCK);
        assert_eq!(out[10], 10.0 / 1000.0);
    }

    #[test]
    fn half_speed_roughly_doubles_length() {
        let sample = sine(RATE, 440.0, RATE as usize);
        let mut stretch = TimeStretch::new(WaveSource::new(Some(sample), RATE), BLOCK);
        stretch.set_stretch(0.5);
        stretch.reset();
        let total = drain(&mut stretch);
        assert!(total as f64 > 1.7 * RATE as f64, "produced {}", total);
        assert!(stretch.is_finished());
    }

    #[test]
    fn double_speed_roughly_halves_length() {
        let sample = sine(RATE, 440.0, RATE as usize);
        let mut stretch = TimeStretch::new(WaveSource::new(Some(sample), RATE), BLOCK);
        stretch.set_stretch(2.0);
        stretch.reset();
        let total = drain(&mut stretch);
        assert!((total as f64) < 0.7 * RATE as f64, "produced {}", total);
    }

    #[test]
    fn reset_restarts_the_note() {
        let sample = sine(RATE, 440.0, RATE as usize / 4);
        let mut stretch = TimeStretch::new(WaveSource::new(Some(sample), RATE), BLOCK);
        stretch.set_stretch(1.5);
        stretch.reset();
        let first = drain(&mut stretch);
        stretch.reset();
        let second = drain(&mut stretch);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_source_is_finished_after_reset() {
        let mut stretch = TimeStretch::new(WaveSource::new(None, RATE), BLOCK);
        stretch.set_stretch(2.0);
        stretch.reset();
        assert!(stretch.is_finished());
        assert_eq!(drain(&mut stretch), 0);
    }

    #[test]
    fn stretch_clamps() {
        let mut stretch = TimeStretch::new(WaveSource::new(None, RATE), BLOCK);
        stretch.set_stretch(9.0);
        assert_eq!(stretch.stretch(), 4.0);
        stretch.set_stretch(-1.0);
        assert_eq!(stretch.stretch(), 0.0);
    }
}
