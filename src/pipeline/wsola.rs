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
//! Waveform-similarity overlap-add tempo change.
//!
//! The input is cut into sequences that overlap by a short crossfade. For each
//! new sequence the seek window is searched for the offset whose start best
//! matches the tail of the previous sequence, which keeps the crossfade
//! phase-coherent. Advancing the input by `tempo` times the sequence hop
//! changes duration without changing pitch.

use super::fifo::SampleFifo;

/// Sequence and seek lengths follow the tempo when set to zero.
pub(crate) const AUTO: u32 = 0;

pub(crate) const DEFAULT_OVERLAP_MS: u32 = 8;

/// Lowest tempo the algorithm runs at. Slower requests are treated as this.
pub(crate) const MIN_TEMPO: f64 = 0.05;

pub(crate) const MAX_TEMPO: f64 = 4.0;

// Automatic sequence and seek lengths are interpolated between these tempo
// points and clamped at the ends.
const AUTO_TEMPO_LOW: f64 = 0.5;
const AUTO_TEMPO_HIGH: f64 = 2.0;
const AUTO_SEQUENCE_AT_LOW: f64 = 90.0;
const AUTO_SEQUENCE_AT_HIGH: f64 = 40.0;
const AUTO_SEEK_AT_LOW: f64 = 20.0;
const AUTO_SEEK_AT_HIGH: f64 = 15.0;

/// Smallest crossfade in frames.
const MIN_OVERLAP: usize = 16;

/// Coarse step of the quick seek.
const QUICK_SEEK_STEP: usize = 4;

/// Sequence, seek window and overlap lengths in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Parameters {
    pub(crate) sequence_ms: u32,
    pub(crate) seek_window_ms: u32,
    pub(crate) overlap_ms: u32,
}

impl Parameters {
    pub(crate) const fn new(sequence_ms: u32, seek_window_ms: u32, overlap_ms: u32) -> Parameters {
        Parameters {
            sequence_ms,
            seek_window_ms,
            overlap_ms,
        }
    }
}

fn ms_to_frames(sample_rate: u32, ms: f64) -> usize {
    (sample_rate as f64 * ms / 1000.0).round() as usize
}

fn interpolate(tempo: f64, at_low: f64, at_high: f64) -> f64 {
    let k = (at_high - at_low) / (AUTO_TEMPO_HIGH - AUTO_TEMPO_LOW);
    let c = at_low - k * AUTO_TEMPO_LOW;
    (c + k * tempo).clamp(at_high.min(at_low), at_high.max(at_low))
}

pub(crate) struct Wsola {
    sample_rate: u32,
    block_size: usize,
    tempo: f64,
    parameters: Parameters,
    sequence_len: usize,
    seek_len: usize,
    overlap_len: usize,
    nominal_skip: f64,
    skip_fract: f64,
    sample_req: usize,
    input: SampleFifo,
    output: SampleFifo,
    mid: Vec<f32>,
    beginning: bool,
}

impl Wsola {
    /// Reserves buffers for the largest settings at this sample rate.
    pub(crate) fn new(sample_rate: u32, block_size: usize) -> Wsola {
        let max_sequence = ms_to_frames(sample_rate, AUTO_SEQUENCE_AT_LOW);
        let max_seek = ms_to_frames(sample_rate, AUTO_SEEK_AT_LOW);
        let max_overlap = ms_to_frames(sample_rate, DEFAULT_OVERLAP_MS as f64).max(MIN_OVERLAP);
        let max_req = (MAX_TEMPO * max_sequence as f64).ceil() as usize + max_overlap + max_seek;

        let mut wsola = Wsola {
            sample_rate,
            block_size,
            tempo: 1.0,
            parameters: Parameters::new(AUTO, AUTO, DEFAULT_OVERLAP_MS),
            sequence_len: 0,
            seek_len: 0,
            overlap_len: 0,
            nominal_skip: 0.0,
            skip_fract: 0.0,
            sample_req: 0,
            input: SampleFifo::with_capacity(max_req + 2 * block_size),
            output: SampleFifo::with_capacity(2 * (block_size + max_sequence)),
            mid: Vec::with_capacity(max_overlap),
            beginning: true,
        };
        wsola.update();
        wsola
    }

    pub(crate) fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo.clamp(MIN_TEMPO, MAX_TEMPO);
        self.update();
    }

    pub(crate) fn set_parameters(&mut self, sample_rate: u32, parameters: Parameters) {
        self.sample_rate = sample_rate;
        self.parameters = parameters;
        self.update();
    }

    fn update(&mut self) {
        let sequence_ms = match self.parameters.sequence_ms {
            AUTO => interpolate(self.tempo, AUTO_SEQUENCE_AT_LOW, AUTO_SEQUENCE_AT_HIGH),
            ms => ms as f64,
        };
        let seek_ms = match self.parameters.seek_window_ms {
            AUTO => interpolate(self.tempo, AUTO_SEEK_AT_LOW, AUTO_SEEK_AT_HIGH),
            ms => ms as f64,
        };

        let overlap_len =
            ms_to_frames(self.sample_rate, self.parameters.overlap_ms as f64).max(MIN_OVERLAP);
        if overlap_len != self.overlap_len {
            self.overlap_len = overlap_len;
            self.mid.clear();
            self.mid.resize(overlap_len, 0.0);
        }
        self.sequence_len = ms_to_frames(self.sample_rate, sequence_ms).max(2 * self.overlap_len);
        self.seek_len = ms_to_frames(self.sample_rate, seek_ms).max(1);

        self.nominal_skip = self.tempo * (self.sequence_len - self.overlap_len) as f64;
        let skip = (self.nominal_skip + 0.5) as usize;
        self.sample_req = (skip + self.overlap_len).max(self.sequence_len) + self.seek_len;
    }

    /// Frames of output ready to read.
    pub(crate) fn available(&self) -> usize {
        self.output.len()
    }

    pub(crate) fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
        self.mid.iter_mut().for_each(|s| *s = 0.0);
        self.skip_fract = 0.0;
        self.beginning = true;
    }

    pub(crate) fn put(&mut self, frames: &[f32]) {
        self.input.push_slice(frames);
        self.process();
    }

    pub(crate) fn put_silence(&mut self, count: usize) {
        self.input.push_silence(count);
        self.process();
    }

    pub(crate) fn receive(&mut self, out: &mut [f32]) -> usize {
        let count = self.output.read_into(out);
        // Consuming output may let buffered input produce more.
        self.process();
        count
    }

    /// Runs whole sequences while there is enough input and the output is
    /// short of a block.
    fn process(&mut self) {
        while self.input.len() >= self.sample_req && self.output.len() < self.block_size {
            self.step();
        }
    }

    fn step(&mut self) {
        let overlap = self.overlap_len;
        let offset = if self.beginning {
            0
        } else {
            self.seek_best_offset()
        };

        let input = self.input.as_slice();
        let segment = &input[offset..offset + self.sequence_len];

        if self.beginning {
            self.output.push_slice(&segment[..overlap]);
        } else {
            let scale = 1.0 / overlap as f32;
            for i in 0..overlap {
                let t = i as f32 * scale;
                let mixed = self.mid[i] * (1.0 - t) + segment[i] * t;
                self.output.push_slice(&[mixed]);
            }
        }

        let body = self.sequence_len - 2 * overlap;
        self.output.push_slice(&segment[overlap..overlap + body]);
        self.mid
            .copy_from_slice(&segment[self.sequence_len - overlap..self.sequence_len]);

        self.skip_fract += self.nominal_skip;
        let skip = self.skip_fract as usize;
        self.skip_fract -= skip as f64;
        self.input.consume(skip);
        self.beginning = false;
    }

    /// Normalized cross-correlation between the saved tail and the input at `offset`.
    fn correlation(&self, offset: usize) -> f64 {
        let candidate = &self.input.as_slice()[offset..offset + self.overlap_len];
        let mut correlation = 0.0f64;
        let mut norm = 0.0f64;
        for (m, c) in self.mid.iter().zip(candidate) {
            correlation += (*m as f64) * (*c as f64);
            norm += (*c as f64) * (*c as f64);
        }
        if norm < 1e-12 {
            return 0.0;
        }
        correlation / norm.sqrt()
    }

    /// Coarse scan of the seek window followed by a fine scan around the best hit.
    fn seek_best_offset(&self) -> usize {
        let mut best = 0;
        let mut best_correlation = f64::MIN;

        let mut offset = 0;
        while offset < self.seek_len {
            let correlation = self.correlation(offset);
            if correlation > best_correlation {
                best_correlation = correlation;
                best = offset;
            }
            offset += QUICK_SEEK_STEP;
        }

        let start = best.saturating_sub(QUICK_SEEK_STEP - 1);
        let end = (best + QUICK_SEEK_STEP).min(self.seek_len);
        for offset in start..end {
            let correlation = self.correlation(offset);
            if correlation > best_correlation {
                best_correlation = correlation;
                best = offset;
            }
        }
        best
    }
}
