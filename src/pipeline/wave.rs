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
use std::sync::Arc;

use super::PullSource;
use crate::dsp::range::{seconds_to_frames, Range};
use crate::samples::SampleBuffer;

/// Start offset into the sample in seconds.
pub const START: Range = Range::new(0.0, 0.1, 0.0);

/// Reads frames of a loaded sample from a start offset onwards.
///
/// With no sample loaded the source is permanently finished and reports the
/// output rate, so the stages above it stay in bypass.
pub struct WaveSource {
    sample: Option<Arc<SampleBuffer>>,
    output_rate: u32,
    start_time: f32,
    start_frame: usize,
    position: usize,
}

impl WaveSource {
    pub fn new(sample: Option<Arc<SampleBuffer>>, output_rate: u32) -> WaveSource {
        let mut source = WaveSource {
            sample,
            output_rate,
            start_time: START.default,
            start_frame: 0,
            position: 0,
        };
        source.set_start_time(START.default);
        source.position = source.len();
        source
    }

    pub fn sample(&self) -> Option<&Arc<SampleBuffer>> {
        self.sample.as_ref()
    }

    fn len(&self) -> usize {
        self.sample.as_ref().map(|s| s.len()).unwrap_or(0)
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    /// Sets the start offset, clamped to the range and to the sample's length.
    /// Takes effect on the next reset.
    pub fn set_start_time(&mut self, seconds: f32) {
        let seconds = START.clamp(seconds);
        let Some(sample) = self.sample.as_ref() else {
            self.start_time = seconds;
            self.start_frame = 0;
            return;
        };

        let frames = seconds_to_frames(sample.sample_rate(), seconds);
        if frames > sample.len() {
            self.start_frame = sample.len();
            self.start_time = sample.duration_seconds();
        } else {
            self.start_frame = frames;
            self.start_time = seconds;
        }
    }
}

impl PullSource for WaveSource {
    fn receive(&mut self, out: &mut [f32]) -> usize {
        let Some(sample) = self.sample.as_ref() else {
            return 0;
        };
        let frames = sample.frames();
        let count = out.len().min(frames.len().saturating_sub(self.position));
        out[..count].copy_from_slice(&frames[self.position..self.position + count]);
        self.position += count;
        count
    }

    fn reset(&mut self) {
        self.position = self.start_frame;
    }

    fn is_finished(&self) -> bool {
        self.position >= self.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample
            .as_ref()
            .map(|s| s.sample_rate())
            .unwrap_or(self.output_rate)
    }
}
