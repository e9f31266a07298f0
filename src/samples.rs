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

//! Sample data for voices.
//!
//! Samples are decoded once on the control thread, mixed down to mono and
//! shared through an `Arc` so a voice pipeline can hold one without copying.

use std::time::Duration;

mod loader;

pub use loader::{LoadError, SampleLoader};

/// A decoded mono sample at its native rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    frames: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(frames: Vec<f32>, sample_rate: u32) -> SampleBuffer {
        SampleBuffer {
            frames,
            sample_rate,
        }
    }

    /// Averages interleaved channels down to one.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> SampleBuffer {
        if channels <= 1 {
            return SampleBuffer::new(samples.to_vec(), sample_rate);
        }
        let scale = 1.0 / channels as f32;
        let frames = samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect();
        SampleBuffer::new(frames, sample_rate)
    }

    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f32 {
        self.frames.len() as f32 / self.sample_rate as f32
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames.len() as f64 / self.sample_rate as f64)
    }

    pub fn memory_size(&self) -> usize {
        self.frames.len() * std::mem::size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixes_stereo_to_mono() {
        let buffer = SampleBuffer::from_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, 48000);
        assert_eq!(buffer.frames(), &[0.5, 0.5, 0.0]);
        assert_eq!(buffer.sample_rate(), 48000);
    }

    #[test]
    fn duration() {
        let buffer = SampleBuffer::new(vec![0.0; 22050], 44100);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
        assert_eq!(buffer.duration_seconds(), 0.5);
    }
}
