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
//! The pitch and time pipeline for a voice.
//!
//! Stages are pull sources stacked on top of each other:
//! `Transposer<TimeStretch<WaveSource>>`. The outermost stage is pulled once
//! per block by the voice; each stage pulls from the one below as needed.
//! Every buffer a stage uses is allocated when the pipeline is built, so
//! pulling and resetting are safe on the real-time thread.

use std::sync::Arc;

mod fifo;
pub mod stretch;
pub mod transposer;
pub mod wave;
mod wsola;

pub use stretch::{StretchType, TimeStretch};
pub use transposer::{ResampleQuality, Transposer};
pub use wave::WaveSource;

use crate::samples::SampleBuffer;

/// Error types for pipeline construction.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Unable to create resampler for {source_rate}Hz -> {output_rate}Hz: {message}")]
    Resampler {
        source_rate: u32,
        output_rate: u32,
        message: String,
    },

    #[error("Block size must be greater than zero")]
    EmptyBlock,
}

/// A stage that produces mono frames on demand.
pub trait PullSource: Send {
    /// Fills the front of `out` and returns the number of frames written.
    /// Fewer than `out.len()` frames means the stage is running dry; zero
    /// means it is exhausted.
    fn receive(&mut self, out: &mut [f32]) -> usize;

    /// Discards all buffered state and rewinds for a new trigger.
    fn reset(&mut self);

    fn is_finished(&self) -> bool;

    fn sample_rate(&self) -> u32;
}

impl PullSource for Box<dyn PullSource> {
    fn receive(&mut self, out: &mut [f32]) -> usize {
        (**self).receive(out)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

/// The full chain a voice pulls from.
pub type VoicePipeline = Transposer<TimeStretch<WaveSource>>;

/// Builds a voice pipeline around an optional sample. Allocates; call it off
/// the real-time thread.
pub fn build(
    sample: Option<Arc<SampleBuffer>>,
    output_rate: u32,
    block_size: usize,
    quality: ResampleQuality,
) -> Result<VoicePipeline, PipelineError> {
    if block_size == 0 {
        return Err(PipelineError::EmptyBlock);
    }
    let wave = WaveSource::new(sample, output_rate);
    let stretch = TimeStretch::new(wave, block_size);
    Transposer::new(stretch, output_rate, block_size, quality)
}
