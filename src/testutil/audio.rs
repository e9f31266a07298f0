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
use std::{error::Error, f32::consts::PI, fs::File, path::PathBuf, sync::Arc};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::samples::SampleBuffer;

/// Writes planar channels as an interleaved 32-bit float wav.
pub fn write_wav(
    path: PathBuf,
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let num_channels = channels.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::new(
        file,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = channels.iter().map(|c| c.len()).max().unwrap_or(0);
    for frame in 0..frames {
        for channel in &channels {
            writer.write_sample(channel.get(frame).copied().unwrap_or(0.0))?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// A sample whose frame `i` is `i / len`, so positions can be read back from values.
pub fn ramp(sample_rate: u32, len: usize) -> Arc<SampleBuffer> {
    Arc::new(SampleBuffer::new(
        (0..len).map(|i| i as f32 / len as f32).collect(),
        sample_rate,
    ))
}

/// A half-scale sine sample.
pub fn sine(sample_rate: u32, frequency: f32, len: usize) -> Arc<SampleBuffer> {
    Arc::new(SampleBuffer::new(
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect(),
        sample_rate,
    ))
}

/// Audio test utilities for validating results
pub mod audio_test_utils {
    /// Calculate RMS (Root Mean Square) of a signal
    pub fn calculate_rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }

        let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
        (sum_squares / samples.len() as f32).sqrt()
    }

    pub fn is_silent(samples: &[f32]) -> bool {
        samples.iter().all(|s| *s == 0.0)
    }
}
