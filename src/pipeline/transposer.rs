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
use rubato::{FastFixedOut, PolynomialDegree, Resampler};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{PipelineError, PullSource};
use crate::dsp::range::Range;

/// Transposition in semitones.
pub const TRANSPOSE: Range = Range::new(-48.0, 48.0, 0.0);

const BYPASS_EPSILON: f64 = 1e-10;

/// Headroom for ratio changes relative to the sample rate ratio. Four octaves
/// either way is a factor of 16.
const MAX_RELATIVE_RATIO: f64 = 16.5;

/// Interpolation used by the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleQuality {
    Nearest,
    #[default]
    Linear,
    Cubic,
    Quintic,
    Septic,
}

impl From<ResampleQuality> for PolynomialDegree {
    fn from(quality: ResampleQuality) -> Self {
        match quality {
            ResampleQuality::Nearest => PolynomialDegree::Nearest,
            ResampleQuality::Linear => PolynomialDegree::Linear,
            ResampleQuality::Cubic => PolynomialDegree::Cubic,
            ResampleQuality::Quintic => PolynomialDegree::Quintic,
            ResampleQuality::Septic => PolynomialDegree::Septic,
        }
    }
}

/// Shifts pitch by resampling, and adapts the source rate to the output rate.
pub struct Transposer<S: PullSource> {
    source: S,
    resampler: FastFixedOut<f32>,
    output_rate: u32,
    transpose: f32,
    ratio: f64,
    /// Frames pulled from upstream that the resampler has not consumed yet.
    staging: Vec<f32>,
    staged: usize,
    output: Vec<f32>,
    source_done: bool,
    finished: bool,
}

impl<S: PullSource> Transposer<S> {
    pub fn new(
        source: S,
        output_rate: u32,
        block_size: usize,
        quality: ResampleQuality,
    ) -> Result<Transposer<S>, PipelineError> {
        let source_rate = source.sample_rate();
        let resampler = FastFixedOut::<f32>::new(
            output_rate as f64 / source_rate as f64,
            MAX_RELATIVE_RATIO,
            quality.into(),
            block_size,
            1,
        )
        .map_err(|e| PipelineError::Resampler {
            source_rate,
            output_rate,
            message: e.to_string(),
        })?;
        let staging = vec![0.0; resampler.input_frames_max()];

        let mut transposer = Transposer {
            source,
            resampler,
            output_rate,
            transpose: TRANSPOSE.default,
            ratio: 1.0,
            staging,
            staged: 0,
            output: vec![0.0; block_size],
            source_done: false,
            finished: true,
        };
        transposer.update_ratio();
        Ok(transposer)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn transpose(&self) -> f32 {
        self.transpose
    }

    pub fn set_transpose(&mut self, semitones: f32) {
        self.transpose = TRANSPOSE.clamp(semitones);
        self.update_ratio();
    }

    /// Output frames per source frame.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    fn update_ratio(&mut self) {
        let rate_ratio = self.output_rate as f64 / self.source.sample_rate() as f64;
        self.ratio = 2f64.powf(-self.transpose as f64 / 12.0) * rate_ratio;
        if !self.is_bypassed() {
            if let Err(e) = self.resampler.set_resample_ratio(self.ratio, false) {
                warn!(err = %e, ratio = self.ratio, "Unable to set resample ratio");
            }
        }
    }

    fn is_bypassed(&self) -> bool {
        (self.ratio - 1.0).abs() < BYPASS_EPSILON
    }

    fn resample(&mut self, out: &mut [f32]) -> usize {
        let needed = self.resampler.input_frames_next();
        while self.staged < needed && !self.source_done {
            let received = self.source.receive(&mut self.staging[self.staged..needed]);
            if received == 0 {
                self.source_done = true;
            }
            self.staged += received;
        }

        let result = if self.staged >= needed {
            self.resampler.process_into_buffer(
                &[&self.staging[..needed]],
                &mut [&mut self.output[..]],
                None,
            )
        } else if self.staged > 0 {
            self.resampler.process_partial_into_buffer(
                Some(&[&self.staging[..self.staged]]),
                &mut [&mut self.output[..]],
                None,
            )
        } else {
            return 0;
        };

        match result {
            Ok((consumed, produced)) => {
                let consumed = consumed.min(self.staged);
                self.staging.copy_within(consumed..self.staged, 0);
                self.staged -= consumed;
                if self.source_done && self.staged < needed {
                    // The partial call above consumed the tail.
                    self.staged = 0;
                }
                let count = produced.min(out.len());
                out[..count].copy_from_slice(&self.output[..count]);
                count
            }
            Err(e) => {
                warn!(err = %e, "Resampler failed, stopping voice");
                0
            }
        }
    }
}

impl<S: PullSource> PullSource for Transposer<S> {
    fn receive(&mut self, out: &mut [f32]) -> usize {
        if self.finished {
            return 0;
        }
        let count = if self.is_bypassed() {
            self.source.receive(out)
        } else {
            self.resample(out)
        };
        if count == 0 {
            self.finished = true;
        }
        count
    }

    fn reset(&mut self) {
        self.source_done = false;
        self.staged = 0;
        self.source.reset();
        self.finished = self.source.is_finished();
        self.resampler.reset();
        self.update_ratio();
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn sample_rate(&self) -> u32 {
        self.output_rate
    }
}
