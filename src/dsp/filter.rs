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
//! Biquad filter bank.
//!
//! Each voice carries one biquad per response type so that switching types
//! keeps the settings of the others. The input/output history is shared and
//! kept warm while the filter is bypassed, so enabling it mid-note doesn't
//! produce a step.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::range::Range;

/// Lowest cutoff frequency in Hz. The upper bound is the Nyquist frequency.
pub const MIN_FREQUENCY: f32 = 30.0;

pub const RESONANCE: Range = Range::new(0.5, 1.0, 1.0);

/// Cutoff range at the given sample rate.
pub fn frequency_range(sample_rate: u32) -> Range {
    Range::new(MIN_FREQUENCY, sample_rate as f32 / 2.0, MIN_FREQUENCY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    #[default]
    LowPass,
    HighPass,
    /// Band-pass with constant skirt gain.
    BandPassSkirt,
    /// Band-pass with constant 0 dB peak gain.
    BandPassPeak,
    Notch,
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPassSkirt,
        FilterType::BandPassPeak,
        FilterType::Notch,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Normalized biquad coefficients (`a0` divided out).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Coefficients {
    /// Computes coefficients for the given type. Returns the normalized set and `a0`.
    pub fn compute(
        filter_type: FilterType,
        frequency: f32,
        resonance: f32,
        sample_rate: u32,
    ) -> (Coefficients, f64) {
        let q = resonance as f64;
        let w0 = 2.0 * PI * frequency as f64 / sample_rate as f64;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos;
        let a2 = 1.0 - alpha;

        let (b0, b1, b2) = match filter_type {
            FilterType::LowPass => ((1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0),
            FilterType::HighPass => ((1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0),
            FilterType::BandPassSkirt => (q * alpha, 0.0, -q * alpha),
            FilterType::BandPassPeak => (alpha, 0.0, -alpha),
            FilterType::Notch => (1.0, -2.0 * cos, 1.0),
        };

        (
            Coefficients {
                b0: b0 / a0,
                b1: b1 / a0,
                b2: b2 / a0,
                a1: a1 / a0,
                a2: a2 / a0,
            },
            a0,
        )
    }

    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }
}

/// One response type's settings. Coefficients are recomputed lazily when dirty.
#[derive(Debug, Clone)]
struct Biquad {
    filter_type: FilterType,
    frequency: f32,
    resonance: f32,
    coefficients: Coefficients,
    dirty: bool,
}

impl Biquad {
    fn new(filter_type: FilterType) -> Biquad {
        Biquad {
            filter_type,
            frequency: MIN_FREQUENCY,
            resonance: RESONANCE.default,
            coefficients: Coefficients::default(),
            dirty: true,
        }
    }

    fn coefficients(&mut self, sample_rate: u32) -> Coefficients {
        if self.dirty {
            (self.coefficients, _) =
                Coefficients::compute(self.filter_type, self.frequency, self.resonance, sample_rate);
            self.dirty = false;
        }
        self.coefficients
    }
}

/// Direct form I history indexed by a rolling offset.
#[derive(Debug, Clone, Default)]
struct History {
    x: [f64; 3],
    y: [f64; 3],
    offset: usize,
}

impl History {
    #[inline]
    fn process(&mut self, c: &Coefficients, input: f32) -> f32 {
        let s0 = (self.offset + 2) % 3;
        let s1 = (self.offset + 1) % 3;
        let s2 = self.offset % 3;
        self.x[s0] = input as f64;
        self.y[s0] = c.b0 * self.x[s0] + c.b1 * self.x[s1] + c.b2 * self.x[s2]
            - c.a1 * self.y[s1]
            - c.a2 * self.y[s2];
        self.offset = (self.offset + 1) % 3;
        self.y[s0] as f32
    }

    /// Records a sample as though it passed through unchanged.
    #[inline]
    fn pass(&mut self, input: f32) {
        let s0 = (self.offset + 2) % 3;
        self.x[s0] = input as f64;
        self.y[s0] = input as f64;
        self.offset = (self.offset + 1) % 3;
    }
}

#[derive(Debug, Clone)]
pub struct FilterBank {
    sample_rate: u32,
    biquads: [Biquad; 5],
    filter_type: FilterType,
    active: bool,
    history: History,
}

impl FilterBank {
    pub fn new(sample_rate: u32) -> FilterBank {
        FilterBank {
            sample_rate,
            biquads: FilterType::ALL.map(Biquad::new),
            filter_type: FilterType::default(),
            active: false,
            history: History::default(),
        }
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Frequency held by the selected type.
    pub fn frequency(&self) -> f32 {
        self.biquads[self.filter_type.index()].frequency
    }

    pub fn resonance(&self) -> f32 {
        self.biquads[self.filter_type.index()].resonance
    }

    /// Sets the cutoff of the selected type, clamped to [30 Hz, Nyquist].
    pub fn set_frequency(&mut self, frequency: f32) {
        let frequency = if frequency.is_nan() {
            MIN_FREQUENCY
        } else {
            frequency.clamp(MIN_FREQUENCY, self.nyquist())
        };
        let biquad = &mut self.biquads[self.filter_type.index()];
        if biquad.frequency != frequency {
            biquad.frequency = frequency;
            biquad.dirty = true;
        }
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        let resonance = RESONANCE.clamp(resonance);
        let biquad = &mut self.biquads[self.filter_type.index()];
        if biquad.resonance != resonance {
            biquad.resonance = resonance;
            biquad.dirty = true;
        }
    }

    /// Filters a block in place, or passes it through while keeping the
    /// history warm when inactive.
    pub fn filter(&mut self, block: &mut [f32]) {
        if !self.active {
            let start = block.len().saturating_sub(3);
            for sample in &block[start..] {
                self.history.pass(*sample);
            }
            return;
        }

        let coefficients = self.biquads[self.filter_type.index()].coefficients(self.sample_rate);
        for sample in block.iter_mut() {
            *sample = self.history.process(&coefficients, *sample);
        }
    }
}
