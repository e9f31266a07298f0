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
//! Per-trigger parameter modulation from note velocity and randomness.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::range::Range;

/// Sensitivity and randomness amounts.
pub const AMOUNT: Range = Range::new(0.0, 1.0, 0.0);

const MAX_VELOCITY: f32 = 127.0;

/// Deterministic random source. The engine seeds one and forks a child for
/// each voice so tests can reproduce every draw.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> RandomSource {
        RandomSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> RandomSource {
        RandomSource {
            rng: StdRng::from_entropy(),
        }
    }

    /// Derives an independent source from this one.
    pub fn fork(&mut self) -> RandomSource {
        RandomSource::seeded(self.rng.gen())
    }

    /// Uniform draw in [-1, 1).
    pub fn bipolar(&mut self) -> f32 {
        2.0 * self.rng.gen::<f32>() - 1.0
    }
}

/// Damps a value at low velocities.
#[derive(Debug, Clone, Default)]
pub struct Velocity {
    sensitivity: f32,
    damp: f32,
}

impl Velocity {
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = AMOUNT.clamp(sensitivity);
    }

    pub fn note_on(&mut self, velocity: u8) {
        let velocity = (velocity as f32).min(MAX_VELOCITY);
        self.damp = (1.0 - velocity / MAX_VELOCITY) * self.sensitivity;
    }

    #[inline]
    pub fn modulate(&self, value: f32) -> f32 {
        value - value * self.damp
    }
}

/// Velocity damping plus a random offset drawn on every trigger.
#[derive(Debug, Clone)]
pub struct VelocityRandom {
    velocity: Velocity,
    random: f32,
    half_range: f32,
    offset: f32,
}

impl VelocityRandom {
    /// Creates a unit whose random offsets span half of `range` either way.
    pub fn new(range: Range) -> VelocityRandom {
        VelocityRandom {
            velocity: Velocity::default(),
            random: AMOUNT.default,
            half_range: range.half_range(),
            offset: 0.0,
        }
    }

    pub fn sensitivity(&self) -> f32 {
        self.velocity.sensitivity()
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.velocity.set_sensitivity(sensitivity);
    }

    pub fn random(&self) -> f32 {
        self.random
    }

    pub fn set_random(&mut self, random: f32) {
        self.random = AMOUNT.clamp(random);
    }

    /// The range depends on the sample rate for the filter cutoff.
    pub fn set_range(&mut self, range: Range) {
        self.half_range = range.half_range();
    }

    pub fn note_on(&mut self, velocity: u8, random: &mut RandomSource) {
        self.velocity.note_on(velocity);
        self.offset = random.bipolar();
    }

    #[inline]
    pub fn modulate(&self, value: f32) -> f32 {
        self.velocity.modulate(value) + self.half_range * self.random * self.offset
    }
}
