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
use super::range::Range;

pub const PANNING: Range = Range::new(-1.0, 1.0, 0.0);

/// Stereo placement. Center leaves both sides at unity; hard right doubles the
/// right side and silences the left.
#[derive(Debug, Clone)]
pub struct Panner {
    panning: f32,
    mix_left: f32,
    mix_right: f32,
}

impl Default for Panner {
    fn default() -> Self {
        let mut panner = Panner {
            panning: 0.0,
            mix_left: 1.0,
            mix_right: 1.0,
        };
        panner.set_panning(PANNING.default);
        panner
    }
}

impl Panner {
    pub fn panning(&self) -> f32 {
        self.panning
    }

    pub fn set_panning(&mut self, panning: f32) {
        self.panning = PANNING.clamp(panning);
        self.mix_left = 1.0 - self.panning;
        self.mix_right = 1.0 + self.panning;
    }

    pub fn mix_left(&self) -> f32 {
        self.mix_left
    }

    pub fn mix_right(&self) -> f32 {
        self.mix_right
    }

    /// Accumulates a mono block into the stereo pair.
    pub fn mix_into(&self, block: &[f32], left: &mut [f32], right: &mut [f32]) {
        for ((sample, l), r) in block.iter().zip(left.iter_mut()).zip(right.iter_mut()) {
            *l += sample * self.mix_left;
            *r += sample * self.mix_right;
        }
    }
}
