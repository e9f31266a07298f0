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

pub const DRIVE: Range = Range::new(1.0, 10.0, 1.0);

/// Small bias so the shaper produces even harmonics.
const DC: f32 = -0.001;

/// Cubic soft clipper.
#[derive(Debug, Clone)]
pub struct Overdrive {
    drive: f32,
    active: bool,
}

impl Default for Overdrive {
    fn default() -> Self {
        Overdrive {
            drive: DRIVE.default,
            active: false,
        }
    }
}

impl Overdrive {
    pub fn drive(&self) -> f32 {
        self.drive
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = DRIVE.clamp(drive);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[inline]
    pub fn shape(drive: f32, sample: f32) -> f32 {
        let s = sample * drive + DC;
        if s <= -1.0 {
            -2.0 / 3.0
        } else if s >= 1.0 {
            2.0 / 3.0
        } else {
            s - s * s * s / 3.0
        }
    }

    pub fn filter(&self, block: &mut [f32]) {
        if !self.active {
            return;
        }
        for sample in block.iter_mut() {
            *sample = Self::shape(self.drive, *sample);
        }
    }
}
