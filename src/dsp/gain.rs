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

pub const VOLUME: Range = Range::new(0.0, 4.0, 1.0);

/// Output level of a voice.
#[derive(Debug, Clone)]
pub struct Gain {
    volume: f32,
}

impl Default for Gain {
    fn default() -> Self {
        Gain {
            volume: VOLUME.default,
        }
    }
}

impl Gain {
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = VOLUME.clamp(volume);
    }

    pub fn filter(&self, block: &mut [f32]) {
        if self.volume == 1.0 {
            return;
        }
        for sample in block.iter_mut() {
            *sample *= self.volume;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_and_clamps() {
        let mut gain = Gain::default();
        gain.set_volume(2.0);
        let mut block = vec![0.25, -0.5];
        gain.filter(&mut block);
        assert_eq!(block, vec![0.5, -1.0]);

        gain.set_volume(9.0);
        assert_eq!(gain.volume(), 4.0);
        gain.set_volume(-1.0);
        assert_eq!(gain.volume(), 0.0);
    }
}
