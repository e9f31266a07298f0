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
//! Bounded parameter ranges and MIDI controller value conversions.
//!
//! Every parameter in the instrument is clamped into its range rather than
//! rejected, so a `Range` is the single place where bounds live.

/// Largest MIDI controller value.
pub const CONTROLLER_MAX: u8 = 127;

/// Controller value treated as the center detent of a bipolar control.
pub const CONTROLLER_CENTER: u8 = 63;

/// Largest positive pitch wheel value.
pub const PITCH_WHEEL_MAX: i16 = 8191;

/// Smallest pitch wheel value.
pub const PITCH_WHEEL_MIN: i16 = -8192;

/// An inclusive bound with a default value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32, default: f32) -> Range {
        Range { min, max, default }
    }

    /// Clamps the value into the range. NaN falls back to the default and
    /// infinities clamp to the nearest bound.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }

    /// Half the distance between the bounds, used as the randomization span.
    pub fn half_range(&self) -> f32 {
        (self.max - self.min) / 2.0
    }

    /// Returns the midpoint of the range.
    pub fn center(&self) -> f32 {
        (self.max + self.min) / 2.0
    }

    /// Maps a controller value linearly onto the range.
    pub fn from_controller(&self, value: u8) -> f32 {
        let value = value.min(CONTROLLER_MAX) as f32;
        (self.max - self.min) * value / CONTROLLER_MAX as f32 + self.min
    }

    /// Like `from_controller`, but the center detent lands exactly on the midpoint.
    pub fn from_controller_centered(&self, value: u8) -> f32 {
        if value == CONTROLLER_CENTER {
            self.center()
        } else {
            self.from_controller(value)
        }
    }

    /// Maps a signed pitch wheel value onto an offset spanning half the range
    /// in either direction.
    pub fn from_pitch_wheel(&self, pitch: i16) -> f32 {
        let pitch = pitch.clamp(PITCH_WHEEL_MIN, PITCH_WHEEL_MAX) as f32;
        let half = self.half_range();
        (pitch / PITCH_WHEEL_MAX as f32 * half).clamp(-half, half)
    }
}

/// Controller values at or above the midpoint switch a flag on.
#[inline]
pub fn controller_to_bool(value: u8) -> bool {
    value >= 64
}

/// Maps a controller value onto one of `count` evenly sized slots.
pub fn controller_to_index(value: u8, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let width = (128 / count).max(1);
    (value as usize / width).min(count - 1)
}

/// Converts a duration in seconds into a frame count at the given rate.
#[inline]
pub fn seconds_to_frames(sample_rate: u32, seconds: f32) -> usize {
    (sample_rate as f64 * seconds.max(0.0) as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANNING: Range = Range::new(-1.0, 1.0, 0.0);

    #[test]
    fn clamp_never_rejects() {
        let range = Range::new(1.0, 10.0, 1.0);
        assert_eq!(range.clamp(-5.0), 1.0);
        assert_eq!(range.clamp(50.0), 10.0);
        assert_eq!(range.clamp(4.5), 4.5);
        assert_eq!(range.clamp(f32::NAN), 1.0);
        assert_eq!(range.clamp(f32::INFINITY), 10.0);
        assert_eq!(range.clamp(f32::NEG_INFINITY), 1.0);
    }

    #[test]
    fn controller_endpoints() {
        let range = Range::new(0.0, 4.0, 1.0);
        assert_eq!(range.from_controller(0), 0.0);
        assert_eq!(range.from_controller(127), 4.0);
    }

    #[test]
    fn centered_controller_hits_midpoint() {
        assert_eq!(PANNING.from_controller_centered(63), 0.0);
        assert!(PANNING.from_controller_centered(64) > 0.0);
        assert!(PANNING.from_controller_centered(62) < 0.0);
    }

    #[test]
    fn pitch_wheel_spans_half_range() {
        let transpose = Range::new(-48.0, 48.0, 0.0);
        assert_eq!(transpose.from_pitch_wheel(0), 0.0);
        assert_eq!(transpose.from_pitch_wheel(8191), 48.0);
        assert_eq!(transpose.from_pitch_wheel(-8192), -48.0);
    }

    #[test]
    fn controller_index_covers_every_slot() {
        assert_eq!(controller_to_index(0, 5), 0);
        assert_eq!(controller_to_index(127, 5), 4);
        assert_eq!(controller_to_index(26, 5), 1);
        assert_eq!(controller_to_index(127, 3), 2);
        assert_eq!(controller_to_index(0, 0), 0);
    }

    #[test]
    fn bools_split_at_midpoint() {
        assert!(!controller_to_bool(63));
        assert!(controller_to_bool(64));
    }

    #[test]
    fn frames_round() {
        assert_eq!(seconds_to_frames(44100, 0.1), 4410);
        assert_eq!(seconds_to_frames(44100, 0.001), 44);
        assert_eq!(seconds_to_frames(44100, -1.0), 0);
    }
}
