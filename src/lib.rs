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
//! A MIDI-controlled drum machine sampler.
//!
//! Eight voices each play a sample through a pitch and time pipeline,
//! an overdrive, a filter, an envelope and a gain stage. The engine mixes
//! the voices to stereo (or hands them out one per channel) once per block
//! from the audio callback, while control events arrive from MIDI through
//! a bounded queue.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod instrument;
pub mod midi;
pub mod pipeline;
pub mod samples;
#[cfg(test)]
mod testutil;
