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
//! Leaf signal processing units. Each one processes a mono block in place and
//! clamps its parameters into range instead of rejecting them.

pub mod envelope;
pub mod filter;
pub mod gain;
pub mod modulation;
pub mod overdrive;
pub mod panner;
pub mod range;

pub use envelope::{DecayType, Envelope};
pub use filter::{FilterBank, FilterType};
pub use gain::Gain;
pub use modulation::{RandomSource, Velocity, VelocityRandom};
pub use overdrive::Overdrive;
pub use panner::Panner;
pub use range::Range;
