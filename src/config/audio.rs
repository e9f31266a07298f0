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
use serde::{Deserialize, Serialize};

use crate::pipeline::ResampleQuality;

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BLOCK_SIZE: usize = 256;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Audio {
    /// The audio output device. Names starting with "mock" select the mock device.
    device: Option<String>,

    /// Output sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Frames rendered per engine tick (default: 256).
    block_size: Option<usize>,

    /// Interpolation used when transposing (default: linear).
    resample_quality: Option<ResampleQuality>,
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            ..Default::default()
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the output sample rate (default: 44100).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the engine block size (default: 256).
    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    pub fn resample_quality(&self) -> ResampleQuality {
        self.resample_quality.unwrap_or_default()
    }
}
