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
/// Typed error for kit configuration failures so callers can tell a missing
/// file from an invalid kit without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Too many voices configured: {count} (maximum {max})")]
    TooManyVoices { count: usize, max: usize },

    #[error("Block size must be greater than zero")]
    EmptyBlock,

    #[error("Sample rate must be greater than zero")]
    InvalidSampleRate,

    #[error("Unable to serialize kit: {0}")]
    Serialize(#[from] serde_yml::Error),
}
