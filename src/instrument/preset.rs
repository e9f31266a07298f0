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
//! Plain parameter values for saving and recalling the instrument state.

use serde::{Deserialize, Serialize};

use super::routing::NoteMap;
use crate::dsp::{envelope, filter, gain, modulation, overdrive, panner};
use crate::dsp::{DecayType, FilterType};
use crate::pipeline::{stretch, transposer, wave, StretchType};

/// Every per-voice parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicePreset {
    pub start: f32,
    pub start_soft: bool,
    pub transpose: f32,
    pub transpose_velocity: f32,
    pub transpose_random: f32,
    pub stretch: f32,
    pub stretch_velocity: f32,
    pub stretch_type: StretchType,
    pub drive: f32,
    pub overdrive_active: bool,
    pub filter_frequency: f32,
    pub filter_resonance: f32,
    pub filter_type: FilterType,
    pub filter_active: bool,
    pub filter_velocity: f32,
    pub filter_random: f32,
    pub decay: f32,
    pub decay_type: DecayType,
    pub panning: f32,
    pub panning_velocity: f32,
    pub panning_random: f32,
    pub volume: f32,
    pub volume_velocity: f32,
    pub muted: bool,
    pub soloed: bool,
}

impl Default for VoicePreset {
    fn default() -> Self {
        VoicePreset {
            start: wave::START.default,
            start_soft: false,
            transpose: transposer::TRANSPOSE.default,
            transpose_velocity: modulation::AMOUNT.default,
            transpose_random: modulation::AMOUNT.default,
            stretch: stretch::STRETCH.default,
            stretch_velocity: modulation::AMOUNT.default,
            stretch_type: StretchType::default(),
            drive: overdrive::DRIVE.default,
            overdrive_active: false,
            filter_frequency: filter::MIN_FREQUENCY,
            filter_resonance: filter::RESONANCE.default,
            filter_type: FilterType::default(),
            filter_active: false,
            filter_velocity: modulation::AMOUNT.default,
            filter_random: modulation::AMOUNT.default,
            decay: envelope::DECAY.default,
            decay_type: DecayType::default(),
            panning: panner::PANNING.default,
            panning_velocity: modulation::AMOUNT.default,
            panning_random: modulation::AMOUNT.default,
            volume: gain::VOLUME.default,
            volume_velocity: modulation::AMOUNT.default,
            muted: false,
            soloed: false,
        }
    }
}

/// Engine-wide parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginePreset {
    pub volume: f32,
    pub transpose: f32,
    pub stretch: f32,
    pub linked: bool,
    /// Zero-based MIDI channel.
    pub base_channel: u8,
    pub base_note: u8,
    pub note_map: NoteMap,
    pub local_keyboard: bool,
    pub alternate_wheel: bool,
    pub omni: bool,
    pub mono: bool,
}

impl Default for EnginePreset {
    fn default() -> Self {
        EnginePreset {
            volume: gain::VOLUME.default,
            transpose: transposer::TRANSPOSE.default,
            stretch: stretch::STRETCH.default,
            linked: true,
            base_channel: 0,
            base_note: super::routing::MIDDLE_C,
            note_map: NoteMap::default(),
            local_keyboard: true,
            alternate_wheel: false,
            omni: true,
            mono: false,
        }
    }
}

/// A named snapshot of the whole instrument.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub name: String,
    pub engine: EnginePreset,
    pub voices: Vec<VoicePreset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let preset: Preset = serde_yml::from_str(
            r#"
name: Tight
engine:
  volume: 0.5
voices:
  - decay: 0.2
    decay_type: trigger
  - filter_type: band_pass_peak
    filter_active: true
"#,
        )
        .unwrap();

        assert_eq!(preset.name, "Tight");
        assert_eq!(preset.engine.volume, 0.5);
        assert!(preset.engine.omni);
        assert_eq!(preset.voices.len(), 2);
        assert_eq!(preset.voices[0].decay_type, DecayType::Trigger);
        assert_eq!(preset.voices[0].volume, 1.0);
        assert_eq!(preset.voices[1].filter_type, FilterType::BandPassPeak);
        assert_eq!(preset.voices[1].stretch_type, StretchType::Auto);
    }

    #[test]
    fn defaults_match_a_fresh_voice() {
        let preset = VoicePreset::default();
        assert_eq!(preset.decay, 2.0);
        assert_eq!(preset.filter_frequency, 30.0);
        assert_eq!(preset.drive, 1.0);
        assert_eq!(preset.decay_type, DecayType::Infinite);
    }
}
