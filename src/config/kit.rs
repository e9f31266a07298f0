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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::{Deserialize, Serialize};

use super::audio::Audio;
use super::error::ConfigError;
use crate::instrument::{EnginePreset, Preset, VoicePreset, VOICE_COUNT};

/// The MIDI input configuration.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Midi {
    /// The MIDI input device. Names starting with "mock" select the mock device.
    device: String,
}

impl Midi {
    pub fn new(device: &str) -> Midi {
        Midi {
            device: device.to_string(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

/// One voice slot: an optional sample plus its starting parameters.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct VoiceConfig {
    /// Path to the sample, relative to the kit file.
    sample: Option<String>,

    #[serde(flatten)]
    parameters: VoicePreset,
}

impl VoiceConfig {
    pub fn new(sample: Option<&str>, parameters: VoicePreset) -> VoiceConfig {
        VoiceConfig {
            sample: sample.map(str::to_string),
            parameters,
        }
    }

    pub fn sample(&self) -> Option<&str> {
        self.sample.as_deref()
    }

    pub fn parameters(&self) -> &VoicePreset {
        &self.parameters
    }
}

/// A drum kit: devices, samples, starting parameters and the preset bank.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Kit {
    #[serde(default)]
    audio: Audio,

    midi: Option<Midi>,

    /// Seed for the modulation random source. Absent seeds from entropy.
    seed: Option<u64>,

    #[serde(default)]
    engine: EnginePreset,

    #[serde(default)]
    voices: Vec<VoiceConfig>,

    #[serde(default)]
    presets: Vec<Preset>,

    /// Directory sample paths are resolved against.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Kit {
    /// Parses a kit from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Kit, ConfigError> {
        let mut kit = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Kit>()?;
        kit.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        kit.validate()?;
        Ok(kit)
    }

    /// Checks the values the engine cannot clamp on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voices.len() > VOICE_COUNT {
            return Err(ConfigError::TooManyVoices {
                count: self.voices.len(),
                max: VOICE_COUNT,
            });
        }
        if self.audio.block_size() == 0 {
            return Err(ConfigError::EmptyBlock);
        }
        if self.audio.sample_rate() == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        Ok(())
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn midi(&self) -> Option<&Midi> {
        self.midi.as_ref()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn engine(&self) -> &EnginePreset {
        &self.engine
    }

    pub fn voices(&self) -> &[VoiceConfig] {
        &self.voices
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Serializes the resolved kit back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use config::FileFormat;

    use super::*;
    use crate::dsp::{DecayType, FilterType};
    use crate::instrument::NoteMap;

    fn parse(yaml: &str) -> Kit {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_kit_uses_defaults() {
        let kit = parse("seed: 3");
        assert_eq!(kit.seed(), Some(3));
        assert!(kit.midi().is_none());
        assert_eq!(kit.engine(), &EnginePreset::default());
        assert!(kit.voices().is_empty());
        assert!(kit.presets().is_empty());
        assert_eq!(kit.audio().block_size(), 256);
    }

    #[test]
    fn parses_a_full_kit() {
        let kit = parse(
            r#"
            audio:
              device: mock-out
              sample_rate: 48000
            midi:
              device: mock-in
            engine:
              base_channel: 9
              base_note: 36
              note_map: pads
              linked: false
              volume: 0.5
            voices:
              - sample: kick.wav
                decay: 0.3
                decay_type: trigger
              - sample: snare.wav
                filter_type: high_pass
                filter_frequency: 200
                filter_active: true
              - volume: 2
            presets:
              - name: Dry
                engine:
                  volume: 1.0
                voices:
                  - volume: 0.8
        "#,
        );

        assert_eq!(kit.audio().device(), "mock-out");
        assert_eq!(kit.audio().sample_rate(), 48000);
        assert_eq!(kit.midi().map(Midi::device), Some("mock-in"));
        assert_eq!(kit.engine().base_channel, 9);
        assert_eq!(kit.engine().base_note, 36);
        assert_eq!(kit.engine().note_map, NoteMap::Pads);
        assert!(!kit.engine().linked);
        assert!(kit.engine().omni);

        assert_eq!(kit.voices().len(), 3);
        assert_eq!(kit.voices()[0].sample(), Some("kick.wav"));
        assert_eq!(kit.voices()[0].parameters().decay, 0.3);
        assert_eq!(kit.voices()[0].parameters().decay_type, DecayType::Trigger);
        assert_eq!(kit.voices()[1].parameters().filter_type, FilterType::HighPass);
        assert_eq!(kit.voices()[1].parameters().filter_frequency, 200.0);
        assert!(kit.voices()[1].parameters().filter_active);
        assert_eq!(kit.voices()[2].sample(), None);
        assert_eq!(kit.voices()[2].parameters().volume, 2.0);

        assert_eq!(kit.presets().len(), 1);
        assert_eq!(kit.presets()[0].name, "Dry");
        assert_eq!(kit.presets()[0].voices[0].volume, 0.8);
    }

    #[test]
    fn deserialize_resolves_the_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kit.yaml");
        fs::write(&path, "voices:\n  - sample: kick.wav\n").unwrap();

        let kit = Kit::deserialize(&path).unwrap();
        assert_eq!(kit.base_path(), dir.path());
        assert_eq!(kit.voices()[0].sample(), Some("kick.wav"));
    }

    #[test]
    fn too_many_voices_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kit.yaml");
        fs::write(&path, format!("voices:\n{}", "  - volume: 1.0\n".repeat(9))).unwrap();

        assert!(matches!(
            Kit::deserialize(&path),
            Err(ConfigError::TooManyVoices { count: 9, max: 8 })
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        assert!(matches!(
            Kit::deserialize(Path::new("/nonexistent/kit.yaml")),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn yaml_dump_parses_back() {
        let kit = parse(
            r#"
            seed: 11
            voices:
              - sample: hat.wav
                panning: -0.5
        "#,
        );
        let dumped = kit.to_yaml().unwrap();
        let reparsed: Kit = serde_yml::from_str(&dumped).unwrap();
        assert_eq!(reparsed, kit);
    }
}
