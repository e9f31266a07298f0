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
//! Kit configuration and start-up wiring.

use std::error::Error;
use std::path::Path;

use tracing::{info, warn};

use crate::dsp::RandomSource;
use crate::instrument::{self, ControlHandle, Engine, Instrument, VOICE_COUNT};
use crate::pipeline::{self, PipelineError, ResampleQuality, VoicePipeline};
use crate::samples::SampleLoader;

mod audio;
mod error;
mod kit;

pub use audio::Audio;
pub use error::ConfigError;
pub use kit::{Kit, Midi, VoiceConfig};

/// Builds a pipeline for a sample path. A sample that fails to load is logged
/// and leaves the voice silent.
pub fn load_pipeline(
    loader: &mut SampleLoader,
    sample: Option<&Path>,
    output_rate: u32,
    block_size: usize,
    quality: ResampleQuality,
) -> Result<VoicePipeline, PipelineError> {
    let buffer = sample.and_then(|path| match loader.load(path) {
        Ok(buffer) => Some(buffer),
        Err(e) => {
            warn!(path = ?path, err = %e, "Unable to load sample, voice will be silent");
            None
        }
    });
    pipeline::build(buffer, output_rate, block_size, quality)
}

/// Loads every sample in the kit and builds the instrument plus the handle
/// used to feed it. `output_rate` is the rate the audio device runs at.
pub fn init_instrument(
    kit: &Kit,
    loader: &mut SampleLoader,
    output_rate: u32,
) -> Result<(Instrument, ControlHandle), Box<dyn Error>> {
    let block_size = kit.audio().block_size();
    let quality = kit.audio().resample_quality();

    let mut pipelines = Vec::with_capacity(VOICE_COUNT);
    for id in 0..VOICE_COUNT {
        let sample = kit
            .voices()
            .get(id)
            .and_then(VoiceConfig::sample)
            .map(Path::new);
        pipelines.push(Box::new(load_pipeline(
            loader,
            sample,
            output_rate,
            block_size,
            quality,
        )?));
    }

    let random = match kit.seed() {
        Some(seed) => RandomSource::seeded(seed),
        None => RandomSource::from_entropy(),
    };
    let mut engine = Engine::new(output_rate, block_size, pipelines, random);
    engine.recall_preset(kit.engine());
    let globals = engine.globals();
    for (id, voice) in kit.voices().iter().enumerate() {
        if let Some(target) = engine.voice_mut(id) {
            target.recall_preset(voice.parameters(), &globals);
        }
        engine.solo(id, voice.parameters().soloed);
    }
    engine.set_presets(kit.presets().to_vec());

    info!(
        voices = kit.voices().len(),
        presets = kit.presets().len(),
        sample_rate = output_rate,
        block_size,
        memory = loader.total_memory_usage(),
        "Instrument initialized"
    );

    let (handle, queue) = instrument::channel(instrument::EVENT_QUEUE_CAPACITY, VOICE_COUNT);
    Ok((Instrument::new(engine, queue), handle))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::dsp::DecayType;
    use crate::testutil::{audio_test_utils::is_silent, write_wav};

    #[test]
    fn builds_an_instrument_from_a_kit_file() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(
            dir.path().join("kick.wav"),
            vec![vec![0.5; 4410]],
            44100,
        )
        .unwrap();
        let path = dir.path().join("kit.yaml");
        fs::write(
            &path,
            r#"
seed: 5
audio:
  block_size: 64
engine:
  volume: 0.5
voices:
  - sample: kick.wav
    decay_type: gate
  - sample: missing.wav
    soloed: false
presets:
  - name: Loud
    engine:
      volume: 2.0
"#,
        )
        .unwrap();

        let kit = Kit::deserialize(&path).unwrap();
        let mut loader = SampleLoader::new(kit.base_path());
        let (mut instrument, handle) = init_instrument(&kit, &mut loader, 44100).unwrap();

        let engine = instrument.engine();
        assert_eq!(engine.voices().len(), VOICE_COUNT);
        assert_eq!(engine.block_size(), 64);
        assert_eq!(engine.volume(), 0.5);
        assert_eq!(engine.presets().len(), 1);
        assert_eq!(engine.voice(0).unwrap().decay_type(), DecayType::Gate);
        assert!(engine.voice(0).unwrap().sample().is_some());
        assert!(engine.voice(1).unwrap().sample().is_none());

        handle
            .send_event(instrument::ControlEvent::NoteOn {
                channel: 0,
                note: instrument::routing::MIDDLE_C,
                velocity: 127,
            })
            .unwrap();
        instrument.tick();
        assert!(!is_silent(instrument.engine().left()));
        assert!((instrument.engine().left()[0] - 0.25).abs() < 1e-6);
    }
}
