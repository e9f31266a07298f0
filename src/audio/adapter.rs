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
use crate::instrument::Instrument;

/// Frames converted per pass when the device wants a non-float format.
const CONVERSION_FRAMES: usize = 1024;

/// Renders whole engine blocks and hands them out in whatever slice lengths
/// the device callback asks for.
pub struct BlockAdapter {
    instrument: Instrument,
    channels: usize,
    /// Frames of the current block already handed out.
    position: usize,
    scratch: Vec<f32>,
}

impl BlockAdapter {
    pub fn new(instrument: Instrument, channels: usize) -> BlockAdapter {
        let channels = channels.max(1);
        let block_size = instrument.engine().block_size();
        BlockAdapter {
            instrument,
            channels,
            position: block_size,
            scratch: vec![0.0; CONVERSION_FRAMES * channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Fills an interleaved buffer. Stereo mixes go to the first two
    /// channels; in mono mode each voice gets its own channel.
    pub fn fill(&mut self, data: &mut [f32]) {
        let channels = self.channels;
        let block_size = self.instrument.engine().block_size();
        let frames = data.len() / channels;
        let mut frame = 0;

        while frame < frames {
            if self.position >= block_size {
                self.instrument.tick();
                self.position = 0;
            }
            let count = (block_size - self.position).min(frames - frame);
            let out = &mut data[frame * channels..(frame + count) * channels];
            self.write(out, count);
            self.position += count;
            frame += count;
        }
        data[frames * channels..].fill(0.0);
    }

    /// Fills a buffer of any sample type cpal supports.
    pub fn fill_converted<T>(&mut self, data: &mut [T])
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        let mut scratch = std::mem::take(&mut self.scratch);
        for chunk in data.chunks_mut(scratch.len()) {
            let rendered = &mut scratch[..chunk.len()];
            self.fill(rendered);
            for (dst, src) in chunk.iter_mut().zip(rendered.iter()) {
                *dst = T::from_sample(*src);
            }
        }
        self.scratch = scratch;
    }

    fn write(&self, out: &mut [f32], count: usize) {
        let engine = self.instrument.engine();
        let channels = self.channels;
        let start = self.position;

        if engine.is_mono() {
            for (c, voice) in engine.voices().iter().enumerate().take(channels) {
                let block = &voice.buffer()[start..start + count];
                for (i, sample) in block.iter().enumerate() {
                    out[i * channels + c] = *sample;
                }
            }
            for c in engine.voices().len().min(channels)..channels {
                for i in 0..count {
                    out[i * channels + c] = 0.0;
                }
            }
            return;
        }

        let left = &engine.left()[start..start + count];
        let right = &engine.right()[start..start + count];
        for (i, frame) in out.chunks_exact_mut(channels).enumerate() {
            if channels == 1 {
                frame[0] = (left[i] + right[i]) * 0.5;
                continue;
            }
            frame[0] = left[i];
            frame[1] = right[i];
            frame[2..].fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::RandomSource;
    use crate::instrument::{channel, ControlEvent, Engine, VOICE_COUNT};
    use crate::pipeline::{self, ResampleQuality};
    use crate::testutil::ramp;

    const RATE: u32 = 44100;
    const BLOCK: usize = 64;

    fn adapter(channels: usize) -> (BlockAdapter, crate::instrument::ControlHandle) {
        let pipelines = (0..2)
            .map(|_| {
                Box::new(
                    pipeline::build(
                        Some(ramp(RATE, RATE as usize)),
                        RATE,
                        BLOCK,
                        ResampleQuality::Linear,
                    )
                    .unwrap(),
                )
            })
            .collect();
        let engine = Engine::new(RATE, BLOCK, pipelines, RandomSource::seeded(1));
        let (handle, queue) = channel(16, VOICE_COUNT);
        (
            BlockAdapter::new(Instrument::new(engine, queue), channels),
            handle,
        )
    }

    fn trigger(handle: &crate::instrument::ControlHandle, note: u8) {
        handle
            .send_event(ControlEvent::NoteOn {
                channel: 0,
                note,
                velocity: 127,
            })
            .unwrap();
    }

    #[test]
    fn odd_callback_sizes_stay_continuous() {
        let (mut adapter, handle) = adapter(2);
        trigger(&handle, 60);

        let mut rendered = Vec::new();
        for size in [10, 100, 3, 64, 200] {
            let mut data = vec![0.0; size * 2];
            adapter.fill(&mut data);
            rendered.extend(data.chunks_exact(2).map(|frame| frame[0]));
        }

        for (i, sample) in rendered.iter().enumerate() {
            assert!((sample - i as f32 / RATE as f32).abs() < 1e-6, "frame {i}");
        }
    }

    #[test]
    fn mono_mode_routes_voices_to_channels() {
        let (mut adapter, handle) = adapter(4);
        handle
            .send_event(ControlEvent::Controller {
                channel: 0,
                controller: crate::instrument::routing::controller::MONO_ON,
                value: 127,
            })
            .unwrap();
        trigger(&handle, 61);

        let mut data = vec![1.0; BLOCK * 4];
        adapter.fill(&mut data);
        for (i, frame) in data.chunks_exact(4).enumerate() {
            assert_eq!(frame[0], 0.0);
            assert!((frame[1] - i as f32 / RATE as f32).abs() < 1e-6);
            assert_eq!(frame[2], 0.0);
            assert_eq!(frame[3], 0.0);
        }
    }

    #[test]
    fn single_channel_devices_get_a_downmix() {
        let (mut adapter, handle) = adapter(1);
        trigger(&handle, 60);

        let mut data = vec![0.0; BLOCK];
        adapter.fill(&mut data);
        assert!((data[10] - 10.0 / RATE as f32).abs() < 1e-6);
    }

    #[test]
    fn converts_to_integer_samples() {
        let (mut adapter, handle) = adapter(2);
        trigger(&handle, 60);

        let mut data = vec![0i16; 4000];
        adapter.fill_converted(&mut data);
        assert_eq!(data[0], 0);
        assert!(data[3998] > 0);
        assert_eq!(data[3999], data[3998]);
    }
}
