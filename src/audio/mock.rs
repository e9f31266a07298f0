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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use tracing::{info, span, Level};

use super::{BlockAdapter, Playback};
use crate::instrument::Instrument;

/// Channels rendered by the mock device.
const CHANNELS: usize = 2;

/// A mock device. Renders in real time into a discarded buffer.
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    frames: Arc<AtomicU64>,
    peak: Arc<AtomicU32>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, sample_rate: u32) -> Device {
        Device {
            name: name.to_string(),
            sample_rate,
            frames: Arc::new(AtomicU64::new(0)),
            peak: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Frames rendered since the device was started.
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Largest absolute sample value rendered so far.
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak.load(Ordering::Relaxed))
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&self, instrument: Instrument) -> Result<Playback, Box<dyn Error>> {
        let span = span!(Level::INFO, "start stream (mock)");
        let _enter = span.enter();

        let block_size = instrument.engine().block_size();
        let period = Duration::from_secs_f64(block_size as f64 / self.sample_rate.max(1) as f64);
        info!(device = %self.name, block_size, "Starting mock output");

        let running = Arc::new(AtomicBool::new(true));
        let thread = {
            let running = running.clone();
            let frames = self.frames.clone();
            let peak = self.peak.clone();
            thread::spawn(move || {
                let mut adapter = BlockAdapter::new(instrument, CHANNELS);
                let mut data = vec![0.0f32; block_size * CHANNELS];
                while running.load(Ordering::Relaxed) {
                    adapter.fill(&mut data);
                    let block_peak = data.iter().fold(0.0f32, |p, s| p.max(s.abs()));
                    if block_peak > f32::from_bits(peak.load(Ordering::Relaxed)) {
                        peak.store(block_peak.to_bits(), Ordering::Relaxed);
                    }
                    frames.fetch_add(block_size as u64, Ordering::Relaxed);
                    thread::sleep(period);
                }
            })
        };

        Ok(Playback::new(running, thread))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Device as _;
    use crate::dsp::RandomSource;
    use crate::instrument::{channel, ControlEvent, Engine, VOICE_COUNT};
    use crate::pipeline::{self, ResampleQuality};
    use crate::testutil::{eventually, sine};

    #[test]
    fn renders_until_stopped() {
        let device = Device::get("mock-out", 44100);
        let pipeline =
            pipeline::build(Some(sine(44100, 440.0, 44100)), 44100, 128, ResampleQuality::Linear)
                .unwrap();
        let engine = Engine::new(44100, 128, vec![Box::new(pipeline)], RandomSource::seeded(1));
        let (handle, queue) = channel(16, VOICE_COUNT);

        let playback = device.start(Instrument::new(engine, queue)).unwrap();
        assert!(playback.is_running());
        eventually(|| device.frames_rendered() > 0, "Mock device never rendered");
        assert_eq!(device.peak(), 0.0);

        handle
            .send_event(ControlEvent::NoteOn {
                channel: 0,
                note: 60,
                velocity: 127,
            })
            .unwrap();
        eventually(|| device.peak() > 0.1, "Note never reached the output");

        playback.stop();
        let frames = device.frames_rendered();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(device.frames_rendered(), frames);
    }
}
