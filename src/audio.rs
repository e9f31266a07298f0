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
//! Audio output devices.
//!
//! A device takes ownership of the [`Instrument`] and drives its tick from
//! the output callback. The returned [`Playback`] keeps the stream alive.

use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use tracing::error;

use crate::config;
use crate::instrument::Instrument;

mod adapter;
pub mod cpal;
pub mod mock;
mod thread_priority;

pub use adapter::BlockAdapter;

pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// The rate the device will run at once started.
    fn sample_rate(&self) -> u32;

    /// Starts rendering the instrument.
    fn start(&self, instrument: Instrument) -> Result<Playback, Box<dyn Error>>;
}

/// A running output stream. Dropping it stops the stream.
pub struct Playback {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Playback {
    pub(crate) fn new(running: Arc<AtomicBool>, thread: JoinHandle<()>) -> Playback {
        Playback {
            running,
            thread: Some(thread),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stops the stream and waits for its thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the given name.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device, config.sample_rate())));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
