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
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::{thread_priority::CallbackPriority, BlockAdapter, Playback};
use crate::{audio::Device as AudioDevice, config, instrument::Instrument, instrument::VOICE_COUNT};

/// How often the stream thread checks whether it should stop.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The rate the stream is opened at.
    sample_rate: u32,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices with at least one output channel.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        sample_rate: 0,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(mut device) => {
                device.sample_rate = config.sample_rate();
                Ok(device)
            }
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    /// Channels opened on the device: enough for one per voice in mono mode.
    fn stream_channels(&self) -> u16 {
        self.max_channels.min(VOICE_COUNT as u16)
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mut adapter: BlockAdapter,
) -> Result<cpal::Stream, Box<dyn Error>> {
    let mut priority = CallbackPriority::from_env();
    let on_error = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                priority.apply();
                adapter.fill(data);
            },
            on_error,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                priority.apply();
                adapter.fill_converted(data);
            },
            on_error,
            None,
        )?,
        cpal::SampleFormat::I32 => device.build_output_stream(
            config,
            move |data: &mut [i32], _: &cpal::OutputCallbackInfo| {
                priority.apply();
                adapter.fill_converted(data);
            },
            on_error,
            None,
        )?,
        other => return Err(format!("unsupported sample format {}", other).into()),
    };
    Ok(stream)
}

impl AudioDevice for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&self, instrument: Instrument) -> Result<Playback, Box<dyn Error>> {
        let span = span!(Level::INFO, "start stream (cpal)");
        let _enter = span.enter();

        let channels = self.stream_channels();
        let sample_format = self.device.default_output_config()?.sample_format();
        let config = cpal::StreamConfig {
            channels,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        let device = self.device.clone();
        let running = Arc::new(AtomicBool::new(true));
        let (started_tx, started_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        info!(
            device = self.name,
            channels,
            sample_rate = self.sample_rate,
            format = %sample_format,
            "Starting output stream"
        );

        // The stream is created and dropped on its own thread.
        let thread = {
            let running = running.clone();
            thread::spawn(move || {
                let adapter = BlockAdapter::new(instrument, channels as usize);
                let stream = match build_stream(&device, &config, sample_format, adapter)
                    .and_then(|stream| {
                        stream.play()?;
                        Ok(stream)
                    }) {
                    Ok(stream) => stream,
                    Err(e) => {
                        running.store(false, Ordering::Relaxed);
                        let _ = started_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = started_tx.send(Ok(()));

                while running.load(Ordering::Relaxed) {
                    thread::sleep(STOP_POLL_INTERVAL);
                }
                drop(stream);
                info!("Output stream stopped");
            })
        };

        let playback = Playback::new(running, thread);
        match started_rx.recv()? {
            Ok(()) => Ok(playback),
            Err(e) => Err(e.into()),
        }
    }
}
