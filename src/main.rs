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
use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use pulsekit::config::{self, Kit};
use pulsekit::samples::SampleLoader;
use pulsekit::{audio, midi};
use tracing::{debug, info};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=pulsekit drum machine sampler

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/pulsekit
ExecStart=/usr/local/bin/pulsekit start "$PULSEKIT_KIT"

[Install]
WantedBy=multi-user.target
Alias=pulsekit.service
"#;

/// How often the control thread collects pipelines retired by the audio thread.
const RETIRE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A MIDI-controlled drum machine sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Loads a kit and all of its samples, then prints the resolved kit.
    Kit {
        /// The path to the kit config.
        kit_path: String,
    },
    /// Start will load a kit and play it from MIDI input.
    Start {
        /// The path to the kit config.
        kit_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Kit { kit_path } => {
            let kit = Kit::deserialize(&PathBuf::from(&kit_path))?;
            let mut loader = SampleLoader::new(kit.base_path());
            let (instrument, _) =
                config::init_instrument(&kit, &mut loader, kit.audio().sample_rate())?;

            println!("Kit {}:", kit_path);
            for (id, voice) in kit.voices().iter().enumerate() {
                println!("- voice {}: {}", id, voice.sample().unwrap_or("(none)"));
            }
            println!("Presets (count: {}):", kit.presets().len());
            for (program, preset) in kit.presets().iter().enumerate() {
                println!("- {}: {}", program, preset.name);
            }
            println!(
                "Sample memory: {} bytes, rendering {} channel(s).",
                loader.total_memory_usage(),
                if instrument.engine().is_mono() { "per-voice" } else { "2" }
            );
            println!("\n{}", kit.to_yaml()?);
        }
        Commands::Start { kit_path } => {
            let kit = Kit::deserialize(&PathBuf::from(&kit_path))?;
            let device = audio::get_device(kit.audio())?;
            let mut loader = SampleLoader::new(kit.base_path());
            let (instrument, handle) =
                config::init_instrument(&kit, &mut loader, device.sample_rate())?;

            let midi_device = match kit.midi() {
                Some(midi) => {
                    let midi_device = midi::get_device(midi.device())?;
                    midi_device.watch_events(handle.clone())?;
                    Some(midi_device)
                }
                None => None,
            };

            let playback = device.start(instrument)?;
            info!(device = %device.name(), "Playing.");

            while playback.is_running() {
                thread::sleep(RETIRE_INTERVAL);
                let released = handle.release_retired();
                if released > 0 {
                    debug!(released, "Released retired pipelines.");
                }
            }

            if let Some(midi_device) = midi_device {
                midi_device.stop_watch_events();
            }
            info!("Audio output stopped.");
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE);
        }
    }

    Ok(())
}
