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
use midly::{live::LiveEvent, MidiMessage};

/// A channel message the instrument reacts to. Channels are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    Controller { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// Signed wheel position, -8192..=8191.
    PitchWheel { channel: u8, value: i16 },
}

impl ControlEvent {
    /// Converts a parsed MIDI event. Events the instrument ignores return `None`.
    pub fn from_live(event: &LiveEvent) -> Option<ControlEvent> {
        let LiveEvent::Midi { channel, message } = event else {
            return None;
        };
        let channel = channel.as_int();
        match *message {
            MidiMessage::NoteOn { key, vel } => Some(ControlEvent::NoteOn {
                channel,
                note: key.as_int(),
                velocity: vel.as_int(),
            }),
            MidiMessage::NoteOff { key, .. } => Some(ControlEvent::NoteOff {
                channel,
                note: key.as_int(),
            }),
            MidiMessage::Controller { controller, value } => Some(ControlEvent::Controller {
                channel,
                controller: controller.as_int(),
                value: value.as_int(),
            }),
            MidiMessage::ProgramChange { program } => Some(ControlEvent::ProgramChange {
                channel,
                program: program.as_int(),
            }),
            MidiMessage::PitchBend { bend } => Some(ControlEvent::PitchWheel {
                channel,
                value: bend.as_int(),
            }),
            _ => None,
        }
    }

    /// Parses raw bytes from a MIDI input.
    pub fn parse(raw: &[u8]) -> Option<ControlEvent> {
        LiveEvent::parse(raw).ok().as_ref().and_then(ControlEvent::from_live)
    }

    pub fn channel(&self) -> u8 {
        match *self {
            ControlEvent::NoteOn { channel, .. }
            | ControlEvent::NoteOff { channel, .. }
            | ControlEvent::Controller { channel, .. }
            | ControlEvent::ProgramChange { channel, .. }
            | ControlEvent::PitchWheel { channel, .. } => channel,
        }
    }
}
