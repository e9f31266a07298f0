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
//! Maps notes and controller numbers onto voices and parameters.

use serde::{Deserialize, Serialize};

/// Number of voice slots in the engine.
pub const VOICE_COUNT: usize = 8;

pub const MIDDLE_C: u8 = 60;

/// First controller number of a per-voice controller page.
pub const FIRST_VOICE_CONTROLLER: u8 = 14;

/// Engine controllers and channel mode messages.
pub mod controller {
    pub const VOLUME: u8 = 7;
    pub const LINKED: u8 = 9;
    pub const TRANSPOSE: u8 = 12;
    pub const STRETCH: u8 = 13;
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    pub const LOCAL_KEYBOARD: u8 = 122;
    pub const ALL_NOTES_OFF: u8 = 123;
    pub const OMNI_OFF: u8 = 124;
    pub const OMNI_ON: u8 = 125;
    pub const MONO_ON: u8 = 126;
    pub const POLY_ON: u8 = 127;
}

/// How incoming notes select a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteMap {
    /// The first eight semitones of every octave above or below the base note.
    #[default]
    Keyboard,
    /// Eight consecutive notes starting at the base note.
    Pads,
}

impl NoteMap {
    /// Returns the voice a note triggers, if any.
    pub fn voice(self, base_note: u8, note: u8) -> Option<usize> {
        let offset = note as i32 - base_note as i32;
        let voice = match self {
            NoteMap::Keyboard => offset.rem_euclid(12),
            NoteMap::Pads => offset,
        };
        if (0..VOICE_COUNT as i32).contains(&voice) {
            Some(voice as usize)
        } else {
            None
        }
    }
}

/// Controller page. Page A is read on the base channel, page B on the channel above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    A,
    B,
}

/// A per-voice parameter addressable by controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceParameter {
    Start,
    StartSoft,
    Transpose,
    Stretch,
    Drive,
    FilterFrequency,
    FilterResonance,
    Decay,
    Panning,
    Volume,
    FilterActive,
    OverdriveActive,
    TransposeVelocity,
    StretchType,
    FilterType,
    TransposeRandom,
    StretchVelocity,
    FilterVelocity,
    FilterRandom,
    PanningVelocity,
    PanningRandom,
    VolumeVelocity,
    DecayType,
    Muted,
    Soloed,
}

const PAGE_A: [VoiceParameter; 12] = [
    VoiceParameter::Start,
    VoiceParameter::StartSoft,
    VoiceParameter::Transpose,
    VoiceParameter::Stretch,
    VoiceParameter::Drive,
    VoiceParameter::FilterFrequency,
    VoiceParameter::FilterResonance,
    VoiceParameter::Decay,
    VoiceParameter::Panning,
    VoiceParameter::Volume,
    VoiceParameter::FilterActive,
    VoiceParameter::OverdriveActive,
];

const PAGE_B: [VoiceParameter; 13] = [
    VoiceParameter::TransposeVelocity,
    VoiceParameter::StretchType,
    VoiceParameter::FilterType,
    VoiceParameter::TransposeRandom,
    VoiceParameter::StretchVelocity,
    VoiceParameter::FilterVelocity,
    VoiceParameter::FilterRandom,
    VoiceParameter::PanningVelocity,
    VoiceParameter::PanningRandom,
    VoiceParameter::VolumeVelocity,
    VoiceParameter::DecayType,
    VoiceParameter::Muted,
    VoiceParameter::Soloed,
];

impl Page {
    fn parameters(self) -> &'static [VoiceParameter] {
        match self {
            Page::A => &PAGE_A,
            Page::B => &PAGE_B,
        }
    }
}

impl VoiceParameter {
    pub fn page(self) -> Page {
        if PAGE_A.contains(&self) {
            Page::A
        } else {
            Page::B
        }
    }

    /// Controller number that addresses this parameter on the given voice.
    pub fn controller(self, voice: usize) -> u8 {
        let page = self.page().parameters();
        let index = page.iter().position(|p| *p == self).unwrap_or(0);
        FIRST_VOICE_CONTROLLER + (index * VOICE_COUNT + voice % VOICE_COUNT) as u8
    }

    /// Decodes a controller number on a page into a parameter and a voice.
    pub fn from_controller(page: Page, controller: u8) -> Option<(VoiceParameter, usize)> {
        let offset = controller.checked_sub(FIRST_VOICE_CONTROLLER)? as usize;
        let parameter = page.parameters().get(offset / VOICE_COUNT)?;
        Some((*parameter, offset % VOICE_COUNT))
    }
}
