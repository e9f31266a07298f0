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
use std::mem;

use super::event::ControlEvent;
use super::preset::{EnginePreset, Preset, VoicePreset};
use super::routing::{controller, NoteMap, Page, VoiceParameter, VOICE_COUNT};
use super::voice::{Globals, Voice};
use crate::dsp::range::{controller_to_bool, controller_to_index};
use crate::dsp::{envelope, filter, gain, modulation, overdrive, panner, RandomSource};
use crate::dsp::{DecayType, FilterType};
use crate::pipeline::{stretch::STRETCH, transposer::TRANSPOSE, wave::START, StretchType};
use crate::pipeline::VoicePipeline;

/// Voices that choke each other when the engine is linked.
pub const CHOKE_PAIR: (usize, usize) = (6, 7);

/// Owns the voices and mixes them down once per block.
pub struct Engine {
    sample_rate: u32,
    block_size: usize,
    voices: Vec<Voice>,
    soloed: usize,

    volume: f32,
    transpose: f32,
    transpose_wheel: f32,
    stretch: f32,
    stretch_wheel: f32,
    linked: bool,

    base_channel: u8,
    base_note: u8,
    note_map: NoteMap,
    local_keyboard: bool,
    alternate_wheel: bool,
    omni: bool,
    mono: bool,

    left: Vec<f32>,
    right: Vec<f32>,
    presets: Vec<Preset>,
}

impl Engine {
    /// Creates one voice per pipeline, up to the voice limit. Each voice gets
    /// its own random stream forked from `random`.
    pub fn new(
        sample_rate: u32,
        block_size: usize,
        pipelines: Vec<Box<VoicePipeline>>,
        mut random: RandomSource,
    ) -> Engine {
        let mut voices: Vec<Voice> = pipelines
            .into_iter()
            .take(VOICE_COUNT)
            .enumerate()
            .map(|(id, pipeline)| Voice::new(id, sample_rate, block_size, pipeline, random.fork()))
            .collect();

        let (a, b) = CHOKE_PAIR;
        if voices.len() > b {
            voices[a].set_linked(Some(b));
            voices[b].set_linked(Some(a));
        }

        let defaults = EnginePreset::default();
        Engine {
            sample_rate,
            block_size,
            voices,
            soloed: 0,
            volume: defaults.volume,
            transpose: defaults.transpose,
            transpose_wheel: 0.0,
            stretch: defaults.stretch,
            stretch_wheel: 0.0,
            linked: defaults.linked,
            base_channel: defaults.base_channel,
            base_note: defaults.base_note,
            note_map: defaults.note_map,
            local_keyboard: defaults.local_keyboard,
            alternate_wheel: defaults.alternate_wheel,
            omni: defaults.omni,
            mono: defaults.mono,
            left: vec![0.0; block_size],
            right: vec![0.0; block_size],
            presets: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice(&self, voice: usize) -> Option<&Voice> {
        self.voices.get(voice)
    }

    /// Direct access for setters that do not depend on engine values.
    pub fn voice_mut(&mut self, voice: usize) -> Option<&mut Voice> {
        self.voices.get_mut(voice)
    }

    /// Engine values as the voices see them.
    pub fn globals(&self) -> Globals {
        Globals {
            transpose: TRANSPOSE.clamp(self.transpose + self.transpose_wheel),
            stretch: STRETCH.clamp(self.stretch + self.stretch_wheel),
            volume: self.volume,
        }
    }

    fn push_globals(&mut self) {
        let globals = self.globals();
        for voice in self.voices.iter_mut() {
            voice.apply_globals(&globals);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = gain::VOLUME.clamp(volume);
        self.push_globals();
    }

    pub fn transpose(&self) -> f32 {
        self.transpose
    }

    pub fn set_transpose(&mut self, semitones: f32) {
        self.transpose = TRANSPOSE.clamp(semitones);
        self.push_globals();
    }

    pub fn transpose_wheel(&self) -> f32 {
        self.transpose_wheel
    }

    pub fn set_transpose_wheel(&mut self, semitones: f32) {
        let half = TRANSPOSE.half_range();
        self.transpose_wheel = if semitones.is_nan() {
            0.0
        } else {
            semitones.clamp(-half, half)
        };
        self.push_globals();
    }

    pub fn stretch(&self) -> f32 {
        self.stretch
    }

    pub fn set_stretch(&mut self, stretch: f32) {
        self.stretch = STRETCH.clamp(stretch);
        self.push_globals();
    }

    pub fn stretch_wheel(&self) -> f32 {
        self.stretch_wheel
    }

    pub fn set_stretch_wheel(&mut self, offset: f32) {
        let half = STRETCH.half_range();
        self.stretch_wheel = if offset.is_nan() {
            0.0
        } else {
            offset.clamp(-half, half)
        };
        self.push_globals();
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn set_linked(&mut self, linked: bool) {
        self.linked = linked;
    }

    pub fn base_channel(&self) -> u8 {
        self.base_channel
    }

    pub fn set_base_channel(&mut self, channel: u8) {
        self.base_channel = channel.min(15);
    }

    pub fn base_note(&self) -> u8 {
        self.base_note
    }

    pub fn set_base_note(&mut self, note: u8) {
        self.base_note = note.min(127);
    }

    pub fn note_map(&self) -> NoteMap {
        self.note_map
    }

    pub fn set_note_map(&mut self, note_map: NoteMap) {
        self.note_map = note_map;
    }

    pub fn is_local_keyboard(&self) -> bool {
        self.local_keyboard
    }

    pub fn set_local_keyboard(&mut self, local_keyboard: bool) {
        self.local_keyboard = local_keyboard;
    }

    pub fn is_alternate_wheel(&self) -> bool {
        self.alternate_wheel
    }

    pub fn set_alternate_wheel(&mut self, alternate_wheel: bool) {
        self.alternate_wheel = alternate_wheel;
    }

    pub fn is_omni(&self) -> bool {
        self.omni
    }

    pub fn set_omni(&mut self, omni: bool) {
        self.omni = omni;
    }

    /// True when each voice goes to its own output instead of the stereo mix.
    pub fn is_mono(&self) -> bool {
        self.mono
    }

    pub fn set_mono(&mut self, mono: bool) {
        self.mono = mono;
    }

    /// Number of soloed voices.
    pub fn soloed_count(&self) -> usize {
        self.soloed
    }

    pub fn is_solo_active(&self) -> bool {
        self.soloed > 0
    }

    pub fn solo(&mut self, voice: usize, soloed: bool) {
        let Some(target) = self.voices.get_mut(voice) else {
            return;
        };
        if target.is_soloed() == soloed {
            return;
        }
        target.set_soloed(soloed);
        if soloed {
            self.soloed += 1;
        } else {
            self.soloed -= 1;
        }
    }

    /// Triggers a voice and chokes its partner when linked.
    pub fn note_on(&mut self, voice: usize, velocity: u8) {
        let globals = self.globals();
        let Some(target) = self.voices.get_mut(voice) else {
            return;
        };
        target.note_on(velocity, &globals);
        let partner = target.linked();
        if self.linked {
            if let Some(partner) = partner.and_then(|p| self.voices.get_mut(p)) {
                partner.silence();
            }
        }
    }

    pub fn note_off(&mut self, voice: usize) {
        if let Some(target) = self.voices.get_mut(voice) {
            target.note_off();
        }
    }

    pub fn silence(&mut self, voice: usize) {
        if let Some(target) = self.voices.get_mut(voice) {
            target.silence();
        }
    }

    pub fn all_sound_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.note_off();
            voice.silence();
        }
    }

    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.silence();
        }
    }

    /// Puts every voice back to its default parameters and centers the wheels.
    pub fn reset_controllers(&mut self) {
        self.transpose_wheel = 0.0;
        self.stretch_wheel = 0.0;
        let defaults = VoicePreset::default();
        let globals = self.globals();
        for voice in self.voices.iter_mut() {
            voice.recall_preset(&defaults, &globals);
        }
        for id in 0..self.voices.len() {
            self.solo(id, false);
        }
    }

    /// Applies a change to one voice parameter, composing with engine values
    /// where needed.
    pub fn set_parameter(&mut self, voice: usize, parameter: VoiceParameter, value: ParameterValue) {
        if parameter == VoiceParameter::Soloed {
            if let ParameterValue::Flag(soloed) = value {
                self.solo(voice, soloed);
            }
            return;
        }
        let globals = self.globals();
        let Some(target) = self.voices.get_mut(voice) else {
            return;
        };
        match (parameter, value) {
            (VoiceParameter::Start, ParameterValue::Number(v)) => target.set_start(v),
            (VoiceParameter::StartSoft, ParameterValue::Flag(v)) => target.set_start_soft(v),
            (VoiceParameter::Transpose, ParameterValue::Number(v)) => {
                target.set_transpose(v, &globals)
            }
            (VoiceParameter::Stretch, ParameterValue::Number(v)) => target.set_stretch(v, &globals),
            (VoiceParameter::Drive, ParameterValue::Number(v)) => target.set_drive(v),
            (VoiceParameter::FilterFrequency, ParameterValue::Number(v)) => {
                target.set_filter_frequency(v)
            }
            (VoiceParameter::FilterResonance, ParameterValue::Number(v)) => {
                target.set_filter_resonance(v)
            }
            (VoiceParameter::Decay, ParameterValue::Number(v)) => target.set_decay(v),
            (VoiceParameter::Panning, ParameterValue::Number(v)) => target.set_panning(v),
            (VoiceParameter::Volume, ParameterValue::Number(v)) => target.set_volume(v, &globals),
            (VoiceParameter::FilterActive, ParameterValue::Flag(v)) => target.set_filter_active(v),
            (VoiceParameter::OverdriveActive, ParameterValue::Flag(v)) => {
                target.set_overdrive_active(v)
            }
            (VoiceParameter::TransposeVelocity, ParameterValue::Number(v)) => {
                target.set_transpose_velocity(v)
            }
            (VoiceParameter::TransposeRandom, ParameterValue::Number(v)) => {
                target.set_transpose_random(v)
            }
            (VoiceParameter::StretchVelocity, ParameterValue::Number(v)) => {
                target.set_stretch_velocity(v)
            }
            (VoiceParameter::StretchType, ParameterValue::Stretch(v)) => target.set_stretch_type(v),
            (VoiceParameter::FilterType, ParameterValue::Filter(v)) => target.set_filter_type(v),
            (VoiceParameter::FilterVelocity, ParameterValue::Number(v)) => {
                target.set_filter_velocity(v)
            }
            (VoiceParameter::FilterRandom, ParameterValue::Number(v)) => {
                target.set_filter_random(v)
            }
            (VoiceParameter::PanningVelocity, ParameterValue::Number(v)) => {
                target.set_panning_velocity(v)
            }
            (VoiceParameter::PanningRandom, ParameterValue::Number(v)) => {
                target.set_panning_random(v)
            }
            (VoiceParameter::VolumeVelocity, ParameterValue::Number(v)) => {
                target.set_volume_velocity(v)
            }
            (VoiceParameter::DecayType, ParameterValue::Decay(v)) => target.set_decay_type(v),
            (VoiceParameter::Muted, ParameterValue::Flag(v)) => target.set_muted(v),
            _ => {}
        }
    }

    /// Applies one control event.
    pub fn handle_event(&mut self, event: ControlEvent) {
        let channel = event.channel();
        let accepted = self.omni || channel == self.base_channel;
        match event {
            ControlEvent::NoteOn { note, velocity, .. } if accepted => {
                if let Some(voice) = self.note_map.voice(self.base_note, note) {
                    if velocity == 0 {
                        self.note_off(voice);
                    } else {
                        self.note_on(voice, velocity);
                    }
                }
            }
            ControlEvent::NoteOff { note, .. } if accepted => {
                if let Some(voice) = self.note_map.voice(self.base_note, note) {
                    self.note_off(voice);
                }
            }
            ControlEvent::Controller {
                controller, value, ..
            } => {
                if accepted && self.engine_controller(controller, value) {
                    return;
                }
                let page = if channel == self.base_channel {
                    Page::A
                } else if channel as u16 == self.base_channel as u16 + 1 {
                    Page::B
                } else {
                    return;
                };
                if let Some((parameter, voice)) = VoiceParameter::from_controller(page, controller)
                {
                    self.set_parameter(voice, parameter, self.controller_value(parameter, value));
                }
            }
            ControlEvent::ProgramChange { program, .. } if accepted => {
                self.recall_program(program as usize);
            }
            ControlEvent::PitchWheel { value, .. } if accepted => {
                if self.alternate_wheel {
                    self.set_stretch_wheel(STRETCH.from_pitch_wheel(value));
                } else {
                    self.set_transpose_wheel(TRANSPOSE.from_pitch_wheel(value));
                }
            }
            _ => {}
        }
    }

    /// Returns true when the controller addressed the engine.
    fn engine_controller(&mut self, number: u8, value: u8) -> bool {
        match number {
            controller::VOLUME => self.set_volume(gain::VOLUME.from_controller_centered(value)),
            controller::LINKED => self.set_linked(controller_to_bool(value)),
            controller::TRANSPOSE => self.set_transpose(TRANSPOSE.from_controller_centered(value)),
            controller::STRETCH => self.set_stretch(STRETCH.from_controller_centered(value)),
            controller::ALL_SOUND_OFF => self.all_sound_off(),
            controller::RESET_ALL_CONTROLLERS => self.reset_controllers(),
            controller::LOCAL_KEYBOARD => self.set_local_keyboard(controller_to_bool(value)),
            controller::ALL_NOTES_OFF => self.all_notes_off(),
            controller::OMNI_OFF => self.set_omni(false),
            controller::OMNI_ON => self.set_omni(true),
            controller::MONO_ON => self.set_mono(true),
            controller::POLY_ON => self.set_mono(false),
            _ => return false,
        }
        true
    }

    fn controller_value(&self, parameter: VoiceParameter, value: u8) -> ParameterValue {
        let amount = || ParameterValue::Number(modulation::AMOUNT.from_controller(value));
        let flag = || ParameterValue::Flag(controller_to_bool(value));
        match parameter {
            VoiceParameter::Start => ParameterValue::Number(START.from_controller(value)),
            VoiceParameter::Transpose => {
                ParameterValue::Number(TRANSPOSE.from_controller_centered(value))
            }
            VoiceParameter::Stretch => {
                ParameterValue::Number(STRETCH.from_controller_centered(value))
            }
            VoiceParameter::Drive => ParameterValue::Number(overdrive::DRIVE.from_controller(value)),
            VoiceParameter::FilterFrequency => ParameterValue::Number(
                filter::frequency_range(self.sample_rate).from_controller(value),
            ),
            VoiceParameter::FilterResonance => {
                ParameterValue::Number(filter::RESONANCE.from_controller(value))
            }
            VoiceParameter::Decay => ParameterValue::Number(envelope::DECAY.from_controller(value)),
            VoiceParameter::Panning => {
                ParameterValue::Number(panner::PANNING.from_controller_centered(value))
            }
            VoiceParameter::Volume => {
                ParameterValue::Number(gain::VOLUME.from_controller_centered(value))
            }
            VoiceParameter::StartSoft
            | VoiceParameter::FilterActive
            | VoiceParameter::OverdriveActive
            | VoiceParameter::Muted
            | VoiceParameter::Soloed => flag(),
            VoiceParameter::StretchType => ParameterValue::Stretch(
                StretchType::ALL[controller_to_index(value, StretchType::ALL.len())],
            ),
            VoiceParameter::FilterType => ParameterValue::Filter(
                FilterType::ALL[controller_to_index(value, FilterType::ALL.len())],
            ),
            VoiceParameter::DecayType => ParameterValue::Decay(
                DecayType::ALL[controller_to_index(value, DecayType::ALL.len())],
            ),
            VoiceParameter::TransposeVelocity
            | VoiceParameter::TransposeRandom
            | VoiceParameter::StretchVelocity
            | VoiceParameter::FilterVelocity
            | VoiceParameter::FilterRandom
            | VoiceParameter::PanningVelocity
            | VoiceParameter::PanningRandom
            | VoiceParameter::VolumeVelocity => amount(),
        }
    }

    /// Renders every voice and, in stereo mode, mixes them into the left and
    /// right buffers.
    pub fn render(&mut self) {
        let solo_active = self.is_solo_active();
        if self.mono {
            for voice in self.voices.iter_mut() {
                voice.render(solo_active);
            }
            return;
        }

        self.left.fill(0.0);
        self.right.fill(0.0);
        for voice in self.voices.iter_mut() {
            voice.render(solo_active);
            voice
                .panner()
                .mix_into(voice.buffer(), &mut self.left, &mut self.right);
        }
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Replaces a voice's pipeline and returns the previous one.
    pub fn swap_pipeline(
        &mut self,
        voice: usize,
        pipeline: Box<VoicePipeline>,
    ) -> Result<Box<VoicePipeline>, Box<VoicePipeline>> {
        let globals = self.globals();
        match self.voices.get_mut(voice) {
            Some(target) => Ok(target.swap_pipeline(pipeline, &globals)),
            None => Err(pipeline),
        }
    }

    pub fn save_preset(&self) -> EnginePreset {
        EnginePreset {
            volume: self.volume,
            transpose: self.transpose,
            stretch: self.stretch,
            linked: self.linked,
            base_channel: self.base_channel,
            base_note: self.base_note,
            note_map: self.note_map,
            local_keyboard: self.local_keyboard,
            alternate_wheel: self.alternate_wheel,
            omni: self.omni,
            mono: self.mono,
        }
    }

    pub fn recall_preset(&mut self, preset: &EnginePreset) {
        self.volume = gain::VOLUME.clamp(preset.volume);
        self.transpose = TRANSPOSE.clamp(preset.transpose);
        self.stretch = STRETCH.clamp(preset.stretch);
        self.set_linked(preset.linked);
        self.set_base_channel(preset.base_channel);
        self.set_base_note(preset.base_note);
        self.set_note_map(preset.note_map);
        self.set_local_keyboard(preset.local_keyboard);
        self.set_alternate_wheel(preset.alternate_wheel);
        self.set_omni(preset.omni);
        self.set_mono(preset.mono);
        self.push_globals();
    }

    /// Captures the whole instrument.
    pub fn snapshot(&self, name: &str) -> Preset {
        Preset {
            name: name.to_string(),
            engine: self.save_preset(),
            voices: self.voices.iter().map(Voice::save_preset).collect(),
        }
    }

    /// Restores the engine and as many voices as the preset describes.
    pub fn recall(&mut self, preset: &Preset) {
        self.recall_preset(&preset.engine);
        let globals = self.globals();
        for (voice, values) in self.voices.iter_mut().zip(preset.voices.iter()) {
            voice.recall_preset(values, &globals);
        }
        for (id, values) in preset.voices.iter().enumerate().take(self.voices.len()) {
            self.solo(id, values.soloed);
        }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Installs the bank recalled by program changes.
    pub fn set_presets(&mut self, presets: Vec<Preset>) {
        self.presets = presets;
    }

    /// Recalls a preset from the bank. Out of range programs are ignored.
    pub fn recall_program(&mut self, program: usize) {
        let presets = mem::take(&mut self.presets);
        if let Some(preset) = presets.get(program) {
            self.recall(preset);
        }
        self.presets = presets;
    }
}

/// A decoded controller value on its way to a voice setter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    Number(f32),
    Flag(bool),
    Stretch(StretchType),
    Filter(FilterType),
    Decay(DecayType),
}
