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
use std::sync::Arc;

use super::preset::VoicePreset;
use crate::dsp::filter::{frequency_range, RESONANCE};
use crate::dsp::{gain, panner};
use crate::dsp::{
    DecayType, Envelope, FilterBank, FilterType, Gain, Overdrive, Panner, RandomSource, Velocity,
    VelocityRandom,
};
use crate::pipeline::{
    stretch::STRETCH, transposer::TRANSPOSE, wave::START, PullSource, StretchType, VoicePipeline,
};
use crate::samples::SampleBuffer;

/// Engine-wide values every voice composes its own parameters with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Globals {
    /// Offset plus wheel, in semitones.
    pub transpose: f32,
    /// Offset plus wheel.
    pub stretch: f32,
    pub volume: f32,
}

impl Default for Globals {
    fn default() -> Self {
        Globals {
            transpose: TRANSPOSE.default,
            stretch: STRETCH.default,
            volume: gain::VOLUME.default,
        }
    }
}

/// One sample player with its own processing chain.
pub struct Voice {
    id: usize,
    sample_rate: u32,
    pipeline: Box<VoicePipeline>,
    envelope: Envelope,
    filter: FilterBank,
    overdrive: Overdrive,
    gain: Gain,
    panner: Panner,
    buffer: Vec<f32>,
    random: RandomSource,

    start: f32,
    transpose: f32,
    stretch: f32,
    volume: f32,
    filter_frequency: f32,
    filter_resonance: f32,
    panning: f32,

    transpose_mod: VelocityRandom,
    stretch_mod: Velocity,
    filter_mod: VelocityRandom,
    panning_mod: VelocityRandom,
    volume_mod: Velocity,

    muted: bool,
    soloed: bool,
    playing: bool,
    linked: Option<usize>,
}

impl Voice {
    /// Creates a voice around a pipeline built for `sample_rate` and `block_size`.
    pub fn new(
        id: usize,
        sample_rate: u32,
        block_size: usize,
        pipeline: Box<VoicePipeline>,
        random: RandomSource,
    ) -> Voice {
        let mut voice = Voice {
            id,
            sample_rate,
            pipeline,
            envelope: Envelope::new(sample_rate),
            filter: FilterBank::new(sample_rate),
            overdrive: Overdrive::default(),
            gain: Gain::default(),
            panner: Panner::default(),
            buffer: vec![0.0; block_size],
            random,
            start: START.default,
            transpose: TRANSPOSE.default,
            stretch: STRETCH.default,
            volume: gain::VOLUME.default,
            filter_frequency: frequency_range(sample_rate).default,
            filter_resonance: RESONANCE.default,
            panning: panner::PANNING.default,
            transpose_mod: VelocityRandom::new(TRANSPOSE),
            stretch_mod: Velocity::default(),
            filter_mod: VelocityRandom::new(frequency_range(sample_rate)),
            panning_mod: VelocityRandom::new(panner::PANNING),
            volume_mod: Velocity::default(),
            muted: false,
            soloed: false,
            playing: false,
            linked: None,
        };
        voice.push_pipeline(&Globals::default());
        voice
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Output of the last render.
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    /// True while the voice is producing sound.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn pipeline(&self) -> &VoicePipeline {
        &self.pipeline
    }

    pub fn sample(&self) -> Option<&Arc<SampleBuffer>> {
        self.pipeline.source().source().sample()
    }

    pub fn mix_left(&self) -> f32 {
        self.panner.mix_left()
    }

    pub fn mix_right(&self) -> f32 {
        self.panner.mix_right()
    }

    pub fn panner(&self) -> &Panner {
        &self.panner
    }

    /// The choke partner, if any.
    pub fn linked(&self) -> Option<usize> {
        self.linked
    }

    pub(super) fn set_linked(&mut self, linked: Option<usize>) {
        self.linked = linked;
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn set_start(&mut self, seconds: f32) {
        self.start = START.clamp(seconds);
        self.pipeline
            .source_mut()
            .source_mut()
            .set_start_time(self.start);
    }

    pub fn start_soft(&self) -> bool {
        self.envelope.soft_start()
    }

    pub fn set_start_soft(&mut self, soft: bool) {
        self.envelope.set_soft_start(soft);
    }

    pub fn transpose(&self) -> f32 {
        self.transpose
    }

    pub fn set_transpose(&mut self, semitones: f32, globals: &Globals) {
        self.transpose = TRANSPOSE.clamp(semitones);
        self.push_transpose(globals);
    }

    pub fn set_transpose_velocity(&mut self, amount: f32) {
        self.transpose_mod.set_sensitivity(amount);
    }

    pub fn set_transpose_random(&mut self, amount: f32) {
        self.transpose_mod.set_random(amount);
    }

    pub fn stretch(&self) -> f32 {
        self.stretch
    }

    pub fn set_stretch(&mut self, stretch: f32, globals: &Globals) {
        self.stretch = STRETCH.clamp(stretch);
        self.push_stretch(globals);
    }

    pub fn set_stretch_velocity(&mut self, amount: f32) {
        self.stretch_mod.set_sensitivity(amount);
    }

    pub fn stretch_type(&self) -> StretchType {
        self.pipeline.source().stretch_type()
    }

    /// Applied on the next trigger.
    pub fn set_stretch_type(&mut self, stretch_type: StretchType) {
        self.pipeline.source_mut().set_stretch_type(stretch_type);
    }

    pub fn drive(&self) -> f32 {
        self.overdrive.drive()
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.overdrive.set_drive(drive);
    }

    pub fn set_overdrive_active(&mut self, active: bool) {
        self.overdrive.set_active(active);
    }

    pub fn filter_frequency(&self) -> f32 {
        self.filter_frequency
    }

    pub fn set_filter_frequency(&mut self, frequency: f32) {
        self.filter_frequency = frequency_range(self.sample_rate).clamp(frequency);
        self.push_filter_frequency();
    }

    pub fn filter_resonance(&self) -> f32 {
        self.filter_resonance
    }

    pub fn set_filter_resonance(&mut self, resonance: f32) {
        self.filter_resonance = RESONANCE.clamp(resonance);
        self.filter.set_resonance(self.filter_resonance);
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter.filter_type()
    }

    /// Each type keeps its own coefficients, so the voice's cutoff and
    /// resonance are pushed into the newly selected one.
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        if self.filter.filter_type() == filter_type {
            return;
        }
        self.filter.set_filter_type(filter_type);
        self.filter.set_resonance(self.filter_resonance);
        self.push_filter_frequency();
    }

    pub fn set_filter_active(&mut self, active: bool) {
        self.filter.set_active(active);
    }

    pub fn set_filter_velocity(&mut self, amount: f32) {
        self.filter_mod.set_sensitivity(amount);
    }

    pub fn set_filter_random(&mut self, amount: f32) {
        self.filter_mod.set_random(amount);
    }

    pub fn decay(&self) -> f32 {
        self.envelope.decay()
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.envelope.set_decay(seconds);
    }

    pub fn decay_type(&self) -> DecayType {
        self.envelope.decay_type()
    }

    pub fn set_decay_type(&mut self, decay_type: DecayType) {
        self.envelope.set_decay_type(decay_type);
    }

    pub fn panning(&self) -> f32 {
        self.panning
    }

    pub fn set_panning(&mut self, panning: f32) {
        self.panning = panner::PANNING.clamp(panning);
        self.push_panning();
    }

    pub fn set_panning_velocity(&mut self, amount: f32) {
        self.panning_mod.set_sensitivity(amount);
    }

    pub fn set_panning_random(&mut self, amount: f32) {
        self.panning_mod.set_random(amount);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32, globals: &Globals) {
        self.volume = gain::VOLUME.clamp(volume);
        self.push_volume(globals);
    }

    pub fn set_volume_velocity(&mut self, amount: f32) {
        self.volume_mod.set_sensitivity(amount);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed
    }

    /// Only the engine toggles solo so it can keep its count.
    pub(super) fn set_soloed(&mut self, soloed: bool) {
        self.soloed = soloed;
    }

    /// Recomposes every parameter that depends on engine values.
    pub fn apply_globals(&mut self, globals: &Globals) {
        self.push_volume(globals);
        self.push_stretch(globals);
        self.push_transpose(globals);
    }

    /// Draws new modulation, pushes changed values and retriggers.
    pub fn note_on(&mut self, velocity: u8, globals: &Globals) {
        self.volume_mod.note_on(velocity);
        self.stretch_mod.note_on(velocity);
        self.transpose_mod.note_on(velocity, &mut self.random);
        self.filter_mod.note_on(velocity, &mut self.random);
        self.panning_mod.note_on(velocity, &mut self.random);

        self.push_volume(globals);
        self.push_stretch(globals);
        self.push_transpose(globals);
        self.push_filter_frequency();
        self.push_panning();

        self.pipeline.reset();
        self.envelope.note_on();
        self.playing = true;
    }

    pub fn note_off(&mut self) {
        self.envelope.note_off();
    }

    /// Stops at once.
    pub fn silence(&mut self) {
        self.envelope.silence();
    }

    /// Renders one block into the voice buffer. `solo_active` is true when any
    /// voice in the engine is soloed.
    pub fn render(&mut self, solo_active: bool) {
        if self.muted
            || (solo_active && !self.soloed)
            || self.pipeline.is_finished()
            || self.envelope.is_finished()
        {
            if self.playing {
                self.buffer.fill(0.0);
                self.playing = false;
            }
            return;
        }

        self.playing = true;
        let written = self.pipeline.receive(&mut self.buffer);
        self.buffer[written..].fill(0.0);
        self.overdrive.filter(&mut self.buffer);
        self.filter.filter(&mut self.buffer);
        self.envelope.filter(&mut self.buffer);
        self.gain.filter(&mut self.buffer);
    }

    /// Installs a new pipeline, pushes the current parameters into it and
    /// stops the voice. Returns the previous pipeline.
    pub fn swap_pipeline(
        &mut self,
        pipeline: Box<VoicePipeline>,
        globals: &Globals,
    ) -> Box<VoicePipeline> {
        let stretch_type = self.stretch_type();
        let previous = std::mem::replace(&mut self.pipeline, pipeline);
        self.pipeline.source_mut().set_stretch_type(stretch_type);
        self.push_pipeline(globals);
        self.silence();
        previous
    }

    pub fn save_preset(&self) -> VoicePreset {
        VoicePreset {
            start: self.start,
            start_soft: self.start_soft(),
            transpose: self.transpose,
            transpose_velocity: self.transpose_mod.sensitivity(),
            transpose_random: self.transpose_mod.random(),
            stretch: self.stretch,
            stretch_velocity: self.stretch_mod.sensitivity(),
            stretch_type: self.stretch_type(),
            drive: self.overdrive.drive(),
            overdrive_active: self.overdrive.is_active(),
            filter_frequency: self.filter_frequency,
            filter_resonance: self.filter_resonance,
            filter_type: self.filter.filter_type(),
            filter_active: self.filter.is_active(),
            filter_velocity: self.filter_mod.sensitivity(),
            filter_random: self.filter_mod.random(),
            decay: self.envelope.decay(),
            decay_type: self.envelope.decay_type(),
            panning: self.panning,
            panning_velocity: self.panning_mod.sensitivity(),
            panning_random: self.panning_mod.random(),
            volume: self.volume,
            volume_velocity: self.volume_mod.sensitivity(),
            muted: self.muted,
            soloed: self.soloed,
        }
    }

    /// Applies every value except solo, which the engine owns.
    pub fn recall_preset(&mut self, preset: &VoicePreset, globals: &Globals) {
        self.set_start(preset.start);
        self.set_start_soft(preset.start_soft);
        self.set_transpose_velocity(preset.transpose_velocity);
        self.set_transpose_random(preset.transpose_random);
        self.set_transpose(preset.transpose, globals);
        self.set_stretch_velocity(preset.stretch_velocity);
        self.set_stretch(preset.stretch, globals);
        self.set_stretch_type(preset.stretch_type);
        self.set_drive(preset.drive);
        self.set_overdrive_active(preset.overdrive_active);
        self.set_filter_type(preset.filter_type);
        self.set_filter_active(preset.filter_active);
        self.set_filter_velocity(preset.filter_velocity);
        self.set_filter_random(preset.filter_random);
        self.set_filter_resonance(preset.filter_resonance);
        self.set_filter_frequency(preset.filter_frequency);
        self.set_decay(preset.decay);
        self.set_decay_type(preset.decay_type);
        self.set_panning_velocity(preset.panning_velocity);
        self.set_panning_random(preset.panning_random);
        self.set_panning(preset.panning);
        self.set_volume_velocity(preset.volume_velocity);
        self.set_volume(preset.volume, globals);
        self.set_muted(preset.muted);
    }

    fn push_pipeline(&mut self, globals: &Globals) {
        self.pipeline
            .source_mut()
            .source_mut()
            .set_start_time(self.start);
        self.push_stretch(globals);
        self.push_transpose(globals);
    }

    fn push_volume(&mut self, globals: &Globals) {
        let volume = self
            .volume_mod
            .modulate(gain::VOLUME.clamp(self.volume * globals.volume));
        if self.gain.volume() != volume {
            self.gain.set_volume(volume);
        }
    }

    fn push_stretch(&mut self, globals: &Globals) {
        let stretch = self
            .stretch_mod
            .modulate(STRETCH.clamp(self.stretch * globals.stretch));
        let stage = self.pipeline.source_mut();
        if stage.stretch() != stretch {
            stage.set_stretch(stretch);
        }
    }

    fn push_transpose(&mut self, globals: &Globals) {
        let transpose = self
            .transpose_mod
            .modulate(TRANSPOSE.clamp(self.transpose + globals.transpose));
        if self.pipeline.transpose() != transpose {
            self.pipeline.set_transpose(transpose);
        }
    }

    fn push_filter_frequency(&mut self) {
        let frequency = self.filter_mod.modulate(self.filter_frequency);
        if self.filter.frequency() != frequency {
            self.filter.set_frequency(frequency);
        }
    }

    fn push_panning(&mut self) {
        let panning = self.panning_mod.modulate(self.panning);
        if self.panner.panning() != panning {
            self.panner.set_panning(panning);
        }
    }
}
