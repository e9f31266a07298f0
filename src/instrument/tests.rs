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

use super::routing::controller;
use super::*;
use crate::dsp::envelope::State;
use crate::dsp::{DecayType, FilterType, RandomSource};
use crate::pipeline::{self, PullSource, ResampleQuality};
use crate::samples::SampleBuffer;
use crate::testutil::audio_test_utils::{calculate_rms, is_silent};
use crate::testutil::{ramp, sine};

const RATE: u32 = 44100;
const BLOCK: usize = 256;

fn pipeline_for(sample: Option<Arc<SampleBuffer>>) -> Box<pipeline::VoicePipeline> {
    Box::new(pipeline::build(sample, RATE, BLOCK, ResampleQuality::Linear).unwrap())
}

fn engine_with(voices: usize) -> Engine {
    let pipelines = (0..voices)
        .map(|_| pipeline_for(Some(ramp(RATE, RATE as usize))))
        .collect();
    Engine::new(RATE, BLOCK, pipelines, RandomSource::seeded(7))
}

fn note_on(note: u8, velocity: u8) -> ControlEvent {
    ControlEvent::NoteOn {
        channel: 0,
        note,
        velocity,
    }
}

fn cc(channel: u8, controller: u8, value: u8) -> ControlEvent {
    ControlEvent::Controller {
        channel,
        controller,
        value,
    }
}

#[test]
fn plays_raw_frames_and_ignores_note_off_when_infinite() {
    let mut engine = engine_with(1);
    engine.handle_event(note_on(routing::MIDDLE_C, 100));
    engine.render();

    let voice = engine.voice(0).unwrap();
    assert!(!is_silent(voice.buffer()));
    for (i, sample) in voice.buffer().iter().enumerate() {
        assert!((sample - i as f32 / RATE as f32).abs() < 1e-6);
    }
    assert_eq!(engine.left(), voice.buffer());
    assert_eq!(engine.right(), voice.buffer());

    engine.handle_event(ControlEvent::NoteOff {
        channel: 0,
        note: routing::MIDDLE_C,
    });
    engine.render();
    let voice = engine.voice(0).unwrap();
    assert_eq!(voice.envelope().state(), State::Sustain);
    for (i, sample) in voice.buffer().iter().enumerate() {
        assert!((sample - (BLOCK + i) as f32 / RATE as f32).abs() < 1e-6);
    }
}

#[test]
fn trigger_decay_finishes_after_its_length() {
    let mut engine = engine_with(1);
    {
        let voice = engine.voice_mut(0).unwrap();
        voice.set_decay_type(DecayType::Trigger);
        voice.set_decay(0.1);
    }
    engine.note_on(0, 127);

    let decay_frames = 4410;
    let mut rendered = 0;
    while rendered < decay_frames {
        engine.render();
        rendered += BLOCK;
    }

    assert!(engine.voice(0).unwrap().envelope().is_finished());
    for _ in 0..4 {
        engine.render();
        assert!(is_silent(engine.voice(0).unwrap().buffer()));
        assert!(is_silent(engine.left()));
    }
}

#[test]
fn linked_voice_chokes_its_partner() {
    let (open, closed) = CHOKE_PAIR;
    let mut engine = engine_with(VOICE_COUNT);
    assert!(engine.is_linked());

    engine.note_on(closed, 127);
    engine.render();
    assert!(!is_silent(engine.voice(closed).unwrap().buffer()));

    engine.note_on(open, 127);
    assert_eq!(
        engine.voice(closed).unwrap().envelope().state(),
        State::Off
    );
    engine.render();
    assert!(is_silent(engine.voice(closed).unwrap().buffer()));
    assert!(!is_silent(engine.voice(open).unwrap().buffer()));
}

#[test]
fn unlinked_engine_does_not_choke() {
    let (open, closed) = CHOKE_PAIR;
    let mut engine = engine_with(VOICE_COUNT);
    engine.handle_event(cc(0, controller::LINKED, 0));
    assert!(!engine.is_linked());

    engine.note_on(closed, 127);
    engine.note_on(open, 127);
    engine.render();
    assert!(!is_silent(engine.voice(closed).unwrap().buffer()));
}

#[test]
fn solo_silences_other_voices_until_cleared() {
    let mut engine = engine_with(3);
    engine.solo(0, true);
    engine.solo(1, true);
    engine.solo(1, true);
    assert_eq!(engine.soloed_count(), 2);

    engine.note_on(2, 127);
    for _ in 0..3 {
        engine.render();
        assert!(is_silent(engine.voice(2).unwrap().buffer()));
    }

    engine.solo(0, false);
    engine.solo(1, false);
    assert_eq!(engine.soloed_count(), 0);
    engine.render();
    assert!(!is_silent(engine.voice(2).unwrap().buffer()));
}

#[test]
fn panning_splits_the_stereo_mix() {
    let mut engine = engine_with(1);
    engine.voice_mut(0).unwrap().set_panning(1.0);
    engine.note_on(0, 127);
    engine.render();

    let voice = engine.voice(0).unwrap().buffer().to_vec();
    assert!(is_silent(engine.left()));
    for (right, sample) in engine.right().iter().zip(voice.iter()) {
        assert_eq!(*right, sample * 2.0);
    }
}

#[test]
fn low_pass_filter_removes_high_frequencies() {
    let rms_after_settling = |filtered: bool| {
        let pipelines = vec![pipeline_for(Some(sine(RATE, 10000.0, RATE as usize)))];
        let mut engine = Engine::new(RATE, BLOCK, pipelines, RandomSource::seeded(7));
        if filtered {
            let voice = engine.voice_mut(0).unwrap();
            voice.set_filter_frequency(500.0);
            voice.set_filter_active(true);
        }
        engine.note_on(0, 127);
        let mut rendered = Vec::new();
        for block in 0..4 {
            engine.render();
            if block > 0 {
                rendered.extend_from_slice(engine.left());
            }
        }
        calculate_rms(&rendered)
    };

    let dry = rms_after_settling(false);
    let wet = rms_after_settling(true);
    assert!(dry > 0.1);
    assert!(wet < dry * 0.1, "dry {} wet {}", dry, wet);
}

#[test]
fn decay_shortened_by_controller_mid_segment_finishes() {
    let mut engine = engine_with(1);
    {
        let voice = engine.voice_mut(0).unwrap();
        voice.set_decay_type(DecayType::Trigger);
        voice.set_decay(0.5);
    }
    engine.note_on(0, 127);
    for _ in 0..16 {
        engine.render();
    }
    assert_eq!(engine.voice(0).unwrap().envelope().state(), State::Decay);

    engine.handle_event(cc(0, VoiceParameter::Decay.controller(0), 0));
    engine.render();
    assert!(engine.voice(0).unwrap().envelope().is_finished());
    assert!(is_silent(engine.left()));
}

#[test]
fn unmuted_voice_stops_feeding_the_mix_after_choke() {
    let (open, closed) = CHOKE_PAIR;
    let mut engine = engine_with(VOICE_COUNT);
    engine.note_on(closed, 127);
    engine.render();

    engine.handle_event(cc(1, VoiceParameter::Muted.controller(closed), 127));
    engine.render();
    assert!(is_silent(engine.left()));
    engine.handle_event(cc(1, VoiceParameter::Muted.controller(closed), 0));
    engine.render();
    assert!(!is_silent(engine.left()));

    engine.voice_mut(open).unwrap().set_muted(true);
    engine.note_on(open, 127);
    for _ in 0..3 {
        engine.render();
        assert!(is_silent(engine.voice(closed).unwrap().buffer()));
        assert!(is_silent(engine.left()));
        assert!(is_silent(engine.right()));
    }
}

#[test]
fn stretched_voice_without_sample_is_finished_at_once() {
    let mut engine = Engine::new(RATE, BLOCK, vec![pipeline_for(None)], RandomSource::seeded(7));
    let globals = engine.globals();
    engine.voice_mut(0).unwrap().set_stretch(2.0, &globals);
    engine.note_on(0, 127);

    let voice = engine.voice(0).unwrap();
    assert!(voice.pipeline().is_finished());
    engine.render();
    assert!(is_silent(engine.left()));
    assert!(!engine.voice(0).unwrap().is_playing());
}

#[test]
fn volume_velocity_from_midi_scales_the_mix() {
    let level = |velocity: u8| {
        let mut engine = engine_with(1);
        engine.handle_event(cc(1, VoiceParameter::VolumeVelocity.controller(0), 127));
        engine.handle_event(note_on(routing::MIDDLE_C, velocity));
        engine.render();
        calculate_rms(engine.left())
    };

    let loud = level(127);
    let soft = level(32);
    assert!(loud > 0.0);
    assert!(soft < loud * 0.5, "loud {} soft {}", loud, soft);
}

#[test]
fn panning_random_from_midi_moves_the_voice_off_center() {
    let mut engine = engine_with(1);
    engine.handle_event(cc(1, VoiceParameter::PanningRandom.controller(0), 127));
    engine.handle_event(note_on(routing::MIDDLE_C, 127));
    engine.render();

    assert!(!is_silent(engine.left()) || !is_silent(engine.right()));
    assert_ne!(engine.left(), engine.right());
}

#[test]
fn mono_mode_skips_the_stereo_mix() {
    let mut engine = engine_with(2);
    engine.handle_event(cc(0, controller::MONO_ON, 0));
    assert!(engine.is_mono());

    engine.note_on(1, 127);
    engine.render();
    assert!(is_silent(engine.left()));
    assert!(!is_silent(engine.voice(1).unwrap().buffer()));

    engine.handle_event(cc(0, controller::POLY_ON, 0));
    engine.render();
    assert!(!is_silent(engine.left()));
}

#[test]
fn notes_follow_channel_and_omni() {
    let mut engine = engine_with(2);
    engine.handle_event(cc(5, controller::OMNI_OFF, 0));
    assert!(!engine.is_omni());

    engine.handle_event(ControlEvent::NoteOn {
        channel: 3,
        note: routing::MIDDLE_C,
        velocity: 100,
    });
    assert!(engine.voice(0).unwrap().envelope().is_finished());

    engine.handle_event(note_on(routing::MIDDLE_C + 1, 100));
    assert!(!engine.voice(1).unwrap().envelope().is_finished());

    engine.handle_event(cc(0, controller::OMNI_ON, 0));
    engine.handle_event(ControlEvent::NoteOn {
        channel: 3,
        note: routing::MIDDLE_C,
        velocity: 100,
    });
    assert!(!engine.voice(0).unwrap().envelope().is_finished());
}

#[test]
fn zero_velocity_is_note_off() {
    let mut engine = engine_with(1);
    engine.voice_mut(0).unwrap().set_decay_type(DecayType::Gate);
    engine.handle_event(note_on(routing::MIDDLE_C, 90));
    assert_eq!(engine.voice(0).unwrap().envelope().state(), State::Sustain);

    engine.handle_event(note_on(routing::MIDDLE_C, 0));
    assert_eq!(engine.voice(0).unwrap().envelope().state(), State::Decay);
}

#[test]
fn pads_map_linearly_from_the_base_note() {
    let mut engine = engine_with(VOICE_COUNT);
    engine.set_note_map(NoteMap::Pads);
    engine.set_base_note(36);

    engine.handle_event(note_on(43, 100));
    assert!(!engine.voice(7).unwrap().envelope().is_finished());
    engine.handle_event(note_on(48, 100));
    assert!(engine.voice(0).unwrap().envelope().is_finished());
}

#[test]
fn voice_controllers_use_two_pages() {
    let mut engine = engine_with(VOICE_COUNT);
    engine.set_base_channel(4);

    engine.handle_event(cc(4, VoiceParameter::Volume.controller(2), 127));
    assert_eq!(engine.voice(2).unwrap().volume(), 4.0);

    engine.handle_event(cc(4, VoiceParameter::Panning.controller(3), 63));
    assert_eq!(engine.voice(3).unwrap().panning(), 0.0);

    engine.handle_event(cc(4, VoiceParameter::Transpose.controller(3), 0));
    assert_eq!(engine.voice(3).unwrap().transpose(), -48.0);

    engine.handle_event(cc(5, VoiceParameter::Muted.controller(1), 127));
    assert!(engine.voice(1).unwrap().is_muted());

    engine.handle_event(cc(5, VoiceParameter::FilterType.controller(0), 127));
    assert_eq!(engine.voice(0).unwrap().filter_type(), FilterType::Notch);

    engine.handle_event(cc(5, VoiceParameter::DecayType.controller(0), 50));
    assert_eq!(engine.voice(0).unwrap().decay_type(), DecayType::Trigger);

    engine.handle_event(cc(5, VoiceParameter::Soloed.controller(6), 100));
    assert!(engine.voice(6).unwrap().is_soloed());
    assert_eq!(engine.soloed_count(), 1);

    // Only the base channel and the one above it carry voice controllers.
    engine.handle_event(cc(6, VoiceParameter::Volume.controller(5), 0));
    assert_eq!(engine.voice(5).unwrap().volume(), 1.0);
}

#[test]
fn engine_controllers_compose_into_voices() {
    let mut engine = engine_with(1);
    engine.handle_event(cc(0, controller::VOLUME, 63));
    assert_eq!(engine.volume(), 2.0);

    engine.handle_event(cc(0, controller::TRANSPOSE, 127));
    assert_eq!(engine.transpose(), 48.0);
    assert_eq!(engine.voice(0).unwrap().pipeline().transpose(), 48.0);

    engine.handle_event(cc(0, controller::STRETCH, 0));
    assert_eq!(engine.stretch(), 0.0);
    assert_eq!(engine.voice(0).unwrap().pipeline().source().stretch(), 0.0);
}

#[test]
fn pitch_wheel_drives_transpose_or_stretch() {
    let mut engine = engine_with(1);
    engine.handle_event(ControlEvent::PitchWheel {
        channel: 0,
        value: 8191,
    });
    assert_eq!(engine.transpose_wheel(), 48.0);
    assert_eq!(engine.globals().transpose, 48.0);

    engine.handle_event(ControlEvent::PitchWheel {
        channel: 0,
        value: 0,
    });
    assert_eq!(engine.globals().transpose, 0.0);

    engine.set_alternate_wheel(true);
    engine.handle_event(ControlEvent::PitchWheel {
        channel: 0,
        value: 8191,
    });
    assert_eq!(engine.stretch_wheel(), 2.0);
    assert_eq!(engine.globals().stretch, 3.0);
    assert_eq!(engine.transpose_wheel(), 0.0);
}

#[test]
fn sound_off_and_notes_off_stop_everything() {
    let mut engine = engine_with(3);
    for voice in 0..3 {
        engine.note_on(voice, 100);
    }
    engine.handle_event(cc(0, controller::ALL_NOTES_OFF, 0));
    assert!(engine.voices().iter().all(|v| v.envelope().is_finished()));

    engine.note_on(1, 100);
    engine.handle_event(cc(0, controller::ALL_SOUND_OFF, 0));
    assert!(engine.voices().iter().all(|v| v.envelope().is_finished()));
}

#[test]
fn reset_controllers_restores_voice_defaults() {
    let mut engine = engine_with(2);
    let globals = engine.globals();
    engine.voice_mut(0).unwrap().set_volume(3.0, &globals);
    engine.voice_mut(1).unwrap().set_muted(true);
    engine.solo(1, true);
    engine.set_transpose_wheel(12.0);

    engine.handle_event(cc(0, controller::RESET_ALL_CONTROLLERS, 0));
    assert_eq!(engine.voice(0).unwrap().volume(), 1.0);
    assert!(!engine.voice(1).unwrap().is_muted());
    assert_eq!(engine.soloed_count(), 0);
    assert_eq!(engine.transpose_wheel(), 0.0);
}

#[test]
fn program_change_recalls_from_the_bank() {
    let mut engine = engine_with(2);
    let mut quiet = engine.snapshot("Quiet");
    quiet.engine.volume = 0.5;
    quiet.voices[1].decay_type = DecayType::Gate;
    quiet.voices[1].soloed = true;
    engine.set_presets(vec![Preset::default(), quiet]);

    engine.handle_event(ControlEvent::ProgramChange {
        channel: 0,
        program: 1,
    });
    assert_eq!(engine.volume(), 0.5);
    assert_eq!(engine.voice(1).unwrap().decay_type(), DecayType::Gate);
    assert_eq!(engine.soloed_count(), 1);
    assert_eq!(engine.presets().len(), 2);

    engine.handle_event(ControlEvent::ProgramChange {
        channel: 0,
        program: 9,
    });
    assert_eq!(engine.volume(), 0.5);
}

#[test]
fn snapshot_round_trip() {
    let mut engine = engine_with(2);
    engine.set_volume(0.8);
    engine.set_note_map(NoteMap::Pads);
    engine.set_base_channel(9);
    engine.voice_mut(0).unwrap().set_panning(0.25);
    engine.solo(0, true);
    let snapshot = engine.snapshot("Kit");

    let mut other = engine_with(2);
    other.recall(&snapshot);
    assert_eq!(other.snapshot("Kit"), snapshot);
    assert_eq!(other.soloed_count(), 1);
}

#[test]
fn instrument_tick_applies_swaps_and_events() {
    let (handle, queue) = channel(16, VOICE_COUNT);
    let engine = Engine::new(
        RATE,
        BLOCK,
        vec![pipeline_for(None)],
        RandomSource::seeded(3),
    );
    let mut instrument = Instrument::new(engine, queue);

    handle
        .swap_pipeline(0, pipeline_for(Some(ramp(RATE, RATE as usize))))
        .unwrap();
    handle
        .send_event(note_on(routing::MIDDLE_C, 127))
        .unwrap();
    instrument.tick();

    assert!(!is_silent(instrument.engine().left()));
    assert_eq!(handle.release_retired(), 1);

    // Swaps for voices that do not exist are handed straight back.
    handle.swap_pipeline(5, pipeline_for(None)).unwrap();
    instrument.tick();
    assert_eq!(handle.release_retired(), 1);
}
