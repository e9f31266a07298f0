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
//! The voices, the engine that mixes them, and the plumbing that feeds
//! control input into the audio tick.
//!
//! Everything reachable from [`Instrument::tick`] runs on the real-time
//! thread. It drains the control queues, renders every voice and mixes the
//! result without allocating or locking.

mod control;
mod engine;
mod event;
mod preset;
pub mod routing;
mod voice;

#[cfg(test)]
mod tests;

pub use control::{channel, ControlError, ControlHandle, ControlQueue, PipelineSwap};
pub use engine::{Engine, ParameterValue, CHOKE_PAIR};
pub use event::ControlEvent;
pub use preset::{EnginePreset, Preset, VoicePreset};
pub use routing::{NoteMap, VoiceParameter, VOICE_COUNT};
pub use voice::{Globals, Voice};

/// Default capacity of the control event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// An engine bound to the consumer side of its control queues.
pub struct Instrument {
    engine: Engine,
    queue: ControlQueue,
}

impl Instrument {
    pub fn new(engine: Engine, queue: ControlQueue) -> Instrument {
        Instrument { engine, queue }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Runs one block: installs pending pipelines, applies queued events in
    /// arrival order, then renders.
    pub fn tick(&mut self) {
        while let Some(swap) = self.queue.try_swap() {
            let retired = match self.engine.swap_pipeline(swap.voice, swap.pipeline) {
                Ok(previous) => previous,
                Err(rejected) => rejected,
            };
            self.queue.retire(retired);
        }
        while let Some(event) = self.queue.try_event() {
            self.engine.handle_event(event);
        }
        self.engine.render();
    }
}
