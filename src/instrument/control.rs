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
//! Queues between the control threads and the audio tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use super::event::ControlEvent;
use crate::pipeline::VoicePipeline;

/// A freshly built pipeline for a voice.
pub struct PipelineSwap {
    pub voice: usize,
    pub pipeline: Box<VoicePipeline>,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Control queue is full")]
    Full,

    #[error("Audio tick is no longer running")]
    Disconnected,
}

impl<T> From<TrySendError<T>> for ControlError {
    fn from(e: TrySendError<T>) -> Self {
        match e {
            TrySendError::Full(_) => ControlError::Full,
            TrySendError::Disconnected(_) => ControlError::Disconnected,
        }
    }
}

/// Creates the producer and consumer halves. `capacity` bounds the event
/// queue; the swap queues hold one entry per voice.
pub fn channel(capacity: usize, voices: usize) -> (ControlHandle, ControlQueue) {
    let (event_tx, event_rx) = bounded(capacity);
    let (swap_tx, swap_rx) = bounded(voices);
    let (retired_tx, retired_rx) = bounded(voices * 2);
    (
        ControlHandle {
            events: event_tx,
            swaps: swap_tx,
            retired: retired_rx,
        },
        ControlQueue {
            events: event_rx,
            swaps: swap_rx,
            retired: retired_tx,
        },
    )
}

/// Producer side, used by the MIDI input and the sample loader.
#[derive(Clone)]
pub struct ControlHandle {
    events: Sender<ControlEvent>,
    swaps: Sender<PipelineSwap>,
    retired: Receiver<Box<VoicePipeline>>,
}

impl ControlHandle {
    /// Queues an event without blocking.
    pub fn send_event(&self, event: ControlEvent) -> Result<(), ControlError> {
        Ok(self.events.try_send(event)?)
    }

    /// Queues a pipeline for the given voice.
    pub fn swap_pipeline(
        &self,
        voice: usize,
        pipeline: Box<VoicePipeline>,
    ) -> Result<(), ControlError> {
        Ok(self.swaps.try_send(PipelineSwap { voice, pipeline })?)
    }

    /// Drops pipelines the tick has replaced. Returns how many were released.
    pub fn release_retired(&self) -> usize {
        self.retired.try_iter().count()
    }
}

/// Consumer side, owned by the audio tick.
pub struct ControlQueue {
    events: Receiver<ControlEvent>,
    swaps: Receiver<PipelineSwap>,
    retired: Sender<Box<VoicePipeline>>,
}

impl ControlQueue {
    pub fn try_event(&self) -> Option<ControlEvent> {
        self.events.try_recv().ok()
    }

    pub fn try_swap(&self) -> Option<PipelineSwap> {
        self.swaps.try_recv().ok()
    }

    /// Hands a replaced pipeline back for dropping off the audio thread.
    pub fn retire(&self, pipeline: Box<VoicePipeline>) {
        if let Err(e) = self.retired.try_send(pipeline) {
            warn!(err = %e, "Retired pipeline queue unavailable, dropping in place");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{self, ResampleQuality};

    fn pipeline() -> Box<VoicePipeline> {
        Box::new(pipeline::build(None, 44100, 64, ResampleQuality::Linear).unwrap())
    }

    #[test]
    fn events_arrive_in_order() {
        let (handle, queue) = channel(4, 8);
        for note in 60..63 {
            handle
                .send_event(ControlEvent::NoteOn {
                    channel: 0,
                    note,
                    velocity: 100,
                })
                .unwrap();
        }

        let notes: Vec<u8> = std::iter::from_fn(|| queue.try_event())
            .map(|event| match event {
                ControlEvent::NoteOn { note, .. } => note,
                _ => 0,
            })
            .collect();
        assert_eq!(notes, vec![60, 61, 62]);
    }

    #[test]
    fn full_queue_rejects_events() {
        let (handle, _queue) = channel(1, 8);
        let event = ControlEvent::NoteOff {
            channel: 0,
            note: 60,
        };
        handle.send_event(event).unwrap();
        assert!(matches!(handle.send_event(event), Err(ControlError::Full)));
    }

    #[test]
    fn dropped_queue_disconnects() {
        let (handle, queue) = channel(1, 8);
        drop(queue);
        assert!(matches!(
            handle.swap_pipeline(0, pipeline()),
            Err(ControlError::Disconnected)
        ));
    }

    #[test]
    fn swaps_and_retired_pipelines_round_trip() {
        let (handle, queue) = channel(1, 8);
        handle.swap_pipeline(3, pipeline()).unwrap();

        let swap = queue.try_swap().unwrap();
        assert_eq!(swap.voice, 3);
        queue.retire(swap.pipeline);
        assert!(queue.try_swap().is_none());
        assert_eq!(handle.release_retired(), 1);
        assert_eq!(handle.release_retired(), 0);
    }
}
