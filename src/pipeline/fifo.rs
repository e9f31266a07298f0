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
/// Mono FIFO backed by a preallocated vector with a read position.
///
/// Consumed frames are compacted away only when a push would otherwise exceed
/// the reserved capacity, so steady-state use never allocates.
#[derive(Debug)]
pub(crate) struct SampleFifo {
    buffer: Vec<f32>,
    read_pos: usize,
}

impl SampleFifo {
    pub(crate) fn with_capacity(capacity: usize) -> SampleFifo {
        SampleFifo {
            buffer: Vec::with_capacity(capacity),
            read_pos: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[f32] {
        &self.buffer[self.read_pos..]
    }

    pub(crate) fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
    }

    fn make_room(&mut self, additional: usize) {
        if self.read_pos > 0 && self.buffer.len() + additional > self.buffer.capacity() {
            self.buffer.copy_within(self.read_pos.., 0);
            self.buffer.truncate(self.buffer.len() - self.read_pos);
            self.read_pos = 0;
        }
    }

    pub(crate) fn push_slice(&mut self, frames: &[f32]) {
        self.make_room(frames.len());
        self.buffer.extend_from_slice(frames);
    }

    pub(crate) fn push_silence(&mut self, count: usize) {
        self.make_room(count);
        self.buffer.resize(self.buffer.len() + count, 0.0);
    }

    /// Drops up to `count` frames from the front.
    pub(crate) fn consume(&mut self, count: usize) {
        self.read_pos = (self.read_pos + count).min(self.buffer.len());
        if self.read_pos == self.buffer.len() {
            self.clear();
        }
    }

    /// Moves frames into `out` and returns how many were copied.
    pub(crate) fn read_into(&mut self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.len());
        out[..count].copy_from_slice(&self.buffer[self.read_pos..self.read_pos + count]);
        self.consume(count);
        count
    }
}
