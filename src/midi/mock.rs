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
use std::{error::Error, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::debug;

use crate::instrument::{ControlEvent, ControlHandle};

/// A mock device. Events are injected by tests instead of hardware.
#[derive(Clone)]
pub struct Device {
    name: String,
    handle: Arc<Mutex<Option<ControlHandle>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Feeds raw bytes as though they arrived from the port. Returns whether
    /// an event was queued.
    pub fn mock_event(&self, raw: &[u8]) -> bool {
        let handle = self.handle.lock();
        let (Some(handle), Some(event)) = (handle.as_ref(), ControlEvent::parse(raw)) else {
            return false;
        };
        debug!(event = ?event, "Mock MIDI event.");
        handle.send_event(event).is_ok()
    }

    pub fn is_watching(&self) -> bool {
        self.handle.lock().is_some()
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, handle: ControlHandle) -> Result<(), Box<dyn Error>> {
        let mut current = self.handle.lock();
        if current.is_some() {
            return Err("Already watching events.".into());
        }
        *current = Some(handle);
        Ok(())
    }

    fn stop_watch_events(&self) {
        self.handle.lock().take();
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
