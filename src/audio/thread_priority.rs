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
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Priority for the audio callback thread when PULSEKIT_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

/// Reads PULSEKIT_THREAD_PRIORITY (0-99). Call it while building the stream,
/// never from the callback.
pub fn callback_thread_priority() -> ThreadPriority {
    let value = std::env::var("PULSEKIT_THREAD_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_CALLBACK_THREAD_PRIORITY);
    match ThreadPriorityValue::try_from(value) {
        Ok(value) => ThreadPriority::Crossplatform(value),
        Err(_) => ThreadPriority::Max,
    }
}

pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Whether to request SCHED_FIFO for the callback thread. Opt out with
/// PULSEKIT_DISABLE_RT_AUDIO=1.
pub fn rt_audio_enabled() -> bool {
    !env_flag("PULSEKIT_DISABLE_RT_AUDIO")
}

/// Raises the priority of whichever thread first calls `apply`.
pub struct CallbackPriority {
    priority: ThreadPriority,
    rt_audio: bool,
    applied: bool,
}

impl CallbackPriority {
    /// Captures the settings from the environment.
    pub fn from_env() -> CallbackPriority {
        CallbackPriority {
            priority: callback_thread_priority(),
            rt_audio: rt_audio_enabled(),
            applied: false,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Does nothing after the first call.
    pub fn apply(&mut self) {
        if self.applied {
            return;
        }
        self.applied = true;

        if let Err(e) = set_current_thread_priority(self.priority) {
            warn!(err = ?e, "Unable to raise audio callback thread priority");
        }

        #[cfg(unix)]
        if self.rt_audio {
            use thread_priority::unix::{
                set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
                ThreadSchedulePolicy,
            };
            match set_thread_priority_and_policy(
                thread_native_id(),
                self.priority,
                ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
            ) {
                Ok(()) => info!("Enabled RT SCHED_FIFO for audio callback thread"),
                Err(e) => warn!(err = ?e, "Failed to set RT SCHED_FIFO for audio callback thread"),
            }
        }
    }
}
