use shared::{
    domain::{TimerPhase, TimerState},
    protocol::{RoomEvent, TimerPayload},
};
use tracing::debug;

use crate::dispatcher::EventEnvelope;

const MAX_FIELD: u32 = 59;

/// Result of one local tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Idle,
    Counted,
    /// The countdown just reached zero. Raised once per run.
    Completed,
}

/// Renders seconds as `mm:ss`. Minutes are not wrapped into hours.
pub fn format_mm_ss(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Shared countdown. Play, pause and stop replicate; ticks stay local to
/// each peer.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    state: TimerState,
    envelope: EventEnvelope,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(TimerState::default().seconds)
    }
}

impl TimerEngine {
    pub fn new(seconds: u32) -> Self {
        Self {
            state: TimerState {
                seconds,
                state: TimerPhase::Paused,
            },
            envelope: EventEnvelope::Idle,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn display(&self) -> String {
        format_mm_ss(self.state.seconds)
    }

    pub fn take_outbound(&mut self) -> Option<RoomEvent> {
        self.envelope.take_ready()
    }

    pub fn play(&mut self) {
        self.state.state = TimerPhase::Play;
        self.envelope
            .arm(RoomEvent::PlayTimer(TimerPayload::from(self.state)));
    }

    pub fn pause(&mut self) {
        self.state.state = TimerPhase::Paused;
        self.envelope
            .arm(RoomEvent::PauseTimer(TimerPayload::from(self.state)));
    }

    pub fn stop(&mut self) {
        self.state = TimerState {
            seconds: 0,
            state: TimerPhase::Stopped,
        };
        self.envelope
            .arm(RoomEvent::StopTimer(TimerPayload::from(self.state)));
    }

    /// Edits the duration from the minute and second fields, each clamped
    /// to `0..=59`. Peers see the new value with the next play.
    pub fn set_duration(&mut self, minutes: u32, seconds: u32) -> bool {
        let total = minutes.min(MAX_FIELD) * 60 + seconds.min(MAX_FIELD);
        if total == self.state.seconds {
            return false;
        }
        self.state.seconds = total;
        true
    }

    pub fn tick(&mut self) -> TimerTick {
        if self.state.state != TimerPhase::Play || self.state.seconds == 0 {
            return TimerTick::Idle;
        }
        self.state.seconds -= 1;
        if self.state.seconds == 0 {
            debug!("timer: countdown complete");
            TimerTick::Completed
        } else {
            TimerTick::Counted
        }
    }

    /// Adopts a peer's timer event. Returns whether local state changed.
    pub fn apply_remote(&mut self, payload: TimerPayload) -> bool {
        let seconds = match payload.state {
            TimerPhase::Stopped => 0,
            _ => payload.seconds.unwrap_or(self.state.seconds),
        };
        let next = TimerState {
            seconds,
            state: payload.state,
        };
        if next == self.state {
            return false;
        }
        debug!(seconds, state = ?payload.state, "timer: adopted remote state");
        self.state = next;
        true
    }
}

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
mod tests;
