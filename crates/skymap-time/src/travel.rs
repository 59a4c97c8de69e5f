//! Time-travel clock - user-controlled simulated time
//!
//! Plays through time forwards or backwards at one of a fixed set of speeds.
//! Simulated time only advances when the clock is queried.

use std::sync::Arc;

use parking_lot::Mutex;
use skymap_core::{
    Timestamp, MILLIS_PER_DAY, SECONDS_PER_10_MINUTES, SECONDS_PER_DAY, SECONDS_PER_HOUR,
    SECONDS_PER_MINUTE, SECONDS_PER_SECOND, SECONDS_PER_WEEK,
};
use tracing::debug;

use crate::Clock;

/// A playback speed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Speed {
    /// Simulated seconds per wall-clock second; negative runs backwards
    pub rate: f64,
    /// Display label
    pub tag: &'static str,
}

impl Speed {
    const fn new(rate: i64, tag: &'static str) -> Self {
        Speed {
            rate: rate as f64,
            tag,
        }
    }
}

/// Playback speeds, slowest backwards to fastest forwards
pub const SPEEDS: [Speed; 13] = [
    Speed::new(-SECONDS_PER_WEEK, "-1 wk/sec"),
    Speed::new(-SECONDS_PER_DAY, "-1 day/sec"),
    Speed::new(-SECONDS_PER_HOUR, "-1 hr/sec"),
    Speed::new(-SECONDS_PER_10_MINUTES, "-10 min/sec"),
    Speed::new(-SECONDS_PER_MINUTE, "-1 min/sec"),
    Speed::new(-SECONDS_PER_SECOND, "-1 sec/sec"),
    Speed::new(0, "Stopped"),
    Speed::new(SECONDS_PER_SECOND, "1 sec/sec"),
    Speed::new(SECONDS_PER_MINUTE, "1 min/sec"),
    Speed::new(SECONDS_PER_10_MINUTES, "10 min/sec"),
    Speed::new(SECONDS_PER_HOUR, "1 hr/sec"),
    Speed::new(SECONDS_PER_DAY, "1 day/sec"),
    Speed::new(SECONDS_PER_WEEK, "1 wk/sec"),
];

/// Index of the zero-rate entry
pub const STOPPED_INDEX: usize = SPEEDS.len() / 2;

/// Rates at or above this magnitude advance in whole days
const DAY_QUANTIZED_RATE: f64 = SECONDS_PER_DAY as f64;

/// Snapshot of the clock's internal triple
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeTravelState {
    pub speed_index: usize,
    /// Wall time of the last resynchronization
    pub time_last_set: Timestamp,
    pub simulated_time: Timestamp,
}

impl Default for TimeTravelState {
    fn default() -> Self {
        TimeTravelState {
            speed_index: STOPPED_INDEX,
            time_last_set: Timestamp::EPOCH,
            simulated_time: Timestamp::EPOCH,
        }
    }
}

/// Simulated clock driven by the user.
///
/// INVARIANT: the (speed, last-set, simulated) triple is only read or written
/// under one lock, so the render thread never sees a half-applied change.
pub struct TimeTravelClock {
    /// Counts wall time for playback
    wall: Arc<dyn Clock>,
    state: Mutex<TimeTravelState>,
}

impl TimeTravelClock {
    pub fn new(wall: Arc<dyn Clock>) -> Self {
        TimeTravelClock {
            wall,
            state: Mutex::new(TimeTravelState::default()),
        }
    }

    /// Jump to `date` and pause there
    pub fn set_time_travel_date(&self, date: Timestamp) {
        let mut state = self.state.lock();
        Self::pause_locked(&mut state);
        state.time_last_set = self.wall.now();
        state.simulated_time = date;
    }

    /// One step faster into the future (or slower into the past).
    /// Returns false at the fastest forward speed.
    pub fn accelerate(&self) -> bool {
        let mut state = self.state.lock();
        if state.speed_index < SPEEDS.len() - 1 {
            state.speed_index += 1;
            debug!(speed = SPEEDS[state.speed_index].tag, "Accelerating time travel");
            true
        } else {
            debug!("Already at max forward speed");
            false
        }
    }

    /// One step slower into the future (or faster into the past).
    /// Returns false at the fastest backward speed.
    pub fn decelerate(&self) -> bool {
        let mut state = self.state.lock();
        if state.speed_index > 0 {
            state.speed_index -= 1;
            debug!(speed = SPEEDS[state.speed_index].tag, "Decelerating time travel");
            true
        } else {
            debug!("Already at max backward speed");
            false
        }
    }

    pub fn pause(&self) {
        Self::pause_locked(&mut self.state.lock());
    }

    fn pause_locked(state: &mut TimeTravelState) {
        debug!("Pausing time");
        state.speed_index = STOPPED_INDEX;
    }

    pub fn current_speed(&self) -> Speed {
        SPEEDS[self.state.lock().speed_index]
    }

    /// Label for the time-travel speed readout
    pub fn current_speed_tag(&self) -> &'static str {
        self.current_speed().tag
    }

    pub fn speed_index(&self) -> usize {
        self.state.lock().speed_index
    }

    pub fn state(&self) -> TimeTravelState {
        *self.state.lock()
    }
}

impl Clock for TimeTravelClock {
    /// Advance simulated time by the wall time elapsed since the last query.
    ///
    /// At a day per second or faster the step is truncated to whole days so the
    /// sky does not visibly smear. While less than a day has accumulated the
    /// clock reports the old time and keeps `time_last_set`, so the partial
    /// progress is carried into the next query.
    fn now(&self) -> Timestamp {
        let mut state = self.state.lock();
        let now = self.wall.now();
        let elapsed = now - state.time_last_set;
        let rate = SPEEDS[state.speed_index].rate;
        let mut delta = (rate * elapsed as f64) as i64;

        if rate.abs() >= DAY_QUANTIZED_RATE {
            let days = delta / MILLIS_PER_DAY;
            if days == 0 {
                return state.simulated_time;
            }
            delta = days * MILLIS_PER_DAY;
        }

        state.time_last_set = now;
        state.simulated_time = state.simulated_time.saturating_add_millis(delta);
        state.simulated_time
    }
}
