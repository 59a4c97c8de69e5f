//! Transitioning composite clock - blends real time and time travel
//!
//! Switching between real time and a time-travel date never jumps: the
//! reported time eases from where it was to where it is going over a fixed
//! wall-clock interval.

use std::sync::Arc;

use parking_lot::Mutex;
use skymap_core::Timestamp;
use tracing::{debug, info};

use crate::{Clock, TimeTravelClock};

/// Wall-clock length of a transition
pub const TRANSITION_TIME_MILLIS: i64 = 2500;

/// Smoothstep between `start` and `end`.
///
/// `lambda` is the fraction of the transition elapsed, in [0, 1]. Both
/// endpoints are reproduced exactly and the slope is zero at each end.
#[inline]
pub fn interpolate(start: f64, end: f64, lambda: f64) -> f64 {
    let lambda2 = lambda * lambda;
    let s = 3.0 * lambda2 - 2.0 * lambda2 * lambda;
    start * (1.0 - s) + end * s
}

fn interpolate_timestamp(start: Timestamp, end: Timestamp, lambda: f64) -> Timestamp {
    // Work relative to `start` to keep full millisecond precision; the span
    // between two extreme instants does not fit in an i64
    let span = (i128::from(end.as_millis()) - i128::from(start.as_millis())) as f64;
    let offset = interpolate(0.0, span, lambda) as i64;
    start.saturating_add_millis(offset)
}

/// Externally visible mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockMode {
    RealTime,
    Transition,
    TimeTravel,
}

/// Mode committed once a transition finishes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransitionTarget {
    RealTime,
    TimeTravel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    RealTime,
    Transition {
        start: Timestamp,
        end: Timestamp,
        /// Real-clock time the transition began
        started_at: Timestamp,
        to: TransitionTarget,
    },
    TimeTravel,
}

impl From<TransitionTarget> for Phase {
    fn from(target: TransitionTarget) -> Self {
        match target {
            TransitionTarget::RealTime => Phase::RealTime,
            TransitionTarget::TimeTravel => Phase::TimeTravel,
        }
    }
}

/// Clock that is either real time, time travel, or easing between them.
///
/// Lock order: this clock's phase lock is taken before the time-travel
/// clock's lock, never the other way round.
pub struct TransitioningCompositeClock {
    time_travel: Arc<TimeTravelClock>,
    real: Arc<dyn Clock>,
    phase: Mutex<Phase>,
}

impl TransitioningCompositeClock {
    pub fn new(time_travel: Arc<TimeTravelClock>, real: Arc<dyn Clock>) -> Self {
        TransitioningCompositeClock {
            time_travel,
            real,
            phase: Mutex::new(Phase::RealTime),
        }
    }

    /// Ease from the current time to `date`, then hold there (paused)
    pub fn go_time_travel(&self, date: Timestamp) {
        let mut phase = self.phase.lock();
        let start = self.current_time(&mut phase);
        self.time_travel.set_time_travel_date(date);
        let started_at = self.real.now();
        info!(from = %start, to = %date, "Starting transition to time travel");
        *phase = Phase::Transition {
            start,
            end: date,
            started_at,
            to: TransitionTarget::TimeTravel,
        };
    }

    /// Ease from the current time back to real time.
    ///
    /// The target is where the real clock will be when the transition ends,
    /// so the hand-over at the end is seamless.
    pub fn return_to_real_time(&self) {
        let mut phase = self.phase.lock();
        let start = self.current_time(&mut phase);
        let started_at = self.real.now();
        let end = started_at.saturating_add_millis(TRANSITION_TIME_MILLIS);
        info!(from = %start, "Starting transition to real time");
        *phase = Phase::Transition {
            start,
            end,
            started_at,
            to: TransitionTarget::RealTime,
        };
    }

    pub fn mode(&self) -> ClockMode {
        match *self.phase.lock() {
            Phase::RealTime => ClockMode::RealTime,
            Phase::Transition { .. } => ClockMode::Transition,
            Phase::TimeTravel => ClockMode::TimeTravel,
        }
    }

    /// The wrapped time-travel clock, for the speed controls
    pub fn time_travel_clock(&self) -> &Arc<TimeTravelClock> {
        &self.time_travel
    }

    fn current_time(&self, phase: &mut Phase) -> Timestamp {
        if let Phase::Transition {
            start,
            end,
            started_at,
            to,
        } = *phase
        {
            let elapsed = self.real.now() - started_at;
            if elapsed > TRANSITION_TIME_MILLIS {
                debug!(?to, "Transition complete");
                *phase = to.into();
            } else {
                let lambda = elapsed.max(0) as f64 / TRANSITION_TIME_MILLIS as f64;
                return interpolate_timestamp(start, end, lambda);
            }
        }

        match *phase {
            Phase::TimeTravel => self.time_travel.now(),
            Phase::RealTime | Phase::Transition { .. } => self.real.now(),
        }
    }
}

impl Clock for TransitioningCompositeClock {
    fn now(&self) -> Timestamp {
        let mut phase = self.phase.lock();
        self.current_time(&mut phase)
    }
}
