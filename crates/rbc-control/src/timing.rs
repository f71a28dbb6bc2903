//! Phase timer: named wall-clock durations recorded per call.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Duration of the last run of each named phase.
pub type ElapsedTimes = HashMap<&'static str, Duration>;

/// Source of monotonic time stamps.
pub trait Clock: Send {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// `Instant`-backed clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Records the duration of named phases, overwriting the previous value of a phase.
pub struct PhaseTimer {
    clock: Box<dyn Clock>,
    elapsed: ElapsedTimes,
}

impl PhaseTimer {
    /// Timer on the monotonic clock with `phases` pre-registered at zero.
    pub fn new(phases: &[&'static str]) -> Self {
        Self::with_clock(Box::new(MonotonicClock::new()), phases)
    }

    /// Timer on a custom clock with `phases` pre-registered at zero.
    pub fn with_clock(clock: Box<dyn Clock>, phases: &[&'static str]) -> Self {
        Self {
            clock,
            elapsed: phases.iter().map(|&p| (p, Duration::ZERO)).collect(),
        }
    }

    /// Replace the clock, keeping recorded durations.
    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    /// Time stamp marking the start of a phase.
    #[inline]
    pub fn start(&self) -> Duration {
        self.clock.now()
    }

    /// Record `phase` as having run since `started`.
    #[inline]
    pub fn stop(&mut self, phase: &'static str, started: Duration) {
        let d = self.clock.now().saturating_sub(started);
        self.elapsed.insert(phase, d);
    }

    /// Durations of the last run of every phase.
    pub fn elapsed(&self) -> &ElapsedTimes {
        &self.elapsed
    }

    /// Reset every registered phase to zero.
    pub fn clear(&mut self) {
        self.elapsed.values_mut().for_each(|d| *d = Duration::ZERO);
    }
}

impl fmt::Debug for PhaseTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseTimer")
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::Clock;
    use std::cell::Cell;
    use std::time::Duration;

    /// Clock advancing by a fixed step on every read.
    pub struct StepClock {
        now: Cell<Duration>,
        step: Duration,
    }

    impl StepClock {
        pub fn new(step: Duration) -> Self {
            Self {
                now: Cell::new(Duration::ZERO),
                step,
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> Duration {
            let t = self.now.get() + self.step;
            self.now.set(t);
            t
        }
    }
}
