/// Tracks simulation time: a monotonic tick counter and elapsed seconds.
///
/// Ticks have variable length; the caller passes the measured wall-time
/// delta to [`SimClock::advance`]. Behavior timers compare against
/// [`SimClock::seconds`], never against the wall clock.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    tick: u64,
    seconds: f64,
}

impl SimClock {
    /// A clock at tick 0, second 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by one tick of `elapsed` seconds. Returns the new tick number.
    ///
    /// Negative or non-finite deltas count as zero.
    pub fn advance(&mut self, elapsed: f64) -> u64 {
        self.tick += 1;
        if elapsed.is_finite() && elapsed > 0.0 {
            self.seconds += elapsed;
        }
        self.tick
    }

    /// Return the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Total simulated seconds since the start of the run.
    pub fn seconds(&self) -> f64 {
        self.seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_initial_state() {
        let clock = SimClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.seconds(), 0.0);
    }

    #[test]
    fn clock_advance_accumulates() {
        let mut clock = SimClock::new();
        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.advance(0.25), 3);
        assert!((clock.seconds() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clock_ignores_bad_deltas() {
        let mut clock = SimClock::new();
        clock.advance(-1.0);
        clock.advance(f64::NAN);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.seconds(), 0.0);
    }
}
