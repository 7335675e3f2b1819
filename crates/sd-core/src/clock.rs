/// Tracks simulation time: a monotonic tick counter and the simulated time
/// it corresponds to.
///
/// Time is derived from the tick count rather than accumulated, so it does
/// not drift over long runs.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    start_time: f64,
    time_step: f64,
}

impl SimClock {
    /// Create a new clock at tick 0.
    pub fn new(start_time: f64, time_step: f64) -> Self {
        Self {
            tick: 0,
            start_time,
            time_step,
        }
    }

    /// Count one more completed tick and return the new count.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Rewind to tick 0.
    pub fn reset(&mut self) {
        self.tick = 0;
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.start_time + self.tick as f64 * self.time_step
    }

    /// Simulated time per tick.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Simulated time at tick 0.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_tick_zero() {
        let clock = SimClock::new(0.0, 1.0);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.time(), 0.0);
    }

    #[test]
    fn advance_scales_time_by_step() {
        let mut clock = SimClock::new(0.0, 2.0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.advance(), 3);
        assert!((clock.time() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn long_runs_do_not_drift() {
        let mut clock = SimClock::new(5.0, 0.1);
        for _ in 0..10_000 {
            clock.advance();
        }
        assert!((clock.time() - 1005.0).abs() < 1e-9);
    }

    #[test]
    fn reset_returns_to_start_time() {
        let mut clock = SimClock::new(1.0, 1.0);
        clock.advance();
        clock.reset();
        assert_eq!(clock.tick(), 0);
        assert!((clock.time() - 1.0).abs() < f64::EPSILON);
    }
}
