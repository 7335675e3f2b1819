use serde::{Deserialize, Serialize};

/// Run-level settings shared by every model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated time units per tick.
    pub time_step: f64,
    /// Default stop condition: the run ends once simulated time exceeds this.
    pub duration: f64,
    /// Simulated time at tick 0.
    pub start_time: f64,
    /// Event log cap; the oldest events are evicted past it. 0 keeps all.
    pub max_events: usize,
    /// Initial capacity reserved for each equation log.
    pub log_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0,
            duration: 100.0,
            start_time: 0.0,
            max_events: 0,
            log_capacity: 512,
        }
    }
}

impl SimConfig {
    /// Set the simulated time per tick.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the duration used by the default stop condition.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Set the simulated time at tick 0.
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Cap the event log (0 keeps everything).
    pub fn with_max_events(mut self, cap: usize) -> Self {
        self.max_events = cap;
        self
    }

    /// Set the initial log capacity per equation.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_one_hundred_unit_ticks() {
        let config = SimConfig::default();
        assert!((config.time_step - 1.0).abs() < f64::EPSILON);
        assert!((config.duration - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.start_time, 0.0);
        assert_eq!(config.max_events, 0);
        assert_eq!(config.log_capacity, 512);
    }

    #[test]
    fn with_methods_override_each_field() {
        let config = SimConfig::default()
            .with_time_step(2.0)
            .with_duration(365.0)
            .with_start_time(10.0)
            .with_max_events(500)
            .with_log_capacity(64);
        assert!((config.time_step - 2.0).abs() < f64::EPSILON);
        assert!((config.duration - 365.0).abs() < f64::EPSILON);
        assert!((config.start_time - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.max_events, 500);
        assert_eq!(config.log_capacity, 64);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "duration": 52.0 }"#).unwrap();
        assert!((config.duration - 52.0).abs() < f64::EPSILON);
        assert!((config.time_step - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.log_capacity, 512);
    }
}
