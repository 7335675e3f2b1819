use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer::StateBuffer;
use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::equation::{Equation, EquationId, EquationKind};
use crate::error::{BuildResult, LookupError, SimError, SimResult};
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::parameter::Parameter;

pub(crate) type StopPredicate = Box<dyn Fn(&Simulator) -> bool>;
pub(crate) type InitHook = Box<dyn FnMut(&mut Seeder<'_>) -> Result<(), LookupError>>;

/// Where a simulator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Built and seeded; no tick has run yet.
    Built,
    /// At least one tick has completed and the stop condition has not held.
    Running,
    /// The stop condition held. Further steps do nothing.
    Ended,
    /// A tick failed. Further steps return [`SimError::Aborted`].
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Built => write!(f, "built"),
            Self::Running => write!(f, "running"),
            Self::Ended => write!(f, "ended"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Write access handed to the initialization hook.
///
/// Values set here bypass the rules and become the starting point of the
/// first tick.
pub struct Seeder<'a> {
    by_name: &'a HashMap<String, usize>,
    buffer: &'a mut StateBuffer,
    events: &'a mut EventLog,
    tick: u64,
}

impl Seeder<'_> {
    /// Set both the current and pending value of an equation.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), LookupError> {
        let index = self.index(name)?;
        self.buffer.set(index, value);
        self.record(name, value);
        Ok(())
    }

    /// Set only the current value of an equation.
    pub fn set_current(&mut self, name: &str, value: f64) -> Result<(), LookupError> {
        let index = self.index(name)?;
        self.buffer.set_current(index, value);
        self.record(name, value);
        Ok(())
    }

    /// Set only the pending value of an equation.
    pub fn set_pending(&mut self, name: &str, value: f64) -> Result<(), LookupError> {
        let index = self.index(name)?;
        self.buffer.set_pending(index, value);
        self.record(name, value);
        Ok(())
    }

    /// Current value of an equation.
    pub fn value(&self, name: &str) -> Result<f64, LookupError> {
        Ok(self.buffer.current()[self.index(name)?])
    }

    fn index(&self, name: &str) -> Result<usize, LookupError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| LookupError::UnknownEquation(name.to_string()))
    }

    fn record(&mut self, name: &str, value: f64) {
        self.events.push(SimEvent::new(
            self.tick,
            SimEventKind::Seeded {
                equation: name.to_string(),
                value,
            },
            format!("{name} seeded with {value}"),
        ));
    }
}

impl fmt::Debug for Seeder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seeder")
            .field("tick", &self.tick)
            .field("equations", &self.buffer.len())
            .finish()
    }
}

/// Read-only view of one equation and its values.
#[derive(Debug, Clone, Copy)]
pub struct EquationView<'a> {
    equation: &'a Equation,
    buffer: &'a StateBuffer,
}

impl<'a> EquationView<'a> {
    /// The underlying equation.
    pub fn equation(&self) -> &'a Equation {
        self.equation
    }

    /// Handle of the equation.
    pub fn id(&self) -> EquationId {
        self.equation.id()
    }

    /// Unique name.
    pub fn name(&self) -> &'a str {
        self.equation.name()
    }

    /// Unit label.
    pub fn unit(&self) -> &'a str {
        self.equation.unit()
    }

    /// Role in the model.
    pub fn kind(&self) -> EquationKind {
        self.equation.kind()
    }

    /// Value committed by the last completed tick.
    pub fn current(&self) -> f64 {
        self.buffer.current()[self.equation.id().ordinal()]
    }

    /// Value computed for the next tick.
    pub fn pending(&self) -> f64 {
        self.buffer.pending()[self.equation.id().ordinal()]
    }

    /// Current value mapped into `[0, 1]` against the logged range.
    pub fn normalized_value(&self) -> f64 {
        self.equation.normalize(self.current())
    }

    /// Whether logging is enabled.
    pub fn is_logging(&self) -> bool {
        self.equation.is_logging()
    }

    /// Logged values, oldest first, when logging is enabled.
    pub fn log(&self) -> Option<&'a [f64]> {
        self.equation.series().map(|series| series.values())
    }

    /// Smallest value seen since logging was enabled.
    pub fn min(&self) -> Option<f64> {
        self.equation.series().and_then(|series| series.min())
    }

    /// Largest value seen since logging was enabled.
    pub fn max(&self) -> Option<f64> {
        self.equation.series().and_then(|series| series.max())
    }

    /// Log entry `index` mapped into `[0, 1]`.
    ///
    /// Returns 0 without indexing while logging is off or the range is
    /// degenerate.
    pub fn normalized_logged_value(&self, index: usize) -> Result<f64, LookupError> {
        let Some(series) = self.equation.series() else {
            return Ok(0.0);
        };
        if series.span().is_none() {
            return Ok(0.0);
        }
        series
            .values()
            .get(index)
            .map(|value| series.normalize(*value))
            .ok_or_else(|| LookupError::LogIndexOutOfRange {
                equation: self.name().to_string(),
                index,
                len: series.len(),
            })
    }

    /// Parameter metadata, for parameters.
    pub fn parameter(&self) -> Option<&'a Parameter> {
        self.equation.parameter()
    }
}

/// A built model: the registry, its resolved evaluation order, the state
/// buffer and the clock.
///
/// Every tick runs in two phases. The update phase calls each rule in
/// resolved order against the committed values and writes the pending
/// slot. The commit phase then retires the committed values into the logs
/// and promotes pending to current. A failure in the update phase aborts
/// the run before anything is committed.
pub struct Simulator {
    config: SimConfig,
    equations: Vec<Equation>,
    by_name: HashMap<String, usize>,
    order: Vec<usize>,
    buffer: StateBuffer,
    clock: SimClock,
    status: RunStatus,
    events: EventLog,
    stop: StopPredicate,
    init: InitHook,
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("tick", &self.clock.tick())
            .field("status", &self.status)
            .field("equations", &self.equations.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Simulator {
    pub(crate) fn new(
        config: SimConfig,
        equations: Vec<Equation>,
        by_name: HashMap<String, usize>,
        order: Vec<usize>,
        stop: StopPredicate,
        init: InitHook,
    ) -> BuildResult<Self> {
        let buffer = StateBuffer::new(equations.iter().map(Equation::initial).collect());
        let clock = SimClock::new(config.start_time, config.time_step);
        let events = EventLog::new(config.max_events);
        let mut sim = Self {
            config,
            equations,
            by_name,
            order,
            buffer,
            clock,
            status: RunStatus::Built,
            events,
            stop,
            init,
        };

        let count = sim.equations.len();
        log::info!("built model with {count} equations");
        log::debug!(
            "evaluation order: {}",
            sim.order().map(|view| view.name()).collect::<Vec<_>>().join(", ")
        );
        sim.events.push(SimEvent::new(
            0,
            SimEventKind::Built { equations: count },
            format!("resolved {count} equations"),
        ));
        sim.seed()?;
        Ok(sim)
    }

    /// Run one tick.
    ///
    /// Returns the status after the tick. On an ended run this does nothing
    /// and returns [`RunStatus::Ended`].
    pub fn step(&mut self) -> SimResult<RunStatus> {
        match self.status {
            RunStatus::Ended => return Ok(RunStatus::Ended),
            RunStatus::Aborted => return Err(SimError::Aborted),
            RunStatus::Built | RunStatus::Running => {}
        }

        let tick = self.clock.tick();
        if let Err(err) = self.update_phase(tick) {
            return Err(self.abort(err));
        }
        self.commit_phase();
        self.clock.advance();
        self.status = RunStatus::Running;

        if (self.stop)(self) {
            self.status = RunStatus::Ended;
            let time = self.clock.time();
            log::info!("run ended at time {time} after {} ticks", self.clock.tick());
            self.events.push(SimEvent::new(
                self.clock.tick(),
                SimEventKind::Ended { time },
                format!("stop condition held at time {time}"),
            ));
        }
        Ok(self.status)
    }

    /// Run up to `n` ticks, stopping early if the run ends.
    pub fn run(&mut self, n: u64) -> SimResult<RunStatus> {
        let mut status = self.status;
        for _ in 0..n {
            status = self.step()?;
            if status == RunStatus::Ended {
                break;
            }
        }
        Ok(status)
    }

    /// Step until the stop condition holds. Returns the number of ticks run
    /// by this call.
    pub fn run_to_completion(&mut self) -> SimResult<u64> {
        let start = self.clock.tick();
        while self.step()? != RunStatus::Ended {}
        Ok(self.clock.tick() - start)
    }

    fn update_phase(&mut self, tick: u64) -> SimResult<()> {
        for &index in &self.order {
            let (current, pending) = self.buffer.split_mut();
            let update = self.equations[index].update(current).map_err(|failure| {
                failure.into_error(&self.equations, self.equations[index].id(), tick)
            })?;
            pending[index] = update.value;

            if let Some(raw) = update.clamped_from {
                let name = self.equations[index].name();
                log::debug!("clamped \"{name}\" from {raw} to 0 at tick {tick}");
                self.events.push(SimEvent::new(
                    tick,
                    SimEventKind::Clamped {
                        equation: name.to_string(),
                        raw,
                    },
                    format!("{name} clamped from {raw} to 0"),
                ));
            }
        }
        Ok(())
    }

    fn commit_phase(&mut self) {
        for &index in &self.order {
            let retiring = self.buffer.current()[index];
            self.equations[index].commit(retiring);
        }
        self.buffer.commit();
    }

    fn abort(&mut self, err: SimError) -> SimError {
        self.status = RunStatus::Aborted;
        let reason = err.to_string();
        log::error!("run aborted: {reason}");
        self.events.push(SimEvent::new(
            self.clock.tick(),
            SimEventKind::Aborted {
                reason: reason.clone(),
            },
            reason,
        ));
        err
    }

    fn seed(&mut self) -> Result<(), LookupError> {
        let mut seeder = Seeder {
            by_name: &self.by_name,
            buffer: &mut self.buffer,
            events: &mut self.events,
            tick: self.clock.tick(),
        };
        (self.init)(&mut seeder)
    }

    fn index(&self, name: &str) -> Result<usize, LookupError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| LookupError::UnknownEquation(name.to_string()))
    }

    fn view_at(&self, index: usize) -> EquationView<'_> {
        EquationView {
            equation: &self.equations[index],
            buffer: &self.buffer,
        }
    }

    /// Look up an equation by name.
    pub fn lookup(&self, name: &str) -> Result<EquationView<'_>, LookupError> {
        Ok(self.view_at(self.index(name)?))
    }

    /// Look up an equation by handle. Handles issued for another model
    /// resolve to nothing.
    pub fn view(&self, id: EquationId) -> Option<EquationView<'_>> {
        self.equations
            .get(id.ordinal())
            .filter(|equation| equation.id() == id)
            .map(|_| self.view_at(id.ordinal()))
    }

    /// Current value of an equation.
    pub fn value(&self, name: &str) -> Result<f64, LookupError> {
        Ok(self.buffer.current()[self.index(name)?])
    }

    /// Logged values of an equation.
    pub fn log(&self, name: &str) -> Result<&[f64], LookupError> {
        self.lookup(name)?
            .log()
            .ok_or_else(|| LookupError::NotLogging(name.to_string()))
    }

    /// Start logging an equation with a fresh log and unset range.
    ///
    /// Enabling after the first tick is allowed but records a
    /// [`SimEventKind::LoggingMisuse`] warning, since the log will not cover
    /// the ticks already run.
    pub fn enable_logging(&mut self, name: &str) -> Result<(), LookupError> {
        let index = self.index(name)?;
        self.enable_logging_at(index);
        Ok(())
    }

    /// Start logging every equation.
    pub fn enable_logging_all(&mut self) {
        for index in 0..self.equations.len() {
            self.enable_logging_at(index);
        }
    }

    fn enable_logging_at(&mut self, index: usize) {
        let tick = self.clock.tick();
        let name = self.equations[index].name().to_string();
        if tick > 0 {
            let reason = format!("logging enabled after {tick} ticks; earlier ticks are not recorded");
            log::warn!("\"{name}\": {reason}");
            self.events.push(SimEvent::new(
                tick,
                SimEventKind::LoggingMisuse {
                    equation: name.clone(),
                    reason: reason.clone(),
                },
                reason,
            ));
        }
        self.equations[index].log_data(self.config.log_capacity);
        self.events.push(SimEvent::new(
            tick,
            SimEventKind::LoggingEnabled {
                equation: name.clone(),
            },
            format!("logging {name}"),
        ));
    }

    /// Stop logging an equation and discard its log.
    pub fn disable_logging(&mut self, name: &str) -> Result<(), LookupError> {
        let index = self.index(name)?;
        if self.equations[index].reset_log() {
            self.events.push(SimEvent::new(
                self.clock.tick(),
                SimEventKind::LoggingDisabled {
                    equation: name.to_string(),
                },
                format!("stopped logging {name}"),
            ));
        }
        Ok(())
    }

    /// Change a parameter. The new value is visible to rules from the next
    /// tick on.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> SimResult<()> {
        let index = self.index(name)?;
        let equation = &mut self.equations[index];
        let Some(parameter) = equation.parameter() else {
            return Err(SimError::NotAParameter(name.to_string()));
        };
        if !parameter.contains(value) {
            return Err(SimError::ParameterOutOfRange {
                name: name.to_string(),
                value,
                min: parameter.min,
                max: parameter.max,
            });
        }

        let from = self.buffer.current()[index];
        self.buffer.set(index, value);
        equation.observe(value);
        log::debug!("parameter \"{name}\" changed from {from} to {value}");
        self.events.push(SimEvent::new(
            self.clock.tick(),
            SimEventKind::ParameterChanged {
                name: name.to_string(),
                from,
                to: value,
            },
            format!("{name}: {from} -> {value}"),
        ));
        Ok(())
    }

    /// Every parameter, in registration order.
    pub fn parameters(&self) -> impl Iterator<Item = EquationView<'_>> {
        self.equations()
            .filter(|view| view.kind() == EquationKind::Parameter)
    }

    /// Every equation, in registration order.
    pub fn equations(&self) -> impl Iterator<Item = EquationView<'_>> {
        (0..self.equations.len()).map(|index| self.view_at(index))
    }

    /// Every equation, in evaluation order.
    pub fn order(&self) -> impl Iterator<Item = EquationView<'_>> {
        self.order.iter().map(|&index| self.view_at(index))
    }

    /// Restart the run with the same structure.
    ///
    /// Equations return to their initial values, delay pipelines refill,
    /// logging is switched off, the clock rewinds and the initialization hook
    /// runs again. Parameters keep their current setting.
    ///
    /// If the initialization hook fails the run is aborted, since the
    /// state is only partly seeded.
    pub fn reset(&mut self) -> SimResult<()> {
        let values: Vec<f64> = self
            .equations
            .iter()
            .map(|equation| match equation.kind() {
                EquationKind::Parameter => self.buffer.current()[equation.id().ordinal()],
                _ => equation.initial(),
            })
            .collect();
        for equation in &mut self.equations {
            equation.restart();
        }
        self.buffer = StateBuffer::new(values);
        self.clock.reset();
        self.status = RunStatus::Built;
        log::info!("run reset");
        self.events
            .push(SimEvent::new(0, SimEventKind::Reset, "run reset"));
        if let Err(err) = self.seed() {
            return Err(self.abort(err.into()));
        }
        Ok(())
    }

    /// Simulated time.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Run status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns `true` once the stop condition has held.
    pub fn is_ended(&self) -> bool {
        self.status == RunStatus::Ended
    }

    /// Events recorded so far.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// The configuration the model was built with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
