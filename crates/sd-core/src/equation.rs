use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delay::DelayLine;
use crate::error::{RuleError, SimError};
use crate::parameter::Parameter;
use crate::rule::{Inputs, Rule};
use crate::series::Series;

/// Handle to a registered equation.
///
/// Stamped with the id of the builder that issued it, so a handle from one
/// model never resolves against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EquationId {
    model: Uuid,
    ordinal: usize,
}

impl EquationId {
    pub(crate) fn new(model: Uuid, ordinal: usize) -> Self {
        Self { model, ordinal }
    }

    #[cfg(test)]
    pub(crate) fn from_ordinal(ordinal: usize) -> Self {
        Self::new(Uuid::nil(), ordinal)
    }

    /// Position of the equation in registration order.
    pub fn ordinal(self) -> usize {
        self.ordinal
    }

    pub(crate) fn model(self) -> Uuid {
        self.model
    }
}

impl fmt::Display for EquationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.ordinal)
    }
}

/// The role an equation plays in a stock-and-flow model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquationKind {
    /// A stock: integrates its flows and carries memory across ticks.
    Level,
    /// A flow consumed by stocks. Recomputed every tick.
    Rate,
    /// A derived quantity. Recomputed every tick.
    Auxiliary,
    /// A lagged copy of one upstream equation.
    Delay,
    /// An externally tuned knob, constant unless set by the client.
    Parameter,
}

impl EquationKind {
    /// Returns `true` for kinds whose value is recomputed from scratch each
    /// tick with no memory of their own.
    pub fn is_algebraic(self) -> bool {
        matches!(self, Self::Rate | Self::Auxiliary)
    }

    /// Returns `true` for kinds that take a client-supplied rule.
    pub fn takes_rule(self) -> bool {
        matches!(self, Self::Level | Self::Rate | Self::Auxiliary)
    }
}

impl fmt::Display for EquationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level => write!(f, "level"),
            Self::Rate => write!(f, "rate"),
            Self::Auxiliary => write!(f, "auxiliary"),
            Self::Delay => write!(f, "delay"),
            Self::Parameter => write!(f, "parameter"),
        }
    }
}

/// A client rule together with the inputs it is allowed to read.
pub(crate) struct Formula {
    pub(crate) inputs: Vec<EquationId>,
    pub(crate) rule: Box<dyn Rule>,
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula")
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// How an equation computes its pending value.
#[derive(Debug)]
pub(crate) enum Behavior {
    Formula(Formula),
    Delay(DelayLine),
    Parameter(Parameter),
}

/// Outcome of a successful update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Update {
    pub(crate) value: f64,
    /// The rule's raw output when the non-negative clamp replaced it.
    pub(crate) clamped_from: Option<f64>,
}

/// Why an update failed, before equation names are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UpdateFailure {
    Rule(RuleError),
    Diverged(f64),
}

impl UpdateFailure {
    pub(crate) fn into_error(self, equations: &[Equation], id: EquationId, tick: u64) -> SimError {
        let equation = equations[id.ordinal()].name.clone();
        match self {
            Self::Rule(RuleError::DivisionByZero) => SimError::DivisionByZero { equation, tick },
            Self::Rule(RuleError::Undeclared(input)) => SimError::UndeclaredInput {
                equation,
                input: equations
                    .get(input.ordinal())
                    .map_or_else(|| input.to_string(), |e| e.name.clone()),
            },
            Self::Diverged(value) => SimError::NumericDivergence {
                equation,
                tick,
                value,
            },
        }
    }
}

/// A named quantity with an update behavior, optional logging, and the
/// running range used to normalize its log.
///
/// Values live in the simulator's double buffer; an `Equation` owns
/// everything else about the quantity.
#[derive(Debug)]
pub struct Equation {
    id: EquationId,
    name: String,
    unit: String,
    kind: EquationKind,
    non_negative: bool,
    initial: f64,
    behavior: Behavior,
    series: Option<Series>,
}

impl Equation {
    pub(crate) fn new(
        id: EquationId,
        name: String,
        unit: String,
        kind: EquationKind,
        non_negative: bool,
        initial: f64,
        behavior: Behavior,
    ) -> Self {
        Self {
            id,
            name,
            unit,
            kind,
            non_negative,
            initial,
            behavior,
            series: None,
        }
    }

    /// Handle of this equation.
    pub fn id(&self) -> EquationId {
        self.id
    }

    /// Unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit label.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Role in the model.
    pub fn kind(&self) -> EquationKind {
        self.kind
    }

    /// Whether negative results are clamped to 0.
    pub fn is_non_negative(&self) -> bool {
        self.non_negative
    }

    /// Value assigned at build and restored on reset.
    pub fn initial(&self) -> f64 {
        self.initial
    }

    /// Equations this one reads, as declared.
    pub fn inputs(&self) -> Vec<EquationId> {
        match &self.behavior {
            Behavior::Formula(formula) => formula.inputs.clone(),
            Behavior::Delay(line) => vec![EquationId::new(self.id.model, line.upstream())],
            Behavior::Parameter(_) => Vec::new(),
        }
    }

    /// Parameter metadata, for parameters.
    pub fn parameter(&self) -> Option<&Parameter> {
        match &self.behavior {
            Behavior::Parameter(parameter) => Some(parameter),
            _ => None,
        }
    }

    /// Delay horizon converted to ticks, for delays.
    pub fn delay_ticks(&self) -> Option<f64> {
        match &self.behavior {
            Behavior::Delay(line) => Some(line.ticks()),
            _ => None,
        }
    }

    /// Logged series, when logging is enabled.
    pub fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    /// Whether logging is enabled.
    pub fn is_logging(&self) -> bool {
        self.series.is_some()
    }

    /// Normalize `value` against the running range. 0 when not logging.
    pub fn normalize(&self, value: f64) -> f64 {
        self.series.as_ref().map_or(0.0, |s| s.normalize(value))
    }

    /// Compute the pending value from committed values.
    ///
    /// The divergence guard runs on the raw rule output, so a negative
    /// infinity is reported rather than clamped away.
    pub(crate) fn update(&mut self, current: &[f64]) -> Result<Update, UpdateFailure> {
        let own = current[self.id.ordinal];
        let raw = match &mut self.behavior {
            Behavior::Formula(formula) => formula
                .rule
                .compute(&Inputs::new(current, &formula.inputs, self.id))
                .map_err(UpdateFailure::Rule)?,
            Behavior::Delay(line) => line.update(current, own),
            Behavior::Parameter(_) => own,
        };
        if !raw.is_finite() {
            return Err(UpdateFailure::Diverged(raw));
        }

        let value = if self.non_negative && raw < 0.0 { 0.0 } else { raw };
        if let Some(series) = &mut self.series {
            series.observe(value);
        }
        Ok(Update {
            value,
            clamped_from: (value != raw).then_some(raw),
        })
    }

    /// Retire the committed value into the log and advance internal state.
    pub(crate) fn commit(&mut self, retiring: f64) {
        if let Some(series) = &mut self.series {
            series.push(retiring);
        }
        if let Behavior::Delay(line) = &mut self.behavior {
            line.commit();
        }
    }

    /// Start a fresh log with unset range bounds.
    pub(crate) fn log_data(&mut self, capacity: usize) {
        self.series = Some(Series::with_capacity(capacity));
    }

    /// Stop logging and discard the log. Returns `true` if a log was dropped.
    pub(crate) fn reset_log(&mut self) -> bool {
        self.series.take().is_some()
    }

    /// Fold a value assigned outside the update phase into the running range.
    pub(crate) fn observe(&mut self, value: f64) {
        if let Some(series) = &mut self.series {
            series.observe(value);
        }
    }

    /// Drop the log and refill any delay pipeline for a fresh run.
    pub(crate) fn restart(&mut self) {
        self.series = None;
        if let Behavior::Delay(line) = &mut self.behavior {
            line.reset();
        }
    }
}
