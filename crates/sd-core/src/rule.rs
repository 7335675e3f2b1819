use crate::equation::EquationId;
use crate::error::RuleError;

/// Result returned by update rules.
pub type RuleResult = Result<f64, RuleError>;

/// Read-only view handed to a rule during the update phase.
///
/// Only the *current* values of the rule's own equation and of its declared
/// inputs are visible. Reading anything else fails with
/// [`RuleError::Undeclared`].
#[derive(Debug, Clone, Copy)]
pub struct Inputs<'a> {
    current: &'a [f64],
    declared: &'a [EquationId],
    this: EquationId,
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(current: &'a [f64], declared: &'a [EquationId], this: EquationId) -> Self {
        Self {
            current,
            declared,
            this,
        }
    }

    /// Current value of a declared input.
    pub fn get(&self, id: EquationId) -> RuleResult {
        if id == self.this || self.declared.contains(&id) {
            Ok(self.current[id.ordinal()])
        } else {
            Err(RuleError::Undeclared(id))
        }
    }

    /// Current value of the equation being updated.
    pub fn this(&self) -> f64 {
        self.current[self.this.ordinal()]
    }

    /// Sum of the current values of several declared inputs.
    pub fn sum(&self, ids: &[EquationId]) -> RuleResult {
        ids.iter().try_fold(0.0, |acc, id| Ok(acc + self.get(*id)?))
    }

    /// Divide, treating a denominator of exactly zero as a domain error.
    pub fn ratio(&self, numerator: f64, denominator: f64) -> RuleResult {
        checked_div(numerator, denominator)
    }
}

/// Divide, treating a denominator of exactly zero as a domain error.
pub fn checked_div(numerator: f64, denominator: f64) -> RuleResult {
    if denominator == 0.0 {
        Err(RuleError::DivisionByZero)
    } else {
        Ok(numerator / denominator)
    }
}

/// Computes an equation's next value from current values.
///
/// Implemented for every `Fn(&Inputs) -> RuleResult` closure, so most models
/// never name this trait.
pub trait Rule {
    /// Compute the pending value.
    fn compute(&self, inputs: &Inputs<'_>) -> RuleResult;
}

impl<F> Rule for F
where
    F: Fn(&Inputs<'_>) -> RuleResult,
{
    fn compute(&self, inputs: &Inputs<'_>) -> RuleResult {
        self(inputs)
    }
}

/// The canonical stock rule: current value plus inflows minus outflows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSpec {
    inflows: Vec<EquationId>,
    outflows: Vec<EquationId>,
}

impl LevelSpec {
    /// A stock with no flows attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flow that fills the stock.
    pub fn inflow(mut self, id: EquationId) -> Self {
        self.inflows.push(id);
        self
    }

    /// Add a flow that drains the stock.
    pub fn outflow(mut self, id: EquationId) -> Self {
        self.outflows.push(id);
        self
    }

    /// Every flow this stock reads.
    pub fn inputs(&self) -> Vec<EquationId> {
        self.inflows.iter().chain(&self.outflows).copied().collect()
    }
}

impl Rule for LevelSpec {
    fn compute(&self, inputs: &Inputs<'_>) -> RuleResult {
        Ok(inputs.this() + inputs.sum(&self.inflows)? - inputs.sum(&self.outflows)?)
    }
}
