use crate::equation::EquationId;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Alias for `Result<T, BuildError>`.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors raised while registering equations or building a simulator.
///
/// A model that fails to build never starts running.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// An equation with the same name is already registered.
    #[error("equation already registered: \"{0}\"")]
    DuplicateName(String),

    /// The declared dependencies contain a cycle. The path starts and ends
    /// with the same equation.
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle {
        /// Equation names along the cycle, in dependency direction.
        path: Vec<String>,
    },

    /// A dependency hint names an equation that was never registered.
    #[error("dependency hint for unknown equation \"{0}\"")]
    UnknownEquation(String),

    /// A dependency hint references an unregistered upstream equation.
    #[error("\"{equation}\" depends on unknown equation \"{dependency}\"")]
    UnknownDependency {
        /// The equation declaring the dependency.
        equation: String,
        /// The unresolved upstream name.
        dependency: String,
    },

    /// A delay names an upstream equation that was never registered.
    #[error("delay \"{delay}\" reads unknown equation \"{upstream}\"")]
    UnknownUpstream {
        /// The delay equation.
        delay: String,
        /// The unresolved upstream name.
        upstream: String,
    },

    /// A handle that was not issued by this builder.
    #[error("equation handle {0} does not belong to this model")]
    ForeignHandle(EquationId),

    /// A level, rate or auxiliary was registered but never given a rule.
    #[error("equation \"{0}\" has no update rule")]
    MissingRule(String),

    /// A rule was attached to an equation that already has one, or to a
    /// delay or parameter.
    #[error("equation \"{0}\" cannot take an update rule")]
    NotDefinable(String),

    /// A delay horizon is not a positive finite number, or spans more than
    /// [`MAX_DELAY_TICKS`](crate::delay::MAX_DELAY_TICKS) ticks.
    #[error("delay \"{name}\" has invalid horizon {horizon}")]
    InvalidHorizon {
        /// The delay equation.
        name: String,
        /// The rejected horizon.
        horizon: f64,
    },

    /// The configured time step is not a positive finite number.
    #[error("invalid time step {0}")]
    InvalidTimeStep(f64),

    /// The default stop condition was left in place with a non-finite
    /// duration, so the run would never end.
    #[error("invalid duration {0}")]
    InvalidDuration(f64),

    /// A parameter's metadata is inconsistent (min > max, default out of
    /// range, or negative step).
    #[error("invalid parameter \"{0}\"")]
    InvalidParameter(String),

    /// The initialization hook failed.
    #[error("initialization failed: {0}")]
    Seed(#[from] LookupError),
}

/// Errors raised when a client queries the simulator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    /// No equation is registered under this name.
    #[error("unknown equation: \"{0}\"")]
    UnknownEquation(String),

    /// The equation does not have logging enabled.
    #[error("equation \"{0}\" is not logging")]
    NotLogging(String),

    /// A log index past the end of the recorded series.
    #[error("log index {index} out of range for \"{equation}\" (len {len})")]
    LogIndexOutOfRange {
        /// The queried equation.
        equation: String,
        /// The requested index.
        index: usize,
        /// Number of logged entries.
        len: usize,
    },
}

/// Errors an update rule can report back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// Division by a value that is exactly zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The rule read an equation it did not declare as an input.
    #[error("read of undeclared input {0}")]
    Undeclared(EquationId),
}

/// Errors raised while a simulation is running.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// An update produced NaN or an infinity. The run is aborted.
    #[error("\"{equation}\" diverged to {value} at tick {tick}")]
    NumericDivergence {
        /// The offending equation.
        equation: String,
        /// Tick during which the update ran.
        tick: u64,
        /// The non-finite value.
        value: f64,
    },

    /// A rule divided by exactly zero. The run is aborted.
    #[error("\"{equation}\" divided by zero at tick {tick}")]
    DivisionByZero {
        /// The offending equation.
        equation: String,
        /// Tick during which the update ran.
        tick: u64,
    },

    /// A rule read an equation missing from its declared inputs. The run is
    /// aborted.
    #[error("\"{equation}\" read undeclared input \"{input}\"")]
    UndeclaredInput {
        /// The offending equation.
        equation: String,
        /// Name of the equation that was read.
        input: String,
    },

    /// The run was aborted by an earlier failure.
    #[error("simulation aborted")]
    Aborted,

    /// A parameter was set outside its declared range.
    #[error("parameter \"{name}\" = {value} outside [{min}, {max}]")]
    ParameterOutOfRange {
        /// Parameter name.
        name: String,
        /// Rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// The named equation is not a parameter.
    #[error("\"{0}\" is not a parameter")]
    NotAParameter(String),

    /// A lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
