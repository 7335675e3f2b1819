//! Discrete-tick stock-and-flow simulation engine.
//!
//! A model is a network of named equations (levels, rates, auxiliaries,
//! delays and parameters) registered through a [`ModelBuilder`]. Building
//! resolves an evaluation order from declared inputs and dependency hints,
//! and yields a [`Simulator`] that advances the model one tick at a time
//! against a double-buffered state: every rule reads the values committed by
//! the previous tick and never a value computed during the current one.

/// Double-buffered current/pending state.
pub mod buffer;
/// Model registration and build.
pub mod builder;
/// Simulation clock for tracking ticks and simulated time.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Delay equations: first-order smoothing and transport pipelines.
pub mod delay;
/// Equations, their kinds and handles.
pub mod equation;
/// Error types for the engine.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Externally tunable parameters.
pub mod parameter;
/// Dependency hints and evaluation-order resolution.
pub mod resolver;
/// Update rules and the input view they read from.
pub mod rule;
/// Logged time series with running range normalization.
pub mod series;
/// The tick loop and client query surface.
pub mod simulator;

/// Re-export of [`buffer::StateBuffer`].
pub use buffer::StateBuffer;
/// Re-export of [`builder::ModelBuilder`].
pub use builder::ModelBuilder;
/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-export of [`config::SimConfig`].
pub use config::SimConfig;
/// Re-exports of [`delay::DelayKind`], [`delay::DelaySpec`] and [`delay::MAX_DELAY_TICKS`].
pub use delay::{DelayKind, DelaySpec, MAX_DELAY_TICKS};
/// Re-exports of [`equation::Equation`], [`equation::EquationId`], and [`equation::EquationKind`].
pub use equation::{Equation, EquationId, EquationKind};
/// Re-exports of the error enums and result aliases.
pub use error::{BuildError, BuildResult, LookupError, RuleError, SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-export of [`parameter::Parameter`].
pub use parameter::Parameter;
/// Re-export of [`resolver::Dependencies`].
pub use resolver::Dependencies;
/// Re-exports of the rule types.
pub use rule::{Inputs, LevelSpec, Rule, RuleResult, checked_div};
/// Re-exports of [`series::Series`] and [`series::ALMOST_ZERO`].
pub use series::{ALMOST_ZERO, Series};
/// Re-exports of [`simulator::Simulator`] and its views.
pub use simulator::{EquationView, RunStatus, Seeder, Simulator};
