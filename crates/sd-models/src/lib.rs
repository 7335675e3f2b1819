//! Models built on the `sd-core` engine.
//!
//! Each model module exposes its equation names as constants, a serde
//! parameter struct with the model's defaults, and a `build` function
//! returning a ready-to-run [`sd_core::Simulator`].

/// Epidemic model with incubation, sickness and waning immunity delays.
pub mod flu;

/// Re-exports of [`flu::FluParams`] and [`flu::Plot`].
pub use flu::{FluParams, Plot};
