pub mod export;
pub mod order;
pub mod params;
pub mod run;

use colored::Colorize;
use sd_core::{SimEventKind, Simulator};
use sd_models::FluParams;

use crate::RunArgs;

/// Parse a `name=value` parameter override.
pub fn parse_assignment(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got \"{raw}\""))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for \"{name}\": {e}"))?;
    Ok((name.trim().to_string(), value))
}

/// Build the epidemic model and apply the command-line overrides.
fn prepare(args: &RunArgs) -> Result<Simulator, String> {
    let params = FluParams::default()
        .with_duration(args.duration)
        .with_time_step(args.time_step);
    let mut sim = sd_models::flu::build(&params).map_err(|e| format!("model build failed: {e}"))?;
    for (name, value) in &args.overrides {
        log::info!("override {name} = {value}");
        sim.set_parameter(name, *value)
            .map_err(|e| format!("cannot apply --set {name}={value}: {e}"))?;
    }
    Ok(sim)
}

/// Default model, for commands that only inspect its structure.
fn default_model() -> Result<Simulator, String> {
    sd_models::flu::build(&FluParams::default()).map_err(|e| format!("model build failed: {e}"))
}

fn colorize_event(kind: &SimEventKind, description: &str) -> colored::ColoredString {
    match kind {
        SimEventKind::Aborted { .. } => description.red().bold(),
        SimEventKind::LoggingMisuse { .. } => description.yellow(),
        SimEventKind::Clamped { .. } => description.red(),
        SimEventKind::ParameterChanged { .. } => description.cyan(),
        SimEventKind::Seeded { .. } => description.green(),
        SimEventKind::Ended { .. } | SimEventKind::Reset => description.blue(),
        SimEventKind::Built { .. }
        | SimEventKind::LoggingEnabled { .. }
        | SimEventKind::LoggingDisabled { .. } => description.normal(),
    }
}

/// Render a value in `[0, 1]` as a ten-cell bar.
fn format_bar(normalized: f64) -> String {
    let filled = (normalized.clamp(0.0, 1.0) * 10.0).round() as usize;
    let empty = 10_usize.saturating_sub(filled);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));

    if normalized >= 0.85 {
        format!("[{}]", bar.red())
    } else if normalized >= 0.4 {
        format!("[{}]", bar.yellow())
    } else {
        format!("[{}]", bar.green())
    }
}

/// Whole-number quantities print without decimals.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}
