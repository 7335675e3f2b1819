use std::path::Path;

use sd_core::Simulator;

use crate::RunArgs;

pub fn run(args: &RunArgs, format: &str, output: Option<&Path>) -> Result<(), String> {
    if !matches!(format, "json" | "csv") {
        return Err(format!("unsupported format: \"{format}\". Use: json, csv"));
    }

    let mut sim = super::prepare(args)?;
    sim.enable_logging_all();
    sim.run_to_completion()
        .map_err(|e| format!("simulation error: {e}"))?;

    let content = match format {
        "json" => export_json(&sim)?,
        _ => export_csv(&sim),
    };

    if let Some(path) = output {
        std::fs::write(path, &content)
            .map_err(|e| format!("cannot write to {}: {e}", path.display()))?;
        println!("  Exported to {}", path.display());
    } else {
        print!("{content}");
    }

    Ok(())
}

/// Simulated time of every logged entry.
fn times(sim: &Simulator) -> Vec<f64> {
    let clock = sim.clock();
    (0..sim.tick())
        .map(|tick| clock.start_time() + tick as f64 * clock.time_step())
        .collect()
}

fn export_json(sim: &Simulator) -> Result<String, String> {
    let series: serde_json::Map<String, serde_json::Value> = sim
        .equations()
        .map(|view| {
            let entry = serde_json::json!({
                "kind": view.kind(),
                "unit": view.unit(),
                "values": view.log().unwrap_or_default(),
            });
            (view.name().to_string(), entry)
        })
        .collect();

    let export = serde_json::json!({
        "model": "flu",
        "status": sim.status(),
        "ticks": sim.tick(),
        "time_step": sim.clock().time_step(),
        "time": times(sim),
        "series": series,
    });

    serde_json::to_string_pretty(&export).map_err(|e| format!("JSON serialization error: {e}"))
}

fn export_csv(sim: &Simulator) -> String {
    let mut out = String::from("time");
    for view in sim.equations() {
        out.push(',');
        out.push_str(view.name());
    }
    out.push('\n');

    let logs: Vec<&[f64]> = sim
        .equations()
        .map(|view| view.log().unwrap_or_default())
        .collect();
    for (row, time) in times(sim).into_iter().enumerate() {
        out.push_str(&time.to_string());
        for log in &logs {
            out.push(',');
            if let Some(value) = log.get(row) {
                out.push_str(&value.to_string());
            }
        }
        out.push('\n');
    }
    out
}
