use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use sd_core::{RunStatus, SimEventKind};
use sd_models::flu::{DEAD, INFECTED, STOCKS, total_population};

use super::{colorize_event, format_bar, format_value};
use crate::RunArgs;

pub fn run(args: &RunArgs, every: u64, verbose: bool) -> Result<(), String> {
    if every == 0 {
        return Err("--every must be at least 1".into());
    }
    let mut sim = super::prepare(args)?;
    for name in STOCKS {
        sim.enable_logging(name).map_err(|e| e.to_string())?;
    }
    let expected = total_population(&sim).map_err(|e| e.to_string())?;

    let mut header = vec!["Tick".to_string(), "Day".to_string()];
    header.extend(STOCKS.iter().map(|name| name.to_string()));
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);

    let mut peak_infected = (0, sim.value(INFECTED).map_err(|e| e.to_string())?);
    loop {
        let status = sim
            .step()
            .map_err(|e| format!("simulation error at tick {}: {e}", sim.tick()))?;
        let infected = sim.value(INFECTED).map_err(|e| e.to_string())?;
        if infected > peak_infected.1 {
            peak_infected = (sim.tick(), infected);
        }
        if sim.tick() % every == 0 || status == RunStatus::Ended {
            let mut row = vec![sim.tick().to_string(), format_value(sim.time())];
            for name in STOCKS {
                row.push(format_value(sim.value(name).map_err(|e| e.to_string())?));
            }
            table.add_row(row);
        }
        if status == RunStatus::Ended {
            break;
        }
    }

    // Header
    println!(
        "  {} {}",
        "Flu model".bold(),
        format!(
            "({} days, {} days/tick, {} ticks)",
            args.duration,
            args.time_step,
            sim.tick()
        )
        .dimmed()
    );
    println!();
    println!("{table}");
    println!();

    // Stock summary
    println!("  {}", "Stocks".bold().underline());
    println!();
    let mut summary = Table::new();
    summary.set_content_arrangement(ContentArrangement::Dynamic);
    summary.set_header(vec!["Stock", "Final", "Min", "Max", "Level"]);
    for name in STOCKS {
        let view = sim.lookup(name).map_err(|e| e.to_string())?;
        summary.add_row(vec![
            name.to_string(),
            format_value(view.current()),
            view.min().map_or_else(|| "--".into(), format_value),
            view.max().map_or_else(|| "--".into(), format_value),
            format_bar(view.normalized_value()),
        ]);
    }
    println!("{summary}");
    println!();

    let total = total_population(&sim).map_err(|e| e.to_string())?;
    println!(
        "  Peak infected: {} on day {}",
        format_value(peak_infected.1),
        format_value(sim.clock().start_time() + peak_infected.0 as f64 * sim.clock().time_step())
    );
    println!(
        "  Deaths: {}",
        format_value(sim.value(DEAD).map_err(|e| e.to_string())?)
    );
    if (total - expected).abs() > 1e-6 {
        println!(
            "  {} population drifted from {} to {}",
            "WARN".yellow().bold(),
            format_value(expected),
            format_value(total)
        );
    } else {
        println!("  Population conserved: {}", format_value(total));
    }

    // Events
    if verbose {
        println!();
        println!("  {}", "Event Log".bold().underline());
        println!();
        for event in sim.events().iter() {
            let tick_label = format!("[tick {:>3}]", event.tick).dimmed();
            let desc = colorize_event(&event.kind, &event.description);
            println!("  {tick_label} {desc}");
        }
    } else {
        let clamps = sim
            .events()
            .iter()
            .filter(|e| matches!(e.kind, SimEventKind::Clamped { .. }))
            .count();
        if clamps > 0 {
            println!("  {}   {clamps} clamped values", "WARN".yellow().bold());
        }
    }

    Ok(())
}
