use comfy_table::{ContentArrangement, Table};

use sd_core::Parameter;
use sd_models::FluParams;

use super::format_value;

pub fn run() -> Result<(), String> {
    let sim = super::default_model()?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Unit", "Default", "Min", "Max", "Step", "Set with"]);

    let run_level = FluParams::run_parameters();
    let rows = run_level
        .iter()
        .map(|p| (p, format!("--{}", p.name.replace('_', "-"))))
        .chain(
            sim.parameters()
                .filter_map(|view| view.parameter())
                .map(|p| (p, format!("--set {}=…", p.name))),
        );
    let mut count = 0;
    for (parameter, flag) in rows {
        table.add_row(row(parameter, flag));
        count += 1;
    }

    println!("{table}");
    println!();
    println!("  {count} parameters");

    Ok(())
}

fn row(parameter: &Parameter, flag: String) -> Vec<String> {
    vec![
        parameter.name.clone(),
        parameter.unit.clone(),
        format_value(parameter.default),
        format_value(parameter.min),
        format_value(parameter.max),
        format_value(parameter.step),
        flag,
    ]
}
