use comfy_table::{ContentArrangement, Table};

pub fn run() -> Result<(), String> {
    let sim = super::default_model()?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Name", "Kind", "Unit", "Reads"]);

    for (position, view) in sim.order().enumerate() {
        let reads: Vec<String> = view
            .equation()
            .inputs()
            .into_iter()
            .filter_map(|id| sim.view(id).map(|input| input.name().to_string()))
            .collect();
        let reads = if reads.is_empty() {
            "-".to_string()
        } else {
            reads.join(", ")
        };
        table.add_row(vec![
            (position + 1).to_string(),
            view.name().to_string(),
            view.kind().to_string(),
            view.unit().to_string(),
            reads,
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} equations in evaluation order", sim.order().count());

    Ok(())
}
