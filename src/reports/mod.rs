use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use xrrfit::fitting::{FitOutcome, FitReport};
use xrrfit::model::{FitValue, Layer, LayerStack};

fn nm(v: f64) -> String {
    format!("{:.3}", v * 1e9)
}

fn fit_cell(v: &FitValue, text: String) -> Cell {
    if v.enabled {
        Cell::new(text).fg(Color::Cyan)
    } else {
        Cell::new(text)
    }
}

fn layer_row(layer: &Layer, is_substrate: bool) -> Vec<Cell> {
    let thickness = if is_substrate {
        Cell::new("-")
    } else {
        fit_cell(&layer.thickness, nm(layer.thickness.expected))
    };
    vec![
        Cell::new(&layer.name).add_attribute(Attribute::Bold),
        thickness,
        fit_cell(&layer.density, format!("{:.1}", layer.density.expected)),
        fit_cell(&layer.roughness, nm(layer.roughness.expected)),
        Cell::new(format!("{:.2}", layer.roughness_shape)),
        Cell::new(format!("{:.4e}", layer.delta())),
        Cell::new(format!("{:.4e}", layer.beta())),
    ]
}

/// Layer table; values that take part in the fit are highlighted.
pub fn print_stack(title: &str, stack: &LayerStack) {
    println!("\n{}", title);
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Layer").add_attribute(Attribute::Bold),
        Cell::new("d (nm)"),
        Cell::new("rho (kg/m3)"),
        Cell::new("sigma (nm)"),
        Cell::new("beta_f"),
        Cell::new("delta"),
        Cell::new("beta"),
    ]);
    for i in 1..=6 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for layer in &stack.layers {
        table.add_row(layer_row(layer, false));
    }
    table.add_row(layer_row(&stack.substrate, true));
    println!("{}", table);

    println!(
        "scale {:.2} dB | baseline {:.2} dB | beam {:.4e} | offset {:.4} deg | resolution {:.4e} rad",
        stack.scale.expected,
        stack.baseline.expected,
        stack.beam.expected,
        stack.offset,
        stack.resolution
    );
}

/// One row per free parameter: range and fitted value.
pub fn print_parameters(stack: &LayerStack, report: &FitReport) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![
        Cell::new("Parameter").add_attribute(Attribute::Bold),
        Cell::new("Min"),
        Cell::new("Fitted").fg(Color::Green),
        Cell::new("Max"),
    ]);
    for i in 1..=3 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    let names = stack.parameter_names();
    for ((name, bound), value) in names.iter().zip(stack.bounds()).zip(&report.parameters) {
        if bound.is_fixed() {
            continue;
        }
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.4e}", bound.lo)),
            Cell::new(format!("{:.4e}", value)).fg(Color::Green),
            Cell::new(format!("{:.4e}", bound.hi)),
        ]);
    }
    println!("\n{}", table);
}

pub fn print_outcome(initial: &LayerStack, outcome: &FitOutcome) {
    let status = match outcome {
        FitOutcome::Converged(_) => "Converged",
        FitOutcome::IterationsExhausted(_) => "Iteration budget exhausted",
        FitOutcome::Cancelled(_) => "Cancelled",
        FitOutcome::Failed { .. } => "Failed",
    };
    println!("\n=== FIT RESULT: {} ===", status);

    match outcome {
        FitOutcome::Failed {
            error,
            last_progress,
        } => {
            println!("Error: {}", error);
            if let Some(p) = last_progress {
                println!("Last good state: {}", p.message());
                print_stack("Last good model", &p.stack);
            }
        }
        _ => {
            if let Some(report) = outcome.report() {
                println!("Fitness: {:.6e}", report.best);
                println!("Iterations: {}", report.iterations);
                if let Some(summary) = &report.performance {
                    println!("{}", summary);
                }
                print_parameters(initial, report);
                print_stack("Fitted model", &report.stack);
            }
        }
    }
}
