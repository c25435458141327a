//! Simple validation example: check a netlist file and print the feedback.

use umpire::prelude::*;
use std::path::Path;

fn main() -> Result<(), UmpireError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/invalid_amplifier.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_validation [path/to/netlist.json]");
        std::process::exit(1);
    }

    let umpire = Umpire::with_builtin_library()?;
    let text = std::fs::read_to_string(path)?;
    let goals = Goals::new().with("inputType", "differential");
    let evaluation = umpire.evaluate_text(&text, &goals);

    println!("Validation results for: {}", path.display());
    println!(
        "Problems: {} fatal, {} error, {} warning",
        evaluation.stats.fatal, evaluation.stats.error, evaluation.stats.warning
    );
    println!();
    println!("{}", evaluation.feedback.document);

    if !evaluation.accepted {
        println!("Validation failed.");
        std::process::exit(1);
    }

    println!("Validation passed.");
    Ok(())
}
