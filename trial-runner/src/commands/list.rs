//! List command handler

use anyhow::Result;
use colored::*;
use trial_core::Catalog;

/// Prints every variant with its selection index and nominal duration
pub fn handle_list_command() -> Result<()> {
    let catalog = Catalog::standard();

    println!("{}", "Available jobs:".bold());
    println!();
    for spec in catalog.specs() {
        println!(
            "  {} {:<10} {}",
            format!("[{}]", spec.variant.index()).cyan(),
            spec.variant.name().bold(),
            format!("{}s", spec.nominal_duration_secs).dimmed()
        );
    }

    Ok(())
}
