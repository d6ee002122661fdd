//! `garage status` – show the cache state of every registered file.

use anyhow::Result;
use garage_core::{Garage, GarageConfig};

pub fn run_status(cfg: &GarageConfig) -> Result<()> {
    let garage = Garage::from_config(cfg)?;
    println!("Store: {}", garage.abspath().display());
    if garage.registry().is_empty() {
        println!("No files in registry.");
        return Ok(());
    }
    println!("{:<8} {}", "STATE", "NAME");
    for (name, _) in garage.registry() {
        let state = garage.inspect(name)?;
        println!("{:<8} {}", state.to_string(), name);
    }
    Ok(())
}
