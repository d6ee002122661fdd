//! `garage make-registry` – hash a directory into a registry file.

use anyhow::{Context, Result};
use garage_core::make_registry;
use std::path::Path;

pub fn run_make_registry(dir: &Path, output: &Path, recursive: bool) -> Result<()> {
    let registry = make_registry(dir, output, recursive)
        .with_context(|| format!("build registry from {}", dir.display()))?;
    println!(
        "Wrote {} entries to {}",
        registry.len(),
        output.display()
    );
    Ok(())
}
