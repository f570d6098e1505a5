//! Check command implementation

use anyhow::{Context, Result};
use fnforge_purity::analyze;
use std::path::Path;

pub fn check_file(path: &Path) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let verdict = analyze(&source);
    println!("{}", verdict);
    if !verdict.is_pure() {
        std::process::exit(1);
    }
    Ok(())
}
