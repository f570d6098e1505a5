//! Run command implementation

use anyhow::{Context, Result};
use fnforge_synth::SynthConfig;
use std::path::Path;

pub fn run_file(path: &Path, input: &str, config: &SynthConfig) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let input: serde_json::Value =
        serde_json::from_str(input).context("Input is not valid JSON")?;

    let result = fnforge_interpreter::evaluate(&source, &input, &config.interpreter.to_options())?;
    println!("{}", result);
    Ok(())
}
