//! Synth command implementation

use anyhow::{Context, Result};
use fnforge_cache::{FileStore, MemoCache};
use fnforge_synth::{
    CachedOracle, OpenAiOracle, Oracle, SynthConfig, SynthError, SynthesisRequest, Synthesizer,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Read a request, apply CLI and config overrides
pub fn read_request(
    path: &Path,
    iterations: Option<u32>,
    config: &SynthConfig,
) -> Result<SynthesisRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let has_iterations = raw.get("iterations").is_some();

    let mut request: SynthesisRequest = serde_json::from_value(raw)
        .with_context(|| format!("Invalid request in {}", path.display()))?;
    match iterations {
        Some(n) => request.iterations = n,
        None if !has_iterations => request.iterations = config.synthesis.iterations,
        None => {}
    }
    Ok(request)
}

pub async fn synthesize_file(
    path: &Path,
    iterations: Option<u32>,
    no_cache: bool,
    config: &SynthConfig,
) -> Result<()> {
    let request = read_request(path, iterations, config)?;
    let openai = OpenAiOracle::new(&config.oracle)?;

    let oracle: Arc<dyn Oracle> = if config.cache.enabled && !no_cache {
        let store = Arc::new(FileStore::new(&config.cache.dir));
        let cache = Arc::new(MemoCache::open(config.cache.namespace.clone(), store).await);
        info!(namespace = cache.namespace(), entries = cache.len(), "using response cache");
        Arc::new(CachedOracle::new(openai, cache))
    } else {
        Arc::new(openai)
    };

    let synthesizer = Synthesizer::new(oracle).with_options(config.interpreter.to_options());
    match synthesizer.synthesize(request).await {
        Ok(function) => {
            println!("{}", function.source());
            Ok(())
        }
        Err(SynthError::Exhausted {
            iterations,
            transcript,
        }) => {
            eprintln!("{}", transcript);
            anyhow::bail!("No valid function after {} iterations", iterations)
        }
        Err(e) => Err(e.into()),
    }
}
