//! Cache command implementation

use anyhow::Result;
use fnforge_cache::{CacheStore, FileStore, MemoCache};
use fnforge_synth::SynthConfig;
use std::sync::Arc;

async fn open(namespace: Option<String>, config: &SynthConfig) -> (Arc<FileStore>, MemoCache) {
    let namespace = namespace.unwrap_or_else(|| config.cache.namespace.clone());
    let store = Arc::new(FileStore::new(&config.cache.dir));
    let cache = MemoCache::open(namespace, store.clone()).await;
    (store, cache)
}

pub async fn stats(namespace: Option<String>, config: &SynthConfig) -> Result<()> {
    let (store, cache) = open(namespace, config).await;
    println!("namespace: {}", cache.namespace());
    println!("location:  {}", store.location(cache.namespace()));
    println!("entries:   {}", cache.len());
    Ok(())
}

pub async fn clear(namespace: Option<String>, config: &SynthConfig) -> Result<()> {
    let (_, cache) = open(namespace, config).await;
    let removed = cache.len();
    cache.clear().await;
    cache.flush().await?;
    println!("Removed {} entries from {}", removed, cache.namespace());
    Ok(())
}
