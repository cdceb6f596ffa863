//! Show command implementation

use anyhow::Result;

use crate::cache::{ModelCache, Stage};
use crate::config::Config;

pub fn run(config: &Config, model_id: &str) -> Result<()> {
    let cache = ModelCache::new(config.cache_dir());
    let dir = cache.model_dir(model_id);

    println!("Cache directory: {}", dir.display());
    if !dir.exists() {
        println!("(nothing cached yet)");
        return Ok(());
    }

    let artifacts = [
        cache.stage_path(model_id, Stage::Views),
        cache.stage_path(model_id, Stage::Tree),
        cache.stage_path(model_id, Stage::Properties),
        cache.db_path(model_id),
        cache.transcript_path(model_id),
    ];

    for path in artifacts {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match path.metadata() {
            Ok(meta) => println!("  {:<12} {} bytes", name, meta.len()),
            Err(_) => println!("  {:<12} -", name),
        }
    }

    Ok(())
}
