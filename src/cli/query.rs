//! Query command implementation

use anyhow::{bail, Result};

use crate::cache::ModelCache;
use crate::config::Config;
use crate::store::PropertyStore;

pub fn run(config: &Config, model_id: &str, sql: &str) -> Result<()> {
    let cache = ModelCache::new(config.cache_dir());
    let db_path = cache.db_path(model_id);

    if !db_path.exists() {
        bail!("no property database for {model_id}; run 'propchat build {model_id}' first");
    }

    let store = PropertyStore::open(&db_path)?;
    let output = store.run_query(sql)?;
    println!("{output}");
    Ok(())
}
