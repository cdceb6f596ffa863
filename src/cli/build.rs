//! Build command implementation

use anyhow::Result;

use crate::cache::ModelCache;
use crate::config::Config;
use crate::pipeline::prepare_model;
use crate::remote::DerivativeClient;

pub async fn run(config: &Config, model_id: &str, token: Option<String>) -> Result<()> {
    let token = super::resolve_token(token)?;
    let client = DerivativeClient::new(config.remote.host.clone(), token, config.poll_policy());
    let cache = ModelCache::new(config.cache_dir());

    let store = prepare_model(&cache, &client, model_id, config.build_mode()).await?;

    println!(
        "Property database ready: {} ({} rows)",
        cache.db_path(model_id).display(),
        store.row_count()?
    );
    Ok(())
}
