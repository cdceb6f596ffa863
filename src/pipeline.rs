//! Model preparation pipeline and request-handling context
//!
//! `prepare_model` is the end-to-end path from a model identifier to a ready
//! property store: staged fetch (views, tree, properties) through the cache,
//! then the relational build. `AppContext` owns the per-process state — the
//! artifact cache and the session registry — and is what a serving boundary
//! would hold onto.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::cache::{ModelCache, Stage};
use crate::config::Config;
use crate::engine::{QueryTools, ReasoningEngine};
use crate::remote::MetadataSource;
use crate::session::{Session, SessionRegistry, Transcript};
use crate::store::{BuildMode, PropertyStore};

/// Builds an engine bound to one model's tool surface
pub type EngineFactory = Box<dyn Fn(Arc<QueryTools>) -> Arc<dyn ReasoningEngine> + Send + Sync>;

/// Fetch, cache, and build the property store for `model_id`. Every stage is
/// idempotent: a fully cached model issues no remote calls at all, and a
/// store already built by the current schema is returned as-is.
pub async fn prepare_model<S: MetadataSource>(
    cache: &ModelCache,
    source: &S,
    model_id: &str,
    mode: BuildMode,
) -> Result<PropertyStore> {
    let db_path = cache.db_path(model_id);
    if let Some(store) = PropertyStore::open_if_current(&db_path)? {
        return Ok(store);
    }

    let views = cache
        .get_or_fetch(model_id, Stage::Views, move || source.list_views(model_id))
        .await
        .context("failed to fetch view list")?;

    // only the first view is used; multi-view models are out of scope
    let view = views
        .first()
        .ok_or_else(|| anyhow!("model {model_id} has no viewable metadata"))?;

    // the tree is cached for clients that browse the hierarchy; the
    // relational projection reads only the flat property collection
    let _tree: serde_json::Value = cache
        .get_or_fetch(model_id, Stage::Tree, move || {
            source.fetch_object_tree(model_id, &view.guid)
        })
        .await
        .context("failed to fetch object tree")?;

    let elements = cache
        .get_or_fetch(model_id, Stage::Properties, move || {
            source.fetch_properties(model_id, &view.guid)
        })
        .await
        .context("failed to fetch property collection")?;

    PropertyStore::build(&db_path, &elements, mode)
}

/// Per-process application state, passed into the boundary explicitly
pub struct AppContext {
    config: Config,
    cache: ModelCache,
    sessions: SessionRegistry,
    make_engine: EngineFactory,
}

impl AppContext {
    pub fn new(config: Config, make_engine: EngineFactory) -> Self {
        let cache = ModelCache::new(config.cache_dir());
        Self {
            config,
            cache,
            sessions: SessionRegistry::new(),
            make_engine,
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one chatbot prompt: look up or create the session for
    /// `model_id` (running the preparation pipeline on first contact), then
    /// run the turn and return the agent's responses.
    pub async fn prompt<S: MetadataSource>(
        &self,
        source: &S,
        model_id: &str,
        text: &str,
    ) -> Result<Vec<String>> {
        if let Some(session) = self.sessions.get(model_id) {
            return Ok(session.prompt(text).await);
        }

        let store = prepare_model(&self.cache, source, model_id, self.config.build_mode()).await?;
        let tools = Arc::new(QueryTools::new(store));
        let engine = (self.make_engine)(tools);
        let session = Arc::new(Session::new(
            model_id,
            engine,
            Transcript::new(self.cache.transcript_path(model_id)),
        ));
        let session = self.sessions.insert_or_keep(model_id, session);

        Ok(session.prompt(text).await)
    }
}
