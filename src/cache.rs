//! Staged on-disk artifact cache
//!
//! Each model gets one directory under the cache root holding the three
//! fetch-stage artifacts (`views.json`, `tree.json`, `props.json`), the built
//! store (`props.db`), and the conversation transcript (`logs.txt`).
//! Presence of an artifact file is the completion signal: a fully cached
//! model never re-contacts the remote service. Writes go through a temp file
//! and rename, so concurrent fetchers for the same model may race but
//! converge on a whole, valid file.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::remote::RemoteError;

/// Fetch stages cached as JSON artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Views,
    Tree,
    Properties,
}

impl Stage {
    pub fn filename(self) -> &'static str {
        match self {
            Stage::Views => "views.json",
            Stage::Tree => "tree.json",
            Stage::Properties => "props.json",
        }
    }
}

pub struct ModelCache {
    root: PathBuf,
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn model_dir(&self, model_id: &str) -> PathBuf {
        self.root.join(model_id)
    }

    pub fn stage_path(&self, model_id: &str, stage: Stage) -> PathBuf {
        self.model_dir(model_id).join(stage.filename())
    }

    pub fn db_path(&self, model_id: &str) -> PathBuf {
        self.model_dir(model_id).join("props.db")
    }

    pub fn transcript_path(&self, model_id: &str) -> PathBuf {
        self.model_dir(model_id).join("logs.txt")
    }

    /// Return the cached artifact for `stage`, or run `fetch`, persist its
    /// result, and return it. Idempotent across process restarts.
    pub async fn get_or_fetch<T, F, Fut>(&self, model_id: &str, stage: Stage, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let path = self.stage_path(model_id, stage);

        if path.exists() {
            tracing::debug!(model = model_id, stage = stage.filename(), "cache hit");
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read cached {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse cached {}", path.display()));
        }

        tracing::info!(
            model = model_id,
            stage = stage.filename(),
            "fetching from metadata service"
        );
        let value = fetch().await?;

        fs::create_dir_all(self.model_dir(model_id))?;
        write_atomic(&path, &serde_json::to_string(&value)?)?;

        Ok(value)
    }
}

/// Whole-file replacement via temp file + rename, so a crash mid-write never
/// leaves a partial artifact behind the existence check.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", tmp.display()))?;
    Ok(())
}
