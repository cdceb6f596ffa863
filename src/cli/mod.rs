//! CLI command implementations

pub mod ask;
pub mod build;
pub mod query;
pub mod show;

use anyhow::Result;

use crate::remote::MissingCredential;

/// Resolve the bearer token for the metadata service: the `--token` flag,
/// falling back to `PROPCHAT_ACCESS_TOKEN`. Rejected before any fetch.
pub(crate) fn resolve_token(flag: Option<String>) -> Result<String> {
    let token = flag
        .or_else(|| std::env::var("PROPCHAT_ACCESS_TOKEN").ok())
        .filter(|t| !t.is_empty())
        .ok_or(MissingCredential)?;
    Ok(token)
}
