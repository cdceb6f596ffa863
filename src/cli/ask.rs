//! Ask command implementation
//!
//! Runs one prompt through the full session path: pipeline on first contact,
//! then the reference SQL engine against the model's property store.

use std::sync::Arc;

use anyhow::Result;

use crate::engine::SqlDirectEngine;
use crate::pipeline::{AppContext, EngineFactory};
use crate::remote::DerivativeClient;

pub fn sql_direct_factory() -> EngineFactory {
    Box::new(|tools| Arc::new(SqlDirectEngine::new(tools)))
}

pub async fn run(
    ctx: &AppContext,
    model_id: &str,
    prompt: &str,
    token: Option<String>,
) -> Result<()> {
    let token = super::resolve_token(token)?;
    let config = ctx.config();
    let client = DerivativeClient::new(config.remote.host.clone(), token, config.poll_policy());

    let responses = ctx.prompt(&client, model_id, prompt).await?;

    if responses.is_empty() {
        println!("(no response)");
        return Ok(());
    }
    for response in responses {
        println!("{response}");
    }
    Ok(())
}
