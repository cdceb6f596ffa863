//! Reasoning-engine seam
//!
//! The conversational engine is an external collaborator: given a prompt and
//! a session token it produces a finite ordered stream of tagged steps. This
//! module defines the step shape, the trait, and the tool surface (read-only
//! SQL over the property store) an engine is handed. `SqlDirectEngine` is the
//! in-tree reference implementation: it treats the prompt as SQL, which
//! exercises the whole session path without an LLM behind it.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::store::{PropertyStore, QueryOutput};

/// Step tag: agent reasoning output vs. tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Agent,
    Tool,
}

/// One engine step. Only the textual content of `Agent` steps is surfaced to
/// the caller; `Tool` steps exist for the transcript.
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,
    pub messages: Vec<String>,
}

impl Step {
    pub fn agent(messages: Vec<String>) -> Self {
        Self {
            kind: StepKind::Agent,
            messages,
        }
    }

    pub fn tool(messages: Vec<String>) -> Self {
        Self {
            kind: StepKind::Tool,
            messages,
        }
    }
}

/// A conversational engine bound to one model's tool surface.
///
/// `prompt` returns the receiving end of a step stream; the engine runs its
/// turn in its own task and closes the channel when the turn is complete.
/// The engine keeps its own conversation memory keyed by `session_token`.
pub trait ReasoningEngine: Send + Sync {
    fn prompt(&self, session_token: &str, text: &str) -> mpsc::Receiver<Step>;
}

/// The tool surface handed to engines: structured queries and schema
/// introspection over the property store, nothing else.
pub struct QueryTools {
    store: Mutex<PropertyStore>,
}

impl QueryTools {
    pub fn new(store: PropertyStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    pub fn run_query(&self, sql: &str) -> Result<QueryOutput> {
        let store = self
            .store
            .lock()
            .map_err(|_| anyhow!("property store lock poisoned"))?;
        store.run_query(sql)
    }

    pub fn table_schema(&self) -> Result<String> {
        let store = self
            .store
            .lock()
            .map_err(|_| anyhow!("property store lock poisoned"))?;
        store.describe()
    }
}

/// Reference engine: the prompt is executed verbatim as SQL. One tool step
/// (the query and its outcome), one agent step (the rendered answer).
pub struct SqlDirectEngine {
    tools: Arc<QueryTools>,
}

impl SqlDirectEngine {
    pub fn new(tools: Arc<QueryTools>) -> Self {
        Self { tools }
    }
}

impl ReasoningEngine for SqlDirectEngine {
    fn prompt(&self, session_token: &str, text: &str) -> mpsc::Receiver<Step> {
        let (tx, rx) = mpsc::channel(16);
        let tools = Arc::clone(&self.tools);
        let session = session_token.to_string();
        let sql = text.trim().to_string();

        tokio::spawn(async move {
            tracing::debug!(session = %session, "running direct query");

            let answer = match tools.run_query(&sql) {
                Ok(output) => output.to_string(),
                Err(error) => format!("query failed: {error}"),
            };

            let _ = tx
                .send(Step::tool(vec![format!("query: {sql}"), answer.clone()]))
                .await;
            let _ = tx.send(Step::agent(vec![answer])).await;
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BuildMode;
    use serde_json::json;
    use tempfile::TempDir;

    fn tools_with_one_wall(dir: &TempDir) -> Arc<QueryTools> {
        let path = dir.path().join("props.db");
        let elements = vec![serde_json::from_value(json!({
            "objectid": 1,
            "name": "Wall A",
            "externalId": "a-1",
            "properties": { "Dimensions": { "Width": "2.5 m" } }
        }))
        .unwrap()];
        let store = PropertyStore::build(&path, &elements, BuildMode::Strict).unwrap();
        Arc::new(QueryTools::new(store))
    }

    #[tokio::test]
    async fn test_direct_engine_emits_tool_then_agent() {
        let dir = TempDir::new().unwrap();
        let engine = SqlDirectEngine::new(tools_with_one_wall(&dir));

        let mut rx = engine.prompt("model-1", "SELECT width FROM properties");
        let mut steps = Vec::new();
        while let Some(step) = rx.recv().await {
            steps.push(step);
        }

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, StepKind::Tool);
        assert_eq!(steps[1].kind, StepKind::Agent);
        assert!(steps[1].messages[0].contains("2.5"));
    }

    #[tokio::test]
    async fn test_direct_engine_reports_bad_sql_as_text() {
        let dir = TempDir::new().unwrap();
        let engine = SqlDirectEngine::new(tools_with_one_wall(&dir));

        let mut rx = engine.prompt("model-1", "SELEC nonsense");
        let mut agent_text = String::new();
        while let Some(step) = rx.recv().await {
            if step.kind == StepKind::Agent {
                agent_text = step.messages[0].clone();
            }
        }

        assert!(agent_text.contains("query failed"));
    }

    #[test]
    fn test_table_schema_introspection() {
        let dir = TempDir::new().unwrap();
        let tools = tools_with_one_wall(&dir);
        let ddl = tools.table_schema().unwrap();
        assert!(ddl.contains("CREATE TABLE properties"));
    }
}
