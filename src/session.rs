//! Chat sessions and transcript logging
//!
//! One session per model identifier, created lazily on first prompt and kept
//! for the process lifetime. The session owns its engine binding and an
//! append-only transcript: one timestamped entry per user turn and one per
//! engine step, tool steps included. Transcript writes are best-effort and
//! never turn into a prompt failure.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use chrono::Utc;

use crate::engine::{ReasoningEngine, StepKind};

/// Append-only per-model conversation log
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "[{}] {}\n", Utc::now().to_rfc3339(), message)?;
        Ok(())
    }
}

pub struct Session {
    model_id: String,
    engine: Arc<dyn ReasoningEngine>,
    transcript: Transcript,
    // a session handles one prompt at a time; transcript entries stay ordered
    turn: tokio::sync::Mutex<()>,
}

impl Session {
    pub fn new(model_id: &str, engine: Arc<dyn ReasoningEngine>, transcript: Transcript) -> Self {
        Self {
            model_id: model_id.to_string(),
            engine,
            transcript,
            turn: tokio::sync::Mutex::new(()),
        }
    }

    pub fn transcript_path(&self) -> &Path {
        self.transcript.path()
    }

    /// Submit one prompt. Logs the user turn and every engine step, returns
    /// only the textual content of agent steps, in emission order.
    pub async fn prompt(&self, text: &str) -> Vec<String> {
        let _turn = self.turn.lock().await;

        self.log(&format!("User: {text}"));

        let mut steps = self.engine.prompt(&self.model_id, text);
        let mut responses = Vec::new();
        while let Some(step) = steps.recv().await {
            let label = match step.kind {
                StepKind::Agent => "Assistant",
                StepKind::Tool => "Tool",
            };
            for message in &step.messages {
                self.log(&format!("{label}: {message}"));
            }
            if step.kind == StepKind::Agent {
                responses.extend(step.messages.into_iter().filter(|m| !m.is_empty()));
            }
        }
        responses
    }

    fn log(&self, message: &str) {
        if let Err(error) = self.transcript.append(message) {
            tracing::warn!(model = %self.model_id, %error, "transcript append failed");
        }
    }
}

/// Process-wide model-to-session map, owned by the request-handling context
/// rather than held as ambient global state. No eviction; sessions live until
/// process exit.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, model_id: &str) -> Option<Arc<Session>> {
        let map = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(model_id).cloned()
    }

    /// Insert `session` unless a concurrent first prompt got there first; the
    /// session that landed wins and later stores are ignored.
    pub fn insert_or_keep(&self, model_id: &str, session: Arc<Session>) -> Arc<Session> {
        let mut map = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(model_id.to_string()).or_insert(session).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Step;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    /// Engine that replays a fixed step sequence for every prompt
    struct ScriptedEngine {
        steps: Vec<Step>,
    }

    impl ReasoningEngine for ScriptedEngine {
        fn prompt(&self, _session_token: &str, _text: &str) -> mpsc::Receiver<Step> {
            let (tx, rx) = mpsc::channel(16);
            let steps = self.steps.clone();
            tokio::spawn(async move {
                for step in steps {
                    if tx.send(step).await.is_err() {
                        break;
                    }
                }
            });
            rx
        }
    }

    fn session_with(dir: &TempDir, steps: Vec<Step>) -> Session {
        Session::new(
            "model-1",
            Arc::new(ScriptedEngine { steps }),
            Transcript::new(dir.path().join("logs.txt")),
        )
    }

    #[tokio::test]
    async fn test_tool_steps_logged_but_not_returned() {
        let dir = TempDir::new().unwrap();
        let session = session_with(
            &dir,
            vec![
                Step::tool(vec!["query: SELECT width FROM properties".to_string()]),
                Step::agent(vec!["Answer: 2.5 m".to_string()]),
            ],
        );

        let responses = session.prompt("how wide is wall A?").await;
        assert_eq!(responses, vec!["Answer: 2.5 m".to_string()]);

        let transcript = fs::read_to_string(session.transcript_path()).unwrap();
        assert!(transcript.contains("User: how wide is wall A?"));
        assert!(transcript.contains("Tool: query: SELECT width FROM properties"));
        assert!(transcript.contains("Assistant: Answer: 2.5 m"));
    }

    #[tokio::test]
    async fn test_empty_agent_messages_are_dropped() {
        let dir = TempDir::new().unwrap();
        let session = session_with(
            &dir,
            vec![Step::agent(vec![String::new(), "real answer".to_string()])],
        );

        let responses = session.prompt("anything").await;
        assert_eq!(responses, vec!["real answer".to_string()]);
    }

    #[tokio::test]
    async fn test_two_prompts_append_in_order() {
        let dir = TempDir::new().unwrap();
        let session = session_with(&dir, vec![Step::agent(vec!["ok".to_string()])]);

        session.prompt("first question").await;
        session.prompt("second question").await;

        let transcript = fs::read_to_string(session.transcript_path()).unwrap();
        let first = transcript.find("User: first question").unwrap();
        let second = transcript.find("User: second question").unwrap();
        assert!(first < second);
        assert_eq!(transcript.matches("User: ").count(), 2);
    }

    #[tokio::test]
    async fn test_registry_keeps_first_session() {
        let dir = TempDir::new().unwrap();
        let registry = SessionRegistry::new();

        let a = Arc::new(session_with(&dir, vec![]));
        let b = Arc::new(session_with(&dir, vec![]));

        let kept = registry.insert_or_keep("urn-1", Arc::clone(&a));
        assert!(Arc::ptr_eq(&kept, &a));

        // a second insert for the same model is ignored
        let kept = registry.insert_or_keep("urn-1", b);
        assert!(Arc::ptr_eq(&kept, &a));

        assert!(registry.get("urn-1").is_some());
        assert!(registry.get("urn-2").is_none());
    }
}
