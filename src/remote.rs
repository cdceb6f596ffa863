//! Model Derivative service client
//!
//! Three read endpoints keyed by model URN (and view guid): view list, object
//! tree, full property collection. The service answers 202 while a derivative
//! job is still running, so every request runs through a bounded poll loop.
//! Any error status ends the operation with the response body attached.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "https://developer.api.autodesk.com";

/// HTTP status the service uses for "derivative job still running"
const STATUS_PROCESSING: u16 = 202;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("metadata service returned {status}: {body}")]
    Fetch { status: u16, body: String },

    #[error("model still processing after {attempts} polls")]
    PollExhausted { attempts: u32 },

    #[error("response missing field at '{0}'")]
    MissingField(&'static str),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("invalid response payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Raised at the boundary before any fetch is attempted
#[derive(Debug, Error)]
#[error("no access token provided (pass --token or set PROPCHAT_ACCESS_TOKEN)")]
pub struct MissingCredential;

/// One view (metadata interpretation) of a design model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Nested raw property map: category name -> property name -> value.
///
/// Values are kept as JSON; the single accessor surfaces only string-valued
/// leaves, which is all the projection ever reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(HashMap<String, HashMap<String, Value>>);

impl PropertySet {
    pub fn get(&self, category: &str, property: &str) -> Option<&str> {
        self.0.get(category)?.get(property)?.as_str()
    }
}

/// One element of the flat property collection, field names as the service
/// spells them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(rename = "objectid")]
    pub object_id: i64,
    pub name: String,
    #[serde(rename = "externalId")]
    pub external_id: String,
    #[serde(default)]
    pub properties: PropertySet,
}

/// Poll behavior for 202 responses. The upstream reference polled forever;
/// here the loop is always bounded.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 600,
        }
    }
}

/// The fetch surface the pipeline depends on. Implemented by
/// [`DerivativeClient`] for the real service and by scripted fakes in tests.
pub trait MetadataSource {
    fn list_views(
        &self,
        model_id: &str,
    ) -> impl Future<Output = Result<Vec<View>, RemoteError>> + Send;

    fn fetch_object_tree(
        &self,
        model_id: &str,
        view_guid: &str,
    ) -> impl Future<Output = Result<Value, RemoteError>> + Send;

    fn fetch_properties(
        &self,
        model_id: &str,
        view_guid: &str,
    ) -> impl Future<Output = Result<Vec<ElementRecord>, RemoteError>> + Send;
}

pub struct DerivativeClient {
    http: reqwest::Client,
    host: String,
    access_token: String,
    poll: PollPolicy,
}

struct RawResponse {
    status: u16,
    body: String,
}

impl DerivativeClient {
    pub fn new(host: impl Into<String>, access_token: impl Into<String>, poll: PollPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
            access_token: access_token.into(),
            poll,
        }
    }

    async fn request(&self, endpoint: &str) -> Result<RawResponse, RemoteError> {
        let response = self
            .http
            .get(format!("{}/{}", self.host, endpoint))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, RemoteError> {
        poll_until_ready(&self.poll, move || self.request(endpoint)).await
    }
}

impl MetadataSource for DerivativeClient {
    async fn list_views(&self, model_id: &str) -> Result<Vec<View>, RemoteError> {
        let json = self
            .get_json(&format!("modelderivative/v2/designdata/{model_id}/metadata"))
            .await?;
        let views = extract(&json, "/data/metadata")?;
        Ok(serde_json::from_value(views)?)
    }

    async fn fetch_object_tree(
        &self,
        model_id: &str,
        view_guid: &str,
    ) -> Result<Value, RemoteError> {
        let json = self
            .get_json(&format!(
                "modelderivative/v2/designdata/{model_id}/metadata/{view_guid}"
            ))
            .await?;
        extract(&json, "/data/objects")
    }

    async fn fetch_properties(
        &self,
        model_id: &str,
        view_guid: &str,
    ) -> Result<Vec<ElementRecord>, RemoteError> {
        let json = self
            .get_json(&format!(
                "modelderivative/v2/designdata/{model_id}/metadata/{view_guid}/properties"
            ))
            .await?;
        let collection = extract(&json, "/data/collection")?;
        Ok(serde_json::from_value(collection)?)
    }
}

fn extract(json: &Value, pointer: &'static str) -> Result<Value, RemoteError> {
    json.pointer(pointer)
        .cloned()
        .ok_or(RemoteError::MissingField(pointer))
}

/// Issue `request` until the service stops answering 202, up to
/// `policy.max_attempts` tries with `policy.interval` between them.
async fn poll_until_ready<F, Fut>(policy: &PollPolicy, mut request: F) -> Result<Value, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse, RemoteError>>,
{
    for attempt in 1..=policy.max_attempts {
        let response = request().await?;

        if response.status == STATUS_PROCESSING {
            tracing::debug!(attempt, "derivative job still processing");
            tokio::time::sleep(policy.interval).await;
            continue;
        }

        if response.status >= 400 {
            return Err(RemoteError::Fetch {
                status: response.status,
                body: response.body,
            });
        }

        return Ok(serde_json::from_str(&response.body)?);
    }

    Err(RemoteError::PollExhausted {
        attempts: policy.max_attempts,
    })
}
