//! Remote dispatch client for the Jules session API.
//!
//! The [`SessionDispatcher`] trait decouples the mode pipelines from the
//! network; tests use recording dispatchers that never touch it. The real
//! client performs exactly one synchronous POST per invocation, with no
//! retries: a failed dispatch fails the run.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::error::{EngineError, Result};

/// Fixed session-creation endpoint.
pub const SESSIONS_URL: &str = "https://jules.googleapis.com/v1alpha/sessions";

const API_KEY_HEADER: &str = "X-Goog-Api-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Outbound session-creation payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub prompt: String,
    pub source_context: SourceContext,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    /// `sources/github/<owner>/<repo>`.
    pub source: String,
    pub github_repo_context: GithubRepoContext,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GithubRepoContext {
    pub starting_branch: String,
}

impl SessionRequest {
    pub fn new(prompt: String, repository: &str, starting_branch: &str, title: String) -> Self {
        Self {
            prompt,
            source_context: SourceContext {
                source: format!("sources/github/{repository}"),
                github_repo_context: GithubRepoContext {
                    starting_branch: starting_branch.to_string(),
                },
            },
            title,
        }
    }
}

/// Parsed session-creation response. Empty 2xx bodies decode to the default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionResponse {
    /// Resource name of the created session (`sessions/<id>`).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Abstraction over session creation.
pub trait SessionDispatcher {
    fn create_session(&self, request: &SessionRequest) -> Result<SessionResponse>;
}

/// Blocking HTTPS client for the real API.
pub struct JulesClient {
    api_key: Option<String>,
    client: Client,
}

impl JulesClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| EngineError::RemoteDispatch {
                status: None,
                detail: format!("build http client: {err}"),
            })?;
        Ok(Self { api_key, client })
    }
}

impl SessionDispatcher for JulesClient {
    #[instrument(skip_all, fields(title = %request.title))]
    fn create_session(&self, request: &SessionRequest) -> Result<SessionResponse> {
        // Credential check happens before any network activity.
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                EngineError::Configuration(
                    "session API key is required (--api-key or JULES_API_KEY)".to_string(),
                )
            })?;

        let body = serde_json::to_vec(request).map_err(|err| EngineError::RemoteDispatch {
            status: None,
            detail: format!("serialize payload: {err}"),
        })?;

        let response = self
            .client
            .post(SESSIONS_URL)
            .header(API_KEY_HEADER, api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .map_err(|err| EngineError::RemoteDispatch {
                status: None,
                detail: err.to_string(),
            })?;

        let status = response.status();
        let text = response.text().map_err(|err| EngineError::RemoteDispatch {
            status: Some(status.as_u16()),
            detail: format!("read response body: {err}"),
        })?;

        classify_response(status, &text)
    }
}

/// 2xx with a JSON body parses it; 2xx with an empty body is an empty
/// response; anything else fails with the status and raw body.
fn classify_response(status: StatusCode, body: &str) -> Result<SessionResponse> {
    if !status.is_success() {
        return Err(EngineError::RemoteDispatch {
            status: Some(status.as_u16()),
            detail: body.to_string(),
        });
    }
    if body.trim().is_empty() {
        return Ok(SessionResponse::default());
    }
    let session: SessionResponse =
        serde_json::from_str(body).map_err(|err| EngineError::RemoteDispatch {
            status: Some(status.as_u16()),
            detail: format!("unparseable success body: {err}"),
        })?;
    if let Some(name) = &session.name {
        info!(session = %name, "session created");
    }
    Ok(session)
}
