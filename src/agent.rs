//! LLM agent module for grounded business lookup.
//!
//! Talks to the Gemini `generateContent` API with Google Search grounding
//! enabled, and turns the reply into a typed [`BusinessPage`].

use crate::business::{Business, BusinessList, BusinessPage, Source};
use crate::config::Config;
use crate::query::BusinessQuery;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!(
    "pinscout/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/cladam/pinscout)"
);

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("LLM request failed without an explanation")]
    Unexplained,
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("the model returned no candidates")]
    EmptyResponse,
    #[error("configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl AgentError {
    /// The user-facing message, if the failure carried one
    pub fn message(&self) -> Option<String> {
        match self {
            AgentError::Unexplained => None,
            other => Some(other.to_string()),
        }
    }
}

/// Anything that can turn a [`BusinessQuery`] into a page of businesses.
#[async_trait]
pub trait BusinessFinder: Send + Sync {
    /// Run one lookup. Implementations should honour `query.exclude`,
    /// but callers must not rely on it.
    async fn find(&self, query: &BusinessQuery) -> Result<BusinessPage, AgentError>;
}

/// Gemini-backed [`BusinessFinder`].
#[derive(Debug, Clone)]
pub struct GeminiFinder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    persona: String,
    country: String,
    page_size: usize,
}

impl GeminiFinder {
    /// Build a finder from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let api_key = config.api_key()?.to_string();

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.api.endpoint.trim_end_matches('/').to_string(),
            model: config.agent.model.clone(),
            api_key,
            persona: config.agent.persona.clone(),
            country: config.search.country.clone(),
            page_size: config.search.page_size,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl BusinessFinder for GeminiFinder {
    async fn find(&self, query: &BusinessQuery) -> Result<BusinessPage, AgentError> {
        let prompt = query.prompt(&self.persona, &self.country, self.page_size);
        debug!(prompt = %prompt, "composed prompt");

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
        });

        info!(
            pincode = %query.pincode,
            area = %query.area,
            excluded = query.exclude.len(),
            model = %self.model,
            "requesting businesses"
        );

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            debug!(%status, body = %text, "API error response");
            return Err(api_error(&text));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| AgentError::ParseError(e.to_string()))?;
        let page = parse_generate_response(parsed)?;

        info!(
            businesses = page.businesses.len(),
            sources = page.sources.len(),
            "received businesses"
        );
        Ok(page)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// The model may answer with the schema'd object or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BusinessPayload {
    List(BusinessList),
    Bare(Vec<Business>),
}

impl From<BusinessPayload> for Vec<Business> {
    fn from(payload: BusinessPayload) -> Self {
        match payload {
            BusinessPayload::List(list) => list.businesses,
            BusinessPayload::Bare(businesses) => businesses,
        }
    }
}

/// Map a non-2xx body to an error, keeping the API's message when there is one
fn api_error(body: &str) -> AgentError {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .map(AgentError::RequestFailed)
        .unwrap_or(AgentError::Unexplained)
}

fn parse_generate_response(response: GenerateResponse) -> Result<BusinessPage, AgentError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(AgentError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let businesses = parse_businesses(&text)?;

    let sources = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| {
            let uri = web.uri.filter(|u| !u.is_empty())?;
            let title = web
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| uri.clone());
            Some(Source::new(uri, title))
        })
        .collect();

    Ok(BusinessPage::new(businesses, sources))
}

/// Parse the model's text into businesses, dropping nameless entries.
///
/// Names are trimmed here, so businesses differing only in surrounding
/// whitespace compare equal when deduplicated later.
pub fn parse_businesses(text: &str) -> Result<Vec<Business>, AgentError> {
    if text.trim().is_empty() {
        return Err(AgentError::ParseError("empty response text".to_string()));
    }

    let cleaned = strip_markdown_json(text);
    let payload: BusinessPayload = match serde_json::from_str(&cleaned) {
        Ok(payload) => payload,
        Err(first) => {
            // Grounded answers sometimes wrap the JSON in prose
            let span = extract_json_span(&cleaned)
                .ok_or_else(|| AgentError::ParseError(format!("{}: {}", first, cleaned)))?;
            serde_json::from_str(span)
                .map_err(|e| AgentError::ParseError(format!("{}: {}", e, span)))?
        }
    };

    let businesses: Vec<Business> = payload.into();
    Ok(businesses
        .into_iter()
        .filter_map(|mut b| {
            b.name = b.name.trim().to_string();
            (!b.name.is_empty()).then_some(b)
        })
        .collect())
}

/// Strip markdown code block wrappers from JSON response
fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();

    // Remove ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_prefix = rest.strip_prefix("json").unwrap_or(rest);

        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim().to_string();
        }
    }

    trimmed.to_string()
}

/// Outermost `{...}` or `[...]` span, whichever opens first
fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
