//! Model provider contract and the Gemini implementation.
//!
//! The pipeline talks to the language model through [`ChatProvider`], a
//! narrow call contract: a system prompt plus an ordered message list in,
//! one text completion out. Everything provider-specific (endpoint shape,
//! auth header, response plucking) lives behind this seam, so tests swap in
//! stubs and the pipeline never knows the difference.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::{HemolensError, Result};

/// Message role within one step's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message in a step's conversation with the model.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The fixed call contract to the model provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one completion: system prompt + conversation in, text out.
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;
}

/// Google Gemini provider over the `generateContent` REST endpoint.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl GeminiProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Override the endpoint base URL (local stub servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        let body = serde_json::json!({
            "system_instruction": { "parts": [{ "text": system }] },
            "contents": contents,
        });

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(HemolensError::provider(format!(
                "model call failed with status {}: {}",
                status,
                detail.trim()
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        candidate_text(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Pluck the first candidate's concatenated text out of a response.
fn candidate_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| HemolensError::provider("model returned no candidates"))?;

    let text: String = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(HemolensError::provider("model returned an empty completion"));
    }
    Ok(text)
}
