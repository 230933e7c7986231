// LLM completion capability and helpers for sanitizing its output

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::config::LlmSettings;

/// Single-prompt completion. Fallible; callers wrap it with [`complete_with_timeout`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Runs a completion bounded by `timeout`. A timeout is reported as an error
/// like any other failure; the in-flight request is simply dropped.
pub async fn complete_with_timeout(llm: &dyn LlmClient, prompt: &str, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, llm.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("LLM call timed out after {:?}", timeout),
    }
}

/// Used when no provider is configured: every call fails, so callers go
/// straight to their deterministic fallback.
#[derive(Debug, Clone, Default)]
pub struct DisabledLlmClient;

#[async_trait]
impl LlmClient for DisabledLlmClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("LLM is disabled")
    }
}

/// Chat-completion client for OpenAI-compatible or Ollama endpoints.
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    client: Arc<Client>,
    settings: LlmSettings,
}

impl HttpLlmClient {
    pub fn new(client: Arc<Client>, settings: LlmSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.settings.provider.as_str() {
            "ollama" => call_ollama(&self.client, &self.settings, prompt).await,
            "openai" => call_openai(&self.client, &self.settings, prompt).await,
            other => anyhow::bail!("Unknown LLM provider: {other}"),
        }
    }
}

/// Picks the configured client, or the disabled one when AI is switched off.
pub fn build_llm_client(settings: &LlmSettings, http_client: Arc<Client>) -> Arc<dyn LlmClient> {
    if !settings.enabled {
        tracing::info!("LLM disabled by configuration; AI features will use deterministic fallbacks.");
        return Arc::new(DisabledLlmClient);
    }
    match settings.provider.as_str() {
        "openai" | "ollama" => {
            tracing::info!(provider = %settings.provider, model = %settings.model, "LLM client configured.");
            Arc::new(HttpLlmClient::new(http_client, settings.clone()))
        }
        other => {
            tracing::warn!("Unknown LLM provider '{}'; AI features will use deterministic fallbacks.", other);
            Arc::new(DisabledLlmClient)
        }
    }
}

/// Strips markdown code fences and surrounding chatter, returning the
/// outermost JSON object in `content` (or the trimmed input if none).
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

// --- Ollama ---

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'static str,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

async fn call_ollama(client: &Client, settings: &LlmSettings, prompt: &str) -> Result<String> {
    let url = format!("{}/api/chat", settings.base_url.trim_end_matches('/'));
    let req = OllamaChatRequest {
        model: settings.model.clone(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        stream: false,
        format: "json",
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp.json().await.context("Failed to decode Ollama response")?;
    Ok(body.message.content)
}

// --- OpenAI-compatible ---

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

async fn call_openai(client: &Client, settings: &LlmSettings, prompt: &str) -> Result<String> {
    let url = format!("{}/v1/chat/completions", settings.base_url.trim_end_matches('/'));
    let api_key = settings
        .api_key
        .as_deref()
        .context("LLM api_key is not configured")?;

    let req = OpenAiChatRequest {
        model: settings.model.clone(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        temperature: 0.2,
    };

    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp.json().await.context("Failed to decode OpenAI response")?;
    body.choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .context("OpenAI response contained no choices")
}
