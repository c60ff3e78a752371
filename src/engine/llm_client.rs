use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::engine::prompt_builder::PromptBuilder;
use crate::ui::settings::AppSettings;

#[derive(Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ChatMessageResponse,
}

#[derive(Deserialize)]
pub struct ChatMessageResponse {
    #[serde(default)]
    pub content: Option<String>,
}

/// Transport-level failures. These are the only errors that reach the UI;
/// anything wrong with the *content* is handled by the recovery pipeline.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no API key: set ${0} or add a key in settings")]
    MissingApiKey(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model returned no content")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

pub trait ChatBackend: Send {
    fn complete(&self, messages: &[ChatMessage], sampling: Sampling) -> Result<String, ClientError>;

    fn reconfigure(&mut self, _settings: &AppSettings) {}
}

/// OpenAI-compatible chat-completion endpoint over blocking HTTP.
pub struct HttpBackend {
    client: Client,
    settings: AppSettings,
}

impl HttpBackend {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            client: build_client(&settings),
            settings,
        }
    }
}

fn build_client(settings: &AppSettings) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            warn!("falling back to default HTTP client: {e}");
            Client::new()
        })
}

/// Local servers (LM Studio, llama.cpp) don't need a key.
fn endpoint_is_local(endpoint: &str) -> bool {
    endpoint.contains("://localhost") || endpoint.contains("://127.0.0.1")
}

impl ChatBackend for HttpBackend {
    fn complete(&self, messages: &[ChatMessage], sampling: Sampling) -> Result<String, ClientError> {
        let key = self.settings.resolve_api_key();
        if key.is_none() && !endpoint_is_local(&self.settings.endpoint) {
            return Err(ClientError::MissingApiKey(self.settings.api_key_env.clone()));
        }

        let req = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: messages.to_vec(),
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            top_p: self.settings.top_p,
        };

        debug!(
            "POST {} ({} messages, max_tokens {})",
            self.settings.endpoint,
            req.messages.len(),
            req.max_tokens
        );

        let mut builder = self.client.post(&self.settings.endpoint).json(&req);
        if let Some(key) = key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        first_content(resp.json::<ChatCompletionResponse>()?)
    }

    fn reconfigure(&mut self, settings: &AppSettings) {
        self.client = build_client(settings);
        self.settings = settings.clone();
    }
}

fn first_content(resp: ChatCompletionResponse) -> Result<String, ClientError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(ClientError::EmptyResponse)
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".into())
}

/// Ask the model for `n` short names; empty on any failure.
pub fn generate_list(backend: &dyn ChatBackend, prompt: &str, n: usize) -> Vec<String> {
    let messages = PromptBuilder::name_list_messages(prompt, n);
    let sampling = Sampling {
        max_tokens: 128,
        temperature: 0.8,
    };

    match backend.complete(&messages, sampling) {
        Ok(text) => parse_name_list(&text, n),
        Err(e) => {
            warn!("name list request failed: {e}");
            Vec::new()
        }
    }
}

pub fn parse_name_list(text: &str, n: usize) -> Vec<String> {
    text.split([',', '\n'])
        .map(|entry| {
            entry
                .trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*'))
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string()
        })
        .filter(|entry| !entry.is_empty())
        .take(n)
        .collect()
}
