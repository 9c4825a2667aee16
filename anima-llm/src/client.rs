//! LLM Client — chat completions against Ollama or OpenAI-compatible backends.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use anima_core::config::LlmConfig;

use crate::error::LlmError;
use crate::types::{Completion, GenerationRequest};

/// Provider backend for inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama { base_url: String },
    /// OpenAI-compatible chat completions API.
    OpenAiCompatible { base_url: String, api_key: String },
    /// No backend; every call fails with [`LlmError::Unavailable`].
    None,
}

impl LlmProvider {
    /// Provider named by `config.provider` (`ollama`, `openai`, `none`).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider name.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        match config.provider.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama { base_url }),
            "openai" | "openai_compatible" => Ok(Self::OpenAiCompatible {
                base_url,
                api_key: config.api_key.clone().unwrap_or_default(),
            }),
            "none" | "" => Ok(Self::None),
            other => Err(LlmError::ConfigError(format!("unknown LLM provider '{other}'"))),
        }
    }
}

/// Routes chat requests to the configured backend with timeout and retry.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl LlmClient {
    /// Create a client for an explicit provider.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            timeout,
            max_retries,
        }
    }

    /// Create a client from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider name.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self::new(
            LlmProvider::from_config(config)?,
            config.model.clone(),
            Duration::from_millis(config.request_timeout_ms),
            config.max_retries,
        ))
    }

    /// Create a client with no backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), Duration::from_secs(1), 0)
    }

    /// Whether a backend is configured at all.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one chat completion.
    ///
    /// # Errors
    ///
    /// [`LlmError::Unavailable`] without a backend,
    /// [`LlmError::RetriesExhausted`] once every attempt has failed.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<Completion, LlmError> {
        let messages = chat_messages(request);
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("no LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                let url = format!("{base_url}/api/chat");
                let mut body = json!({
                    "model": self.model,
                    "messages": messages,
                    "stream": false,
                    "options": {
                        "temperature": request.config.temperature,
                        "num_predict": request.config.max_tokens,
                    }
                });
                if request.structured {
                    body["format"] = json!("json");
                }
                self.post_with_retries(&url, None, &body, |v| {
                    let text = v["message"]["content"].as_str().unwrap_or_default().to_string();
                    (text, v["eval_count"].as_u64())
                })
                .await
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let url = format!("{base_url}/v1/chat/completions");
                let mut body = json!({
                    "model": self.model,
                    "messages": messages,
                    "max_tokens": request.config.max_tokens,
                    "temperature": request.config.temperature,
                });
                if request.structured {
                    body["response_format"] = json!({ "type": "json_object" });
                }
                let auth = (!api_key.is_empty()).then_some(api_key.as_str());
                self.post_with_retries(&url, auth, &body, |v| {
                    let text = v["choices"][0]["message"]["content"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    (text, v["usage"]["completion_tokens"].as_u64())
                })
                .await
            }
        }
    }

    async fn post_with_retries(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &Value,
        extract: impl Fn(&Value) -> (String, Option<u64>),
    ) -> Result<Completion, LlmError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt = attempt + 1, of = self.max_retries + 1, url, "retrying LLM call");
            }

            let start = Instant::now();
            let mut builder = self.http.post(url).json(body).timeout(self.timeout);
            if let Some(key) = api_key {
                builder = builder.bearer_auth(key);
            }
            let result = builder.send().await;
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: Value = resp.json().await.map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let (text, tokens) = extract(&json);
                    return Ok(Completion {
                        text,
                        tokens_generated: tokens.and_then(|t| u32::try_from(t).ok()).unwrap_or(0),
                        latency_ms,
                        model: self.model.clone(),
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}: {}", resp.text().await.unwrap_or_default());
                    warn!(url, error = %last_error, "LLM backend returned error");
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!(url, timeout_ms = self.timeout.as_millis(), "LLM request timed out");
                    } else {
                        warn!(url, error = %last_error, "LLM request failed");
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}

/// System prompt, history (oldest first), then the new user message.
fn chat_messages(request: &GenerationRequest) -> Vec<Value> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    if !request.system.is_empty() {
        messages.push(json!({ "role": "system", "content": request.system }));
    }
    messages.extend(
        request
            .history
            .iter()
            .map(|turn| json!({ "role": turn.role.as_str(), "content": turn.text })),
    );
    messages.push(json!({ "role": "user", "content": request.prompt }));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatTurn, GenerationConfig};

    #[test]
    fn provider_from_config() {
        let mut cfg = LlmConfig::default();
        assert!(matches!(LlmProvider::from_config(&cfg), Ok(LlmProvider::Ollama { .. })));
        cfg.provider = "OpenAI".into();
        cfg.base_url = "https://api.example.com/".into();
        match LlmProvider::from_config(&cfg) {
            Ok(LlmProvider::OpenAiCompatible { base_url, .. }) => assert_eq!(base_url, "https://api.example.com"),
            other => panic!("unexpected provider: {other:?}"),
        }
        cfg.provider = "carrier-pigeon".into();
        assert!(LlmProvider::from_config(&cfg).is_err());
    }

    #[test]
    fn messages_keep_history_order() {
        let request = GenerationRequest {
            system: "You are Mochi.".into(),
            history: vec![ChatTurn::user("hi"), ChatTurn::assistant("hello!")],
            prompt: "how are you?".into(),
            config: GenerationConfig::default(),
            structured: true,
        };
        let messages = chat_messages(&request);
        let roles: Vec<_> = messages.iter().filter_map(|m| m["role"].as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(messages[3]["content"], "how are you?");

        let single = chat_messages(&GenerationRequest::single("analyse", GenerationConfig::default()));
        assert_eq!(single.len(), 1);
    }

    #[tokio::test]
    async fn none_provider_is_unavailable() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client
            .complete(&GenerationRequest::single("hello", GenerationConfig::default()))
            .await;
        assert!(matches!(err, Err(LlmError::Unavailable(_))));
    }
}
