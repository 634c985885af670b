//! Completion provider port and implementations
//!
//! The generative model is an external, non-deterministic collaborator that
//! returns unstructured text. Everything upstream of the normalizer talks to
//! it through the `CompletionProvider` trait so the provider can be swapped
//! or mocked in tests.

use crate::config::{Config, ProviderConfig};
use crate::error::{RelayError, Result};
use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Fixed system turn for every completion request.
const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that always responds with valid JSON. Never include any text outside the JSON structure. Never include XML-like tags. Always use double quotes for keys and string values. Never include markdown formatting.";

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One prompt in, one raw completion out. Single turn, no streaming.
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Consecutive-failure circuit breaker with a cooldown window.
///
/// Counts whole `complete()` calls, not individual retry attempts. While open,
/// calls fail fast without touching the network. `threshold` 0 disables it.
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    cooldown: Duration,
}

struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                open_until: None,
            }),
            threshold,
            cooldown,
        }
    }

    /// Returns Err while the breaker is open; closes itself after the cooldown.
    pub fn check(&self) -> Result<()> {
        if self.threshold == 0 {
            return Ok(());
        }
        let mut state = self.state.lock().expect("breaker lock");
        if let Some(until) = state.open_until {
            if Instant::now() < until {
                return Err(RelayError::Provider {
                    message: "completion provider circuit is open; retry later".to_string(),
                });
            }
            // Cooldown elapsed; allow a fresh probe
            state.open_until = None;
            state.consecutive_failures = 0;
            info!("completion provider circuit closed after cooldown");
        }
        Ok(())
    }

    pub fn record_success(&self) {
        if self.threshold == 0 {
            return;
        }
        let mut state = self.state.lock().expect("breaker lock");
        state.consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        if self.threshold == 0 {
            return;
        }
        let mut state = self.state.lock().expect("breaker lock");
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.threshold && state.open_until.is_none() {
            state.open_until = Some(Instant::now() + self.cooldown);
            warn!(
                failures = state.consecutive_failures,
                cooldown_ms = self.cooldown.as_millis() as u64,
                "completion provider circuit opened"
            );
        }
    }
}

/// OpenAI-compatible `/chat/completions` provider (Groq, OpenAI, or anything
/// speaking the same protocol behind a configurable base URL).
pub struct ChatCompletionProvider {
    client: reqwest::Client,
    name: &'static str,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retries: u32,
    retry_delay_ms: u64,
    breaker: CircuitBreaker,
}

impl ChatCompletionProvider {
    pub fn new(name: &'static str, api_key: String, base_url: String, cfg: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| RelayError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            name,
            api_key,
            base_url,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            retries: cfg.retries,
            retry_delay_ms: cfg.retry_delay_ms,
            breaker: CircuitBreaker::new(
                cfg.breaker_threshold,
                Duration::from_millis(cfg.breaker_cooldown_ms),
            ),
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_INSTRUCTION },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "top_p": 1,
            "stream": false
        })
    }

    async fn attempt(&self, body: &Value, url: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("completion API error {}: {}", status, error_text);
        }

        let val: Value = resp
            .json()
            .await
            .context("Failed to parse completion API envelope")?;
        val.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .context("No message content in completion response")
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.breaker.check()?;

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.request_body(prompt);
        debug!(
            provider = self.name,
            model = %self.model,
            prompt_chars = prompt.len(),
            "sending completion request"
        );

        // Bounded retry with exponential backoff and jitter
        let mut last_err: Option<anyhow::Error> = None;
        for i in 0..self.retries.max(1) {
            if i > 0 {
                let delay = backoff_with_jitter(self.retry_delay_ms, i - 1);
                warn!(
                    provider = self.name,
                    attempt = i + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying completion request"
                );
                tokio::time::sleep(delay).await;
            }
            match self.attempt(&body, &url).await {
                Ok(content) => {
                    self.breaker.record_success();
                    return Ok(content.trim().to_string());
                }
                Err(e) => last_err = Some(e),
            }
        }

        self.breaker.record_failure();
        let err = last_err.map(|e| e.to_string()).unwrap_or_else(|| "unknown provider error".to_string());
        Err(RelayError::Provider { message: err })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn backoff_with_jitter(base_ms: u64, exhausted: u32) -> Duration {
    let base = base_ms.max(1);
    let exp = base.saturating_mul(1u64 << exhausted.min(6));
    let jitter = rand::thread_rng().gen_range(0..=base / 2);
    Duration::from_millis(exp + jitter)
}

/// Deterministic, networkless provider for tests and keyless development.
///
/// With a canned response it echoes that text for every prompt; otherwise it
/// routes on the role marker each template opens with and returns a minimal
/// valid document for that task.
pub struct FakeCompletionProvider {
    canned: Option<String>,
}

impl FakeCompletionProvider {
    pub fn new() -> Self {
        Self { canned: None }
    }

    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            canned: Some(text.into()),
        }
    }

    fn canned_for(prompt: &str) -> String {
        if prompt.contains("expert business analyst") {
            r#"{"srs":"Sample SRS.","frd":"Sample FRD.","brd":"Sample BRD.","umlDiagrams":[{"name":"Context Diagram","content":"Actors and system boundary."}]}"#.to_string()
        } else if prompt.contains("expert market researcher") {
            r#"{"competitors":[{"name":"Acme","strengths":"Scale","weaknesses":"Cost"}],"marketTrends":"Steady growth.","recommendations":"Differentiate on service.","swotAnalysis":{"strengths":["Focus"],"weaknesses":["Reach"],"opportunities":["Niche"],"threats":["Incumbents"]}}"#.to_string()
        } else if prompt.contains("expert technical project manager") {
            r#"[{"id":1,"name":"Set up project","description":"Scaffold the repository.","estimatedHours":4,"requiredSkills":["Git"]}]"#.to_string()
        } else if prompt.contains("expert resource manager") {
            r#"[{"id":1,"name":"Set up project","description":"Scaffold the repository.","estimatedHours":4,"requiredSkills":["Git"],"assignedTo":"Ada","confidence":90}]"#.to_string()
        } else {
            "{}".to_string()
        }
    }
}

impl Default for FakeCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(self
            .canned
            .clone()
            .unwrap_or_else(|| Self::canned_for(prompt)))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Build the provider the dispatcher will own, selected from configuration.
///
/// Selection order: explicit BA_PROVIDER if set; else Groq if GROQ_API_KEY is
/// set; else OpenAI if OPENAI_API_KEY is set; else the fake provider unless
/// strict mode forbids the fallback.
pub fn create_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>> {
    let p = &config.provider;
    let is_placeholder = |s: &str| {
        let t = s.trim();
        t.is_empty() || t.contains("${") || t.eq_ignore_ascii_case("changeme")
    };

    match p.kind.as_str() {
        "groq" | "openai" => {
            let (name, default_base, key) = if p.kind == "groq" {
                ("groq", GROQ_BASE_URL, p.groq_api_key.as_deref())
            } else {
                ("openai", OPENAI_BASE_URL, p.openai_api_key.as_deref())
            };
            let key = key.filter(|k| !is_placeholder(k)).ok_or_else(|| {
                RelayError::Config {
                    message: format!("BA_PROVIDER={} but its API key is not set", p.kind),
                }
            })?;
            let base = p.base_url.clone().unwrap_or_else(|| default_base.to_string());
            info!(provider = name, model = %p.model, "using chat completion provider");
            Ok(Arc::new(ChatCompletionProvider::new(
                name,
                key.to_string(),
                base,
                p,
            )?))
        }
        "fake" => {
            info!("using fake completion provider (deterministic, no network)");
            Ok(Arc::new(FakeCompletionProvider::new()))
        }
        "" => {
            if let Some(key) = p.groq_api_key.as_deref().filter(|k| !is_placeholder(k)) {
                let base = p.base_url.clone().unwrap_or_else(|| GROQ_BASE_URL.to_string());
                info!(provider = "groq", model = %p.model, "using chat completion provider");
                return Ok(Arc::new(ChatCompletionProvider::new(
                    "groq",
                    key.to_string(),
                    base,
                    p,
                )?));
            }
            if let Some(key) = p.openai_api_key.as_deref().filter(|k| !is_placeholder(k)) {
                let base = p.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string());
                info!(provider = "openai", model = %p.model, "using chat completion provider");
                return Ok(Arc::new(ChatCompletionProvider::new(
                    "openai",
                    key.to_string(),
                    base,
                    p,
                )?));
            }
            if p.strict {
                return Err(RelayError::Config {
                    message: "No completion provider configured; set GROQ_API_KEY or OPENAI_API_KEY (or BA_PROVIDER=fake)".to_string(),
                });
            }
            info!("no API key configured; falling back to fake completion provider");
            Ok(Arc::new(FakeCompletionProvider::new()))
        }
        other => Err(RelayError::Config {
            message: format!("Unknown BA_PROVIDER '{}'; expected groq, openai, or fake", other),
        }),
    }
}

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
