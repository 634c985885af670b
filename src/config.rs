//! Environment-driven configuration for the relay
//!
//! Everything has a default; the server comes up with no environment at all
//! (on the fake provider). `.env` files are honored via dotenvy before load.

/// Completion provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// "groq", "openai", "fake", or empty for auto-detection by API key
    pub kind: String,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Overrides the provider's default /chat/completions base URL
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub breaker_threshold: u32,
    pub breaker_cooldown_ms: u64,
    /// Refuse to fall back to the fake provider when no key is configured
    pub strict: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: String::new(),
            groq_api_key: None,
            openai_api_key: None,
            base_url: None,
            model: "deepseek-r1-distill-qwen-32b".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            timeout_ms: 60_000,
            retries: 3,
            retry_delay_ms: 200,
            breaker_threshold: 5,
            breaker_cooldown_ms: 30_000,
            strict: false,
        }
    }
}

impl ProviderConfig {
    pub fn load_from_env() -> Self {
        let d = Self::default();
        Self {
            kind: std::env::var("BA_PROVIDER").unwrap_or_default(),
            groq_api_key: std::env::var("GROQ_API_KEY").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("BA_PROVIDER_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            model: std::env::var("BA_MODEL").unwrap_or(d.model),
            temperature: std::env::var("BA_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.temperature),
            max_tokens: std::env::var("BA_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.max_tokens),
            timeout_ms: std::env::var("BA_COMPLETION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.timeout_ms),
            retries: std::env::var("BA_PROVIDER_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0 && n <= 5)
                .unwrap_or(d.retries),
            retry_delay_ms: std::env::var("BA_RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.retry_delay_ms),
            breaker_threshold: std::env::var("BA_BREAKER_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.breaker_threshold),
            breaker_cooldown_ms: std::env::var("BA_BREAKER_COOLDOWN_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.breaker_cooldown_ms),
            strict: std::env::var("BA_PROVIDER_STRICT")
                .ok()
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }
}

/// Runtime configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub http_bind: std::net::SocketAddr,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_bind: "127.0.0.1:3005"
                .parse()
                .expect("default bind address should parse"),
            log_level: "analyst_relay=info,tower_http=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("BA_HTTP_BIND")
            && let Ok(bind) = v.parse::<std::net::SocketAddr>()
        {
            cfg.http_bind = bind;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            cfg.log_level = level;
        }
        cfg
    }
}

/// Top-level configuration assembled at process start
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub runtime: RuntimeConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config = Self {
            provider: ProviderConfig::load_from_env(),
            runtime: RuntimeConfig::load_from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            anyhow::bail!("BA_TEMPERATURE must be between 0.0 and 2.0");
        }
        if self.provider.max_tokens == 0 {
            anyhow::bail!("BA_MAX_TOKENS must be greater than 0");
        }
        if self.provider.timeout_ms == 0 {
            anyhow::bail!("BA_COMPLETION_TIMEOUT_MS must be greater than 0");
        }
        Ok(())
    }
}
