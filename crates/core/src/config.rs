use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f32(profile: &str, key: &str, default: f32) -> f32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_list(profile: &str, key: &str) -> Vec<String> {
    profiled_env_opt(profile, key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub sentiment: SentimentConfig,
    pub geocoder: GeocoderConfig,
    pub priority: PriorityConfig,
    pub router: RouterConfig,
    pub uploads_dir: PathBuf,
    pub data_dir: PathBuf,
    pub max_upload_size_mb: u32,
    pub llm_concurrency: u32,
    pub database_url: Option<String>,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &[
    "LLM_API_KEY",
    "SENTIMENT_API_KEY",
    "PRIMARY_GEOCODER_KEY",
];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TRIAGE_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TRIAGE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            sentiment: SentimentConfig::from_env_profiled(p),
            geocoder: GeocoderConfig::from_env_profiled(p),
            priority: PriorityConfig::from_env_profiled(p),
            router: RouterConfig::from_env_profiled(p),
            uploads_dir: PathBuf::from(profiled_env_or(p, "UPLOADS_DIR", "uploads")),
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            max_upload_size_mb: profiled_env_u32(p, "MAX_UPLOAD_SIZE_MB", 10),
            llm_concurrency: profiled_env_u32(p, "LLM_CONCURRENCY", 5),
            database_url: profiled_env_opt(p, "DATABASE_URL"),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  llm:         provider={}, model={}", self.llm.provider, self.llm.model);
        tracing::info!("  sentiment:   model={}", self.sentiment.model);
        tracing::info!("  geocoder:    primary configured={}", self.geocoder.primary_key.is_some());
        tracing::info!("  priority:    spam_threshold={}, expansion_countries={}", self.priority.spam_threshold, self.priority.expansion_countries.len());
        tracing::info!("  uploads_dir: {}", self.uploads_dir.display());
        tracing::info!("  data_dir:    {}", self.data_dir.display());
        tracing::info!("  llm_concurrency: {}", self.llm_concurrency);
        tracing::info!("  database:    configured={}", self.database_url.is_some());
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.model,
                "configured": self.llm.is_configured(),
            },
            "sentiment": {
                "model": self.sentiment.model,
                "configured": self.sentiment.is_configured(),
            },
            "geocoder": {
                "primary_configured": self.geocoder.primary_key.is_some(),
                "fallback_url": self.geocoder.fallback_url,
            },
            "priority": {
                "spam_threshold": self.priority.spam_threshold,
                "expansion_countries": self.priority.expansion_countries,
            },
            "uploads_dir": self.uploads_dir,
            "data_dir": self.data_dir,
            "llm_concurrency": self.llm_concurrency,
            "database_configured": self.database_url.is_some(),
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "SERVER_HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "SERVER_PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── LLM classifier (type/language/summary) ───────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "openai"),
            endpoint: profiled_env_or(
                p,
                "LLM_ENDPOINT",
                "https://openrouter.ai/api/v1/chat/completions",
            ),
            model: profiled_env_or(p, "LLM_MODEL", "gpt-4o-mini"),
            api_key: profiled_env_opt(p, "LLM_API_KEY"),
            temperature: profiled_env_f32(p, "LLM_TEMPERATURE", 0.1),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 1000),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Sentiment classifier ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl SentimentConfig {
    fn from_env_profiled(p: &str) -> Self {
        let fallback_endpoint = profiled_env_or(
            p,
            "LLM_ENDPOINT",
            "https://openrouter.ai/api/v1/chat/completions",
        );
        let fallback_model = profiled_env_or(p, "LLM_MODEL", "gpt-4o-mini");
        let fallback_key = profiled_env_opt(p, "LLM_API_KEY");
        Self {
            endpoint: profiled_env_opt(p, "SENTIMENT_ENDPOINT").unwrap_or(fallback_endpoint),
            model: profiled_env_opt(p, "SENTIMENT_MODEL").unwrap_or(fallback_model),
            api_key: profiled_env_opt(p, "SENTIMENT_API_KEY").or(fallback_key),
            temperature: profiled_env_f32(p, "SENTIMENT_TEMPERATURE", 0.0),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Geocoder ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub primary_key: Option<String>,
    pub primary_url: String,
    pub fallback_url: String,
}

impl GeocoderConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            primary_key: profiled_env_opt(p, "PRIMARY_GEOCODER_KEY"),
            primary_url: profiled_env_or(p, "PRIMARY_GEOCODER_URL", "https://catalog.api.2gis.com/3.0/items/geocode"),
            fallback_url: profiled_env_or(p, "FALLBACK_GEOCODER_URL", "https://nominatim.openstreetmap.org/search"),
        }
    }
}

// ── Priority engine ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    pub spam_threshold: f64,
    pub expansion_countries: Vec<String>,
}

impl PriorityConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            spam_threshold: profiled_env_or(p, "SPAM_THRESHOLD", "0.5")
                .parse()
                .unwrap_or(0.5),
            expansion_countries: profiled_env_list(p, "EXPANSION_COUNTRIES"),
        }
    }
}

// ── Router ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub geo_fallback_radius_km: f64,
    pub geo_radius_multiplier: f64,
}

impl RouterConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            geo_fallback_radius_km: profiled_env_or(p, "ROUTER_GEO_FALLBACK_RADIUS_KM", "50")
                .parse()
                .unwrap_or(50.0),
            geo_radius_multiplier: profiled_env_or(p, "ROUTER_GEO_RADIUS_MULTIPLIER", "1.5")
                .parse()
                .unwrap_or(1.5),
        }
    }
}
