use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_MAX_UPLOAD_MB: usize = 20;
const DEFAULT_SESSION_TTL_MINUTES: u64 = 120;

/// Application configuration loaded from environment variables.
/// Startup fails if the API key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Request body limit for the multipart analyze route.
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are evicted.
    pub session_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let max_upload_mb = match std::env::var("MAX_UPLOAD_MB") {
            Ok(raw) => raw
                .parse::<usize>()
                .context("MAX_UPLOAD_MB must be a whole number of megabytes")?,
            Err(_) => DEFAULT_MAX_UPLOAD_MB,
        };

        let session_ttl_minutes = match std::env::var("SESSION_TTL_MINUTES") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .context("SESSION_TTL_MINUTES must be a positive whole number of minutes")?,
            Err(_) => DEFAULT_SESSION_TTL_MINUTES,
        };

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_model: optional_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            session_idle_ttl: Duration::from_secs(session_ttl_minutes * 60),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

/// Treats unset and blank variables the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
