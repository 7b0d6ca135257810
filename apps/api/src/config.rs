use std::str::FromStr;

use anyhow::{bail, Context, Result};

const DEFAULT_UPLOAD_URL: &str = "https://agent-prod.studio.lyzr.ai/v3/assets/upload";
const DEFAULT_AGENT_URL: &str = "https://agent-prod.studio.lyzr.ai/v3/inference/chat/";
const DEFAULT_AGENT_ID: &str = "6997e0e382553f2b07a0dc97";
const DEFAULT_NOTIFY_EMAIL: &str = "recruiting@example.com";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration loaded from environment variables.
///
/// The Lyzr credential is deliberately optional: a missing key does not stop
/// the service from starting, it surfaces as a configuration failure on the
/// first upload.
#[derive(Debug, Clone)]
pub struct Config {
    pub lyzr_api_key: Option<String>,
    pub upload_url: String,
    pub agent_url: String,
    pub agent_id: String,
    pub notify_email: String,
    pub fit_threshold: u32,
    pub agent_timeout_secs: u64,
    /// Request body cap for the multipart routes.
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            lyzr_api_key: optional_env("LYZR_API_KEY"),
            upload_url: env_or("LYZR_UPLOAD_URL", DEFAULT_UPLOAD_URL),
            agent_url: env_or("AGENT_INVOKE_URL", DEFAULT_AGENT_URL),
            agent_id: env_or("AGENT_ID", DEFAULT_AGENT_ID),
            notify_email: env_or("NOTIFY_EMAIL", DEFAULT_NOTIFY_EMAIL),
            fit_threshold: parse_threshold()?,
            agent_timeout_secs: parse_env("AGENT_TIMEOUT_SECS", 120)
                .context("AGENT_TIMEOUT_SECS must be a whole number of seconds")?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
                .context("MAX_UPLOAD_BYTES must be a whole number of bytes")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn parse_threshold() -> Result<u32> {
    let threshold = parse_env("FIT_THRESHOLD", 80)
        .context("FIT_THRESHOLD must be an integer between 0 and 100")?;
    if threshold > 100 {
        bail!("FIT_THRESHOLD must be an integer between 0 and 100, got {threshold}");
    }
    Ok(threshold)
}

/// Treats an empty value the same as an unset one.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
