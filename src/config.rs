use anyhow::{Context, Result};
use std::env;

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_AI_MODEL: &str = "qwen3-vl:4b";

/// Base64 images make chat bodies large; 20 MiB by default.
pub const DEFAULT_MAX_REQUEST_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Inference endpoint
    /// Absent means every AI request fails with a configuration error.
    pub ai_api_url: Option<String>,
    pub ai_model: String,
    /// No timeout unless explicitly configured.
    pub ai_api_timeout_seconds: Option<u64>,

    // Limits
    pub max_request_body_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = parse_origins(
            &env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        // Inference endpoint
        let ai_api_url = non_empty(env::var("AI_API_URL").ok());
        let ai_model =
            non_empty(env::var("AI_MODEL").ok()).unwrap_or_else(|| DEFAULT_AI_MODEL.to_string());
        let ai_api_timeout_seconds = match non_empty(env::var("AI_API_TIMEOUT_SECONDS").ok()) {
            Some(raw) => Some(
                raw.parse()
                    .context("AI_API_TIMEOUT_SECONDS must be a whole number of seconds")?,
            ),
            None => None,
        };

        // Limits
        let max_request_body_bytes = env::var("MAX_REQUEST_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_REQUEST_BODY_BYTES);

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            ai_api_url,
            ai_model,
            ai_api_timeout_seconds,
            max_request_body_bytes,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
