//! Client for the external text-generation endpoint.
//!
//! The endpoint speaks the Ollama `generate` shape: one JSON POST with a
//! prompt, answered by `{ "response": "..." }`. Calls are not retried and,
//! unless a timeout is configured, wait as long as the upstream takes.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::Settings;
use crate::middleware::request_id::X_REQUEST_ID;

/// Sampling options for one call.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    pub temperature: f32,
}

impl GenerationOptions {
    /// Assistant replies: long enough not to cut the JSON off.
    pub const CHAT: Self = Self {
        num_predict: Some(2048),
        temperature: 0.7,
    };

    pub const SMART_REPLY: Self = Self {
        num_predict: None,
        temperature: 0.6,
    };
}

/// Body sent to the endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

/// Only `response` is read; everything else the endpoint returns is ignored.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("AI API URL not configured")]
    NotConfigured,

    #[error("AI service request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-success status; `body` is the response text as received.
    #[error("AI service returned {status}")]
    Upstream { status: StatusCode, body: String },

    #[error("Invalid AI service response: {0}")]
    InvalidResponse(#[source] reqwest::Error),
}

/// Client for the inference endpoint.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    endpoint: Option<String>,
    model: String,
}

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(endpoint: Option<&str>, model: &str, timeout_seconds: Option<u64>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        match endpoint {
            Some(url) => tracing::info!(endpoint = url, model = model, "Inference client initialized"),
            None => tracing::warn!("AI_API_URL not set - AI endpoints will answer with a configuration error"),
        }

        Ok(Self {
            client,
            endpoint: endpoint.map(str::to_string),
            model: model.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.ai_api_url.as_deref(),
            &settings.ai_model,
            settings.ai_api_timeout_seconds,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one non-streaming generation and return the generated text.
    ///
    /// A missing or null `response` field reads as an empty string.
    #[instrument(skip(self, prompt, images), fields(model = %self.model))]
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
        images: Option<&[String]>,
        request_id: Option<&str>,
    ) -> Result<String, InferenceError> {
        let url = self.endpoint.as_deref().ok_or(InferenceError::NotConfigured)?;

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
            images,
        };

        let mut req = self
            .client
            .post(url)
            .header("Content-Type", "application/json");

        if let Some(rid) = request_id {
            req = req.header(X_REQUEST_ID, rid);
        }

        debug!(url = %url, prompt_chars = prompt.len(), "Inference request");

        let response = req.json(&body).send().await.map_err(|e| {
            error!(error = %e, "Inference request failed");
            InferenceError::Transport(e)
        })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Inference endpoint error");
            return Err(InferenceError::Upstream { status, body });
        }

        let parsed = response.json::<GenerateResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse inference response");
            InferenceError::InvalidResponse(e)
        })?;

        Ok(parsed.response.unwrap_or_default())
    }
}
