//! Ollama embedding backend.
//!
//! Search only ever embeds the query text, so each call is a single small
//! `/api/embed` request bounded by the configured timeout.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use tidemark_core::defaults::{EMBED_DIMENSION, EMBED_MODEL, EMBED_TIMEOUT_SECS, OLLAMA_URL};
use tidemark_core::{EmbeddingBackend, Error, Result, Vector};

/// Embedding calls slower than this are logged at WARN.
const SLOW_EMBED_MS: u64 = 5000;

/// Where and how to reach Ollama.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(OLLAMA_URL)
    }
}

impl OllamaConfig {
    /// Default model, dimension and timeout against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: EMBED_MODEL.to_string(),
            dimension: EMBED_DIMENSION,
            timeout: Duration::from_secs(EMBED_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `OLLAMA_BASE`, `OLLAMA_EMBED_MODEL`, `OLLAMA_EMBED_DIM` and
    /// `TIDEMARK_EMBED_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup("OLLAMA_BASE").unwrap_or_else(|| OLLAMA_URL.to_string()));
        if let Some(model) = lookup("OLLAMA_EMBED_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(dimension) = lookup("OLLAMA_EMBED_DIM")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|d| *d > 0)
        {
            config.dimension = dimension;
        }
        if let Some(secs) = lookup("TIDEMARK_EMBED_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Ollama embedding backend.
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        info!(
            subsystem = "inference",
            component = "ollama",
            url = %config.base_url,
            model = %config.model,
            dimension = config.dimension,
            timeout_ms = config.timeout.as_millis() as u64,
            "Ollama embedding backend configured"
        );

        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Whether the server answers `/api/tags`. Errors read as unhealthy.
    pub async fn health_check(&self) -> bool {
        let outcome = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match outcome {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(subsystem = "inference", status = %resp.status(), "Ollama unhealthy");
                false
            }
            Err(e) => {
                warn!(subsystem = "inference", error = %e, "Ollama unreachable");
                false
            }
        }
    }

    /// Check the response shape against what was asked for.
    fn check_embeddings(&self, requested: usize, embeddings: &[Vec<f32>]) -> Result<()> {
        if embeddings.len() != requested {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                requested,
                embeddings.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.config.dimension) {
            return Err(Error::Embedding(format!(
                "Expected dimension {}, got {}",
                self.config.dimension,
                bad.len()
            )));
        }
        Ok(())
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new(OllamaConfig::default())
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    #[instrument(
        skip(self, texts),
        fields(subsystem = "inference", component = "ollama", op = "embed_texts",
               model = %self.config.model, input_count = texts.len())
    )]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/api/embed", self.config.base_url))
            .json(&EmbedRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("Ollama returned {}: {}", status, body)));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Unreadable Ollama response: {}", e)))?;
        self.check_embeddings(texts.len(), &parsed.embeddings)?;

        let elapsed = start.elapsed().as_millis() as u64;
        if elapsed > SLOW_EMBED_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow query embedding");
        } else {
            debug!(duration_ms = elapsed, "Query embedded");
        }
        Ok(parsed.embeddings.into_iter().map(Vector::from).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
