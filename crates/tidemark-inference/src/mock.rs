//! Mock embedding backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tidemark_core::EmbeddingBackend;
//! use tidemark_inference::mock::MockEmbeddingBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockEmbeddingBackend::new()
//!         .with_dimension(8)
//!         .with_fixed_embedding("rust", vec![1.0; 8]);
//!
//!     let embeddings = backend.embed_texts(&["rust".to_string()]).await.unwrap();
//!     assert_eq!(embeddings[0].as_slice(), &[1.0; 8]);
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use tidemark_core::{EmbeddingBackend, Error, Result, Vector};

/// Deterministic embedding backend.
///
/// Clones share configuration, call counters and the failure switch, so a
/// test can keep a handle while the engine owns another.
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    config: Arc<MockConfig>,
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    model: String,
    fixed: HashMap<String, Vec<f32>>,
    latency_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 8,
            model: "mock-embed".to_string(),
            fixed: HashMap::new(),
            latency_ms: 0,
        }
    }
}

impl MockEmbeddingBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            calls: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    /// Return exactly this vector for `text` (matched after trim + lowercase).
    pub fn with_fixed_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        let key = normalize(&text.into());
        Arc::make_mut(&mut self.config).fixed.insert(key, vector);
        self
    }

    /// Simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed_texts` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        self.config
            .fixed
            .get(&normalize(text))
            .cloned()
            .unwrap_or_else(|| MockEmbeddingGenerator::generate(text, self.config.dimension))
    }
}

impl Default for MockEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Embedding("Simulated failure for testing".to_string()));
        }

        Ok(texts
            .iter()
            .map(|t| Vector::from(self.embed_one(t)))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Mock embedding generator with deterministic output.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a deterministic unit vector from text.
    ///
    /// The same text always produces the same embedding.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension.max(1)];
        let len = vec.len();

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % len;
            vec[idx] += 0.1;
        }

        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }
}
