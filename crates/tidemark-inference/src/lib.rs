//! # tidemark-inference
//!
//! Embedding backends for tidemark bookmark search.
//!
//! This crate provides:
//! - Ollama embedding backend (default)
//! - A deterministic mock backend (feature `mock`, always on in tests)
//! - A process-wide, lazily initialised backend handle
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable the Ollama backend
//! - `mock`: Export the mock backend for downstream tests
//!
//! # Example
//!
//! ```rust,no_run
//! use tidemark_core::EmbeddingBackend;
//! use tidemark_inference::OllamaBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     let texts = vec!["Hello".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub mod shared;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaBackend, OllamaConfig};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbeddingBackend, MockEmbeddingGenerator};

pub use tidemark_core::{EmbeddingBackend, Error, Result, Vector};
