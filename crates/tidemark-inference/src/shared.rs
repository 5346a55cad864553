//! Process-wide embedding backend handle.
//!
//! The backend is created once, on first use, and then handed to the search
//! engine explicitly. Nothing in the retrieval layer reaches for this module
//! directly; only the process bootstrap does.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use tidemark_core::{EmbeddingBackend, Error, Result};

static SHARED_BACKEND: OnceCell<Arc<dyn EmbeddingBackend>> = OnceCell::new();

/// Install a specific backend as the process-wide handle.
///
/// Fails if a backend has already been installed or initialised.
pub fn install(backend: Arc<dyn EmbeddingBackend>) -> Result<()> {
    SHARED_BACKEND
        .set(backend)
        .map_err(|_| Error::Config("Embedding backend already initialised".to_string()))
}

/// The process-wide backend, initialising it with `init` on first call.
pub fn get_or_init<F>(init: F) -> Arc<dyn EmbeddingBackend>
where
    F: FnOnce() -> Arc<dyn EmbeddingBackend>,
{
    SHARED_BACKEND
        .get_or_init(|| {
            let backend = init();
            info!(
                subsystem = "inference",
                component = "shared",
                model = backend.model_name(),
                dimension = backend.dimension(),
                "Embedding backend initialised"
            );
            backend
        })
        .clone()
}

/// The process-wide Ollama backend configured from the environment.
#[cfg(feature = "ollama")]
pub fn shared_backend() -> Arc<dyn EmbeddingBackend> {
    get_or_init(|| Arc::new(crate::OllamaBackend::from_env()))
}

#[cfg(all(test, feature = "ollama"))]
mod tests {
    use super::*;

    #[test]
    fn test_shared_handle_initialised_once() {
        let first = shared_backend();
        let second = get_or_init(|| panic!("must not re-initialise"));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(install(first).is_err());
    }
}
