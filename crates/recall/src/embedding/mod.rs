//! Embedding generation for similarity search
//!
//! The store embeds content on write because the underlying database has
//! no server-side vectorizer. The provider trait keeps the store testable
//! without pulling model weights.

use std::sync::Mutex;

use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};

use crate::error::{RecallError, Result};

/// Dimension of all embeddings in the system
pub const EMBEDDING_DIMENSION: usize = 384;

/// Trait for embedding providers
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a vector of `EMBEDDING_DIMENSION` floats
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Local embedding model (multilingual-e5-small via fastembed)
pub struct LocalEmbedding {
    // fastembed's embed takes &mut self; the lock keeps this provider
    // usable behind a shared reference
    model: Mutex<TextEmbedding>,
}

impl LocalEmbedding {
    /// Load the model, downloading weights on first use
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(FastEmbedModel::MultilingualE5Small))
            .map_err(|e| RecallError::Embedding(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl EmbeddingProvider for LocalEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| RecallError::Embedding("Embedding model lock poisoned".to_string()))?;

        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| RecallError::Embedding(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RecallError::Embedding("No embedding returned".to_string()))
    }
}
