// Model seam
//
// Tokenization and translation are provided by an external model. This module
// defines the traits the chunking engine depends on and a factory for the
// available backends:
// - Http: a model server reached over HTTP
// - Echo: a deterministic in-process model

pub mod estimate;
pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use estimate::{EstimatingTokenizer, FallbackTokenizer};
use crate::config::{BackendKind, ModelConfig};
use crate::error::{ModelError, Result};
use crate::language::LanguageTag;

/// Counts the tokens a text consumes under a language.
#[async_trait]
pub trait Tokenizer: Send + Sync {
    async fn count_tokens(&self, text: &str, lang: &LanguageTag) -> std::result::Result<usize, ModelError>;
}

/// One translation call against the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    pub source_lang: LanguageTag,
    pub target_lang: LanguageTag,
    pub max_new_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub text: String,
    pub output_tokens: usize,
    /// Set by the model when generation stopped on the token limit
    #[serde(default)]
    pub truncated: bool,
}

impl ModelOutput {
    pub fn hit_budget(&self, max_new_tokens: usize) -> bool {
        self.truncated || self.output_tokens >= max_new_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHealth {
    pub status: String,
    pub model_loaded: bool,
    pub tokenizer_loaded: bool,
}

impl ModelHealth {
    pub fn is_ready(&self) -> bool {
        self.model_loaded && self.tokenizer_loaded
    }
}

/// Translates a single piece of text.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    async fn translate(&self, request: &GenerateRequest) -> std::result::Result<ModelOutput, ModelError>;

    async fn health(&self) -> std::result::Result<ModelHealth, ModelError>;
}

/// A backend providing both capabilities.
pub trait ModelBackend: Tokenizer + TranslationModel {}

impl<T: Tokenizer + TranslationModel> ModelBackend for T {}

#[async_trait]
impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    async fn count_tokens(&self, text: &str, lang: &LanguageTag) -> std::result::Result<usize, ModelError> {
        (**self).count_tokens(text, lang).await
    }
}

#[async_trait]
impl<T: TranslationModel + ?Sized> TranslationModel for Arc<T> {
    async fn translate(&self, request: &GenerateRequest) -> std::result::Result<ModelOutput, ModelError> {
        (**self).translate(request).await
    }

    async fn health(&self) -> std::result::Result<ModelHealth, ModelError> {
        (**self).health().await
    }
}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    pub fn create_backend(config: &ModelConfig) -> Result<Arc<dyn ModelBackend>> {
        match config.backend {
            BackendKind::Http => Ok(Arc::new(http::HttpModel::new(config)?)),
            BackendKind::Echo => Ok(Arc::new(mock::EchoModel::new())),
        }
    }

    /// Tokenizer for the backend, wrapped with the estimator when configured.
    pub fn create_tokenizer(config: &ModelConfig, backend: Arc<dyn ModelBackend>) -> Box<dyn Tokenizer> {
        if config.fallback_to_estimate {
            Box::new(FallbackTokenizer::new(backend))
        } else {
            Box::new(backend)
        }
    }
}
