use async_trait::async_trait;
use tracing::warn;

use crate::error::ModelError;
use crate::language::LanguageTag;
use super::Tokenizer;

/// Character-ratio token estimate, used when the real tokenizer is unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatingTokenizer;

impl EstimatingTokenizer {
    pub fn estimate(text: &str, lang: &LanguageTag) -> usize {
        let chars = text.chars().count() as f64;
        (chars / lang.script().chars_per_token()).ceil() as usize
    }
}

#[async_trait]
impl Tokenizer for EstimatingTokenizer {
    async fn count_tokens(&self, text: &str, lang: &LanguageTag) -> Result<usize, ModelError> {
        Ok(Self::estimate(text, lang))
    }
}

/// Uses the primary tokenizer and falls back to the estimate on error.
pub struct FallbackTokenizer<T> {
    primary: T,
}

impl<T> FallbackTokenizer<T> {
    pub fn new(primary: T) -> Self {
        Self { primary }
    }
}

#[async_trait]
impl<T: Tokenizer> Tokenizer for FallbackTokenizer<T> {
    async fn count_tokens(&self, text: &str, lang: &LanguageTag) -> Result<usize, ModelError> {
        match self.primary.count_tokens(text, lang).await {
            Ok(count) => Ok(count),
            Err(e) => {
                let estimate = EstimatingTokenizer::estimate(text, lang);
                warn!("Error getting token count, using estimate of {} tokens: {}", estimate, e);
                Ok(estimate)
            }
        }
    }
}
