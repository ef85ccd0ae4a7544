use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::chunking::Chunk;
use crate::config::{BudgetConfig, OverflowPolicy, OversizedPolicy, TranslateConfig};
use crate::error::ModelError;
use crate::language::LanguageTag;
use crate::model::{GenerateRequest, ModelOutput, TranslationModel};
use super::context::{ChunkProgress, TranslationContext};

/// Why a chunk has no translation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkFailure {
    OutputTruncated,
    Timeout(Duration),
    Model(ModelError),
    OversizedRejected { tokens: usize, budget: usize },
    Cancelled,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputTruncated => write!(f, "output truncated"),
            Self::Timeout(after) => write!(f, "timed out after {:?}", after),
            Self::Model(e) => write!(f, "{}", e),
            Self::OversizedRejected { tokens, budget } => {
                write!(f, "sentence too long ({} tokens, budget {})", tokens, budget)
            }
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkStatus {
    Success(String),
    Failure(ChunkFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkResult {
    pub chunk: Chunk,
    pub status: ChunkStatus,
}

impl ChunkResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ChunkStatus::Success(_))
    }
}

/// Translates planned chunks one at a time, in document order.
pub struct ChunkTranslator<M> {
    model: M,
    input_budget: usize,
    output_budget: usize,
    retry_output_budget: usize,
    timeout: Duration,
    oversized_policy: OversizedPolicy,
    overflow_policy: OverflowPolicy,
}

impl<M: TranslationModel> ChunkTranslator<M> {
    pub fn new(model: M, budget: &BudgetConfig, config: &TranslateConfig) -> Self {
        Self {
            model,
            input_budget: budget.effective_input_budget(),
            output_budget: budget.output_token_budget,
            retry_output_budget: budget.retry_output_budget(),
            timeout: Duration::from_secs(config.chunk_timeout_secs),
            oversized_policy: config.oversized_policy,
            overflow_policy: config.overflow_policy,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Translate every chunk; a failed chunk never stops the ones after it.
    ///
    /// Cancellation is checked before each call. Chunks not yet started when
    /// the context is cancelled are marked `Cancelled`; a call already in
    /// flight runs to completion.
    pub async fn translate_chunks(
        &self,
        chunks: Vec<Chunk>,
        source_lang: &LanguageTag,
        target_lang: &LanguageTag,
        ctx: &TranslationContext,
    ) -> Vec<ChunkResult> {
        let total = chunks.len();
        let mut results = Vec::with_capacity(total);

        for chunk in chunks {
            let status = if ctx.is_cancelled() {
                ChunkStatus::Failure(ChunkFailure::Cancelled)
            } else {
                let status = self.translate_chunk(&chunk, total, source_lang, target_lang).await;
                ctx.report(ChunkProgress {
                    index: chunk.index,
                    total,
                    succeeded: matches!(status, ChunkStatus::Success(_)),
                });
                status
            };
            results.push(ChunkResult { chunk, status });
        }

        results
    }

    async fn translate_chunk(
        &self,
        chunk: &Chunk,
        total: usize,
        source_lang: &LanguageTag,
        target_lang: &LanguageTag,
    ) -> ChunkStatus {
        let text = chunk.text();
        let source = text.trim();
        info!("┌─ Translating chunk {}/{} ────────", chunk.index + 1, total);
        info!("│ Source: {} chars, {} tokens", source.chars().count(), chunk.token_count);

        if source.is_empty() {
            info!("└─ Whitespace only, nothing to translate");
            return ChunkStatus::Success(String::new());
        }

        if chunk.oversized && self.oversized_policy == OversizedPolicy::Reject {
            warn!("└─ Rejected: {} tokens exceeds budget of {}", chunk.token_count, self.input_budget);
            return ChunkStatus::Failure(ChunkFailure::OversizedRejected {
                tokens: chunk.token_count,
                budget: self.input_budget,
            });
        }

        match self.translate_text(source, source_lang, target_lang).await {
            Ok(translation) => {
                info!("└─ Translated: {} chars", translation.chars().count());
                ChunkStatus::Success(translation)
            }
            Err(failure) => {
                warn!("└─ Failed: {}", failure);
                ChunkStatus::Failure(failure)
            }
        }
    }

    async fn translate_text(
        &self,
        text: &str,
        source_lang: &LanguageTag,
        target_lang: &LanguageTag,
    ) -> Result<String, ChunkFailure> {
        let output = self.call(text, source_lang, target_lang, self.output_budget).await?;
        if !output.hit_budget(self.output_budget) {
            return Ok(output.text.trim().to_string());
        }

        match self.overflow_policy {
            OverflowPolicy::Flag => Err(ChunkFailure::OutputTruncated),
            OverflowPolicy::RetryOnce => {
                info!("│ Output hit {} tokens, retrying with {}", self.output_budget, self.retry_output_budget);
                let retry = self.call(text, source_lang, target_lang, self.retry_output_budget).await?;
                if retry.hit_budget(self.retry_output_budget) {
                    Err(ChunkFailure::OutputTruncated)
                } else {
                    Ok(retry.text.trim().to_string())
                }
            }
        }
    }

    async fn call(
        &self,
        text: &str,
        source_lang: &LanguageTag,
        target_lang: &LanguageTag,
        max_new_tokens: usize,
    ) -> Result<ModelOutput, ChunkFailure> {
        let request = GenerateRequest {
            text: text.to_string(),
            source_lang: source_lang.clone(),
            target_lang: target_lang.clone(),
            max_new_tokens,
        };
        debug!("│ Requesting up to {} output tokens", max_new_tokens);

        match tokio::time::timeout(self.timeout, self.model.translate(&request)).await {
            Err(_) => Err(ChunkFailure::Timeout(self.timeout)),
            Ok(Err(ModelError::Timeout(after))) => Err(ChunkFailure::Timeout(after)),
            Ok(Err(e)) => Err(ChunkFailure::Model(e)),
            Ok(Ok(output)) => Ok(output),
        }
    }
}
