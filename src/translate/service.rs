use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use crate::chunking::{Chunk, ChunkPlanner, SentenceSplitter};
use crate::config::{BudgetConfig, Config};
use crate::error::{LingoError, ModelError, Result};
use crate::language::{Language, LanguageCatalog, LanguageTag};
use crate::model::{BackendFactory, ModelBackend, ModelHealth, Tokenizer};
use super::context::TranslationContext;
use super::reassemble::{reassemble, TranslationResult};
use super::translator::{ChunkFailure, ChunkStatus, ChunkTranslator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: LanguageTag,
    pub target_lang: LanguageTag,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: LanguageTag::new(source_lang),
            target_lang: LanguageTag::new(target_lang),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub source_lang: LanguageTag,
    pub target_lang: LanguageTag,
    #[serde(flatten)]
    pub result: TranslationResult,
}

impl TranslationResponse {
    pub fn translated_text(&self) -> &str {
        &self.result.translated_text
    }
}

/// Validates requests and runs split → plan → translate → reassemble.
pub struct TranslationService {
    backend: Arc<dyn ModelBackend>,
    tokenizer: Box<dyn Tokenizer>,
    splitter: SentenceSplitter,
    translator: ChunkTranslator<Arc<dyn ModelBackend>>,
    budget: BudgetConfig,
    catalog: LanguageCatalog,
}

impl TranslationService {
    pub fn new(config: &Config, backend: Arc<dyn ModelBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tokenizer: BackendFactory::create_tokenizer(&config.model, backend.clone()),
            splitter: SentenceSplitter::new(&config.splitter),
            translator: ChunkTranslator::new(backend.clone(), &config.budget, &config.translate),
            budget: config.budget.clone(),
            catalog: config.catalog(),
            backend,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = BackendFactory::create_backend(&config.model)?;
        Self::new(config, backend)
    }

    /// Reject requests before any chunking work starts.
    pub fn validate(&self, request: &TranslationRequest) -> Result<()> {
        if request.text.trim().is_empty() {
            return Err(LingoError::EmptyText);
        }
        let length = request.text.chars().count();
        if length > self.budget.max_text_chars {
            return Err(LingoError::TextTooLong {
                length,
                max: self.budget.max_text_chars,
            });
        }
        for lang in [&request.source_lang, &request.target_lang] {
            if !self.catalog.contains(lang) {
                return Err(LingoError::InvalidLanguage(lang.to_string()));
            }
        }
        Ok(())
    }

    /// Health of the model server, never an error.
    pub async fn health(&self) -> ModelHealth {
        match self.backend.health().await {
            Ok(health) => health,
            Err(e) => ModelHealth {
                status: format!("unavailable: {}", e),
                model_loaded: false,
                tokenizer_loaded: false,
            },
        }
    }

    async fn ensure_ready(&self) -> Result<()> {
        match self.backend.health().await {
            Ok(health) if health.is_ready() => Ok(()),
            Ok(health) => Err(LingoError::ModelNotReady(health.status)),
            Err(e) if e.is_transient() => Err(LingoError::ModelNotReady(e.to_string())),
            Err(e) => Err(LingoError::Model(e)),
        }
    }

    /// Languages in catalog order, available only once the model is loaded.
    pub async fn list_languages(&self) -> Result<Vec<Language>> {
        self.ensure_ready().await?;
        Ok(self.catalog.languages().to_vec())
    }

    /// Split and plan without translating.
    pub async fn plan(&self, request: &TranslationRequest) -> Result<Vec<Chunk>> {
        self.validate(request)?;
        self.plan_validated(request).await
    }

    async fn plan_validated(&self, request: &TranslationRequest) -> Result<Vec<Chunk>> {
        let sentences = self.splitter.split(&request.text, &request.source_lang);
        ChunkPlanner::new(self.tokenizer.as_ref(), &self.budget)
            .plan(&sentences, &request.source_lang)
            .await
    }

    pub async fn translate(
        &self,
        request: &TranslationRequest,
        ctx: &TranslationContext,
    ) -> Result<TranslationResponse> {
        let span = info_span!("translate", request_id = %ctx.request_id);
        self.run(request, ctx).instrument(span).await
    }

    async fn run(&self, request: &TranslationRequest, ctx: &TranslationContext) -> Result<TranslationResponse> {
        self.validate(request)?;
        self.ensure_ready().await?;

        info!(
            "Translating {} chars from {} to {}",
            request.text.chars().count(), request.source_lang, request.target_lang
        );

        let chunks = self.plan_validated(request).await?;
        let total = chunks.len();
        let results = self.translator
            .translate_chunks(chunks, &request.source_lang, &request.target_lang, ctx)
            .await;

        if ctx.is_cancelled() {
            let completed = results.iter()
                .filter(|r| !matches!(r.status, ChunkStatus::Failure(ChunkFailure::Cancelled)))
                .count();
            if completed < total {
                warn!("Translation cancelled after {} of {} chunks", completed, total);
                return Err(LingoError::Cancelled { completed, total });
            }
        }

        let result = reassemble(results, &request.target_lang)?;
        info!(
            "Completed translation of {} chunks: {} chars -> {} chars",
            result.chunk_count,
            request.text.chars().count(),
            result.translated_text.chars().count()
        );

        Ok(TranslationResponse {
            source_lang: request.source_lang.clone(),
            target_lang: request.target_lang.clone(),
            result,
        })
    }
}

/// Lets the bootstrap poll the service itself for language availability.
#[async_trait::async_trait]
impl crate::bootstrap::LanguageSource for TranslationService {
    async fn fetch_languages(&self) -> std::result::Result<Vec<Language>, ModelError> {
        match self.list_languages().await {
            Ok(languages) => Ok(languages),
            Err(LingoError::ModelNotReady(reason)) => Err(ModelError::Unavailable(reason)),
            Err(LingoError::Model(e)) => Err(e),
            Err(e) => Err(ModelError::Failed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock::EchoModel;
    use tokio_test::{assert_err, assert_ok};

    fn service(model: EchoModel, configure: impl FnOnce(&mut Config)) -> TranslationService {
        let mut config = Config::default();
        configure(&mut config);
        TranslationService::new(&config, Arc::new(model)).unwrap()
    }

    fn upper(text: &str) -> String {
        text.to_uppercase()
    }

    #[tokio::test]
    async fn test_short_text_single_chunk() {
        let service = service(EchoModel::new().with_transform(upper), |_| {});
        let request = TranslationRequest::new("Hello world. How are you?", "eng_Latn", "fra_Latn");
        let response = service.translate(&request, &TranslationContext::new()).await.unwrap();
        assert_eq!(response.translated_text(), "HELLO WORLD. HOW ARE YOU?");
        assert_eq!(response.result.chunk_count, 1);
        assert_eq!(response.target_lang, LanguageTag::new("fra_Latn"));
    }

    #[tokio::test]
    async fn test_two_chunk_scenario() {
        let service = service(EchoModel::new().with_transform(upper), |c| {
            c.budget.input_token_budget = 7;
            c.budget.safety_margin = 1;
        });
        let request = TranslationRequest::new("one two three. four five six. seven eight nine.", "eng_Latn", "fra_Latn");
        let response = service.translate(&request, &TranslationContext::new()).await.unwrap();
        assert_eq!(response.translated_text(), "ONE TWO THREE. FOUR FIVE SIX. SEVEN EIGHT NINE.");
        assert_eq!(response.result.chunk_count, 2);
    }

    #[tokio::test]
    async fn test_oversized_sentence_truncated_output() {
        let long = "word ".repeat(20);
        let service = service(EchoModel::new().truncate_on("word", usize::MAX), |c| {
            c.budget.input_token_budget = 10;
            c.budget.safety_margin = 2;
        });
        let request = TranslationRequest::new(format!("Short one. {}", long.trim()), "eng_Latn", "fra_Latn");
        let chunks = service.plan(&request).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].oversized);

        let response = service.translate(&request, &TranslationContext::new()).await.unwrap();
        assert!(response.result.had_partial_failure);
        assert_eq!(response.result.oversized_chunks, vec![1]);
        assert!(response.translated_text().starts_with("Short one. [Translation error in chunk 2: output truncated]"));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let service = service(EchoModel::new(), |c| c.budget.max_text_chars = 10);
        let ctx = TranslationContext::new();

        let empty = TranslationRequest::new("   ", "eng_Latn", "fra_Latn");
        assert!(matches!(service.translate(&empty, &ctx).await, Err(LingoError::EmptyText)));

        let long = TranslationRequest::new("this is longer than ten", "eng_Latn", "fra_Latn");
        assert!(matches!(
            service.translate(&long, &ctx).await,
            Err(LingoError::TextTooLong { length: 23, max: 10 })
        ));

        let bad_lang = TranslationRequest::new("hi", "eng_Latn", "xx");
        assert!(matches!(service.translate(&bad_lang, &ctx).await, Err(LingoError::InvalidLanguage(_))));

        let same = TranslationRequest::new("hi", "eng_Latn", "eng_Latn");
        assert_ok!(service.translate(&same, &ctx).await);
    }

    #[tokio::test]
    async fn test_model_not_ready() {
        let service = service(EchoModel::new().unloaded(), |_| {});
        let request = TranslationRequest::new("Hello.", "eng_Latn", "fra_Latn");
        let err = assert_err!(service.translate(&request, &TranslationContext::new()).await);
        assert!(matches!(err, LingoError::ModelNotReady(_)));
        assert!(err.is_retryable());

        assert!(matches!(service.list_languages().await, Err(LingoError::ModelNotReady(_))));
        assert!(!service.health().await.model_loaded);
    }

    #[tokio::test]
    async fn test_translate_tokenizes_like_a_single_plan() {
        let model = EchoModel::new();
        let service = service(model.clone(), |c| {
            c.budget.input_token_budget = 7;
            c.budget.safety_margin = 1;
        });
        let request = TranslationRequest::new("one two three. four five six. seven eight nine.", "eng_Latn", "fra_Latn");

        service.plan(&request).await.unwrap();
        let per_plan = model.token_calls();
        assert!(per_plan > 0);

        service.translate(&request, &TranslationContext::new()).await.unwrap();
        assert_eq!(model.token_calls(), per_plan * 2);
    }

    #[tokio::test]
    async fn test_unready_model_is_not_tokenized() {
        let model = EchoModel::new().unloaded();
        let service = service(model.clone(), |_| {});
        let request = TranslationRequest::new("Hello. World.", "eng_Latn", "fra_Latn");
        assert!(service.translate(&request, &TranslationContext::new()).await.is_err());
        assert_eq!(model.token_calls(), 0);
    }

    #[tokio::test]
    async fn test_all_chunks_failed() {
        let service = service(EchoModel::new().fail_on("a"), |c| {
            c.budget.input_token_budget = 3;
            c.budget.safety_margin = 1;
        });
        let request = TranslationRequest::new("a b. a c. a d.", "eng_Latn", "fra_Latn");
        let err = assert_err!(service.translate(&request, &TranslationContext::new()).await);
        assert!(matches!(err, LingoError::AllChunksFailed { chunks: 3, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let service = service(EchoModel::new(), |_| {});
        let ctx = TranslationContext::new();
        ctx.cancellation_token().cancel();
        let request = TranslationRequest::new("Hello.", "eng_Latn", "fra_Latn");
        assert!(matches!(
            service.translate(&request, &ctx).await,
            Err(LingoError::Cancelled { completed: 0, total: 1 })
        ));
    }

    #[tokio::test]
    async fn test_languages_in_catalog_order() {
        let service = service(EchoModel::new(), |_| {});
        let languages = service.list_languages().await.unwrap();
        assert_eq!(languages.len(), 20);
        assert_eq!(languages[0], Language::new("eng_Latn", "English"));
        assert_eq!(languages[19], Language::new("pol_Latn", "Polish"));
    }
}
