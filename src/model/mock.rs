//! Deterministic in-process model.
//!
//! `EchoModel` returns its input (optionally transformed) as the translation
//! and counts tokens by words, or by characters for scripts written without
//! spaces. Failures can be injected per chunk by matching on the chunk text:
//! - `fail_on` makes the call return a model error
//! - `truncate_on` reports the output as cut off below a token budget
//! - `delay_on` sleeps before answering, for timeout handling
//! - `unloaded` behaves like a server that is still loading the model

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::ModelError;
use crate::language::{LanguageTag, Script};
use super::{GenerateRequest, ModelHealth, ModelOutput, TranslationModel, Tokenizer};

#[derive(Clone, Default)]
pub struct EchoModel {
    transform: Option<fn(&str) -> String>,
    fail_on: Vec<String>,
    truncate_on: Vec<(String, usize)>,
    delay_on: Vec<(String, Duration)>,
    unloaded: bool,
    broken_tokenizer: bool,
    calls: Arc<Mutex<Vec<GenerateRequest>>>,
    token_calls: Arc<AtomicUsize>,
}

impl EchoModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `transform` to each chunk instead of echoing it verbatim
    pub fn with_transform(mut self, transform: fn(&str) -> String) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }

    /// Report truncation for matching chunks unless the call allows at least `needs` tokens
    pub fn truncate_on(mut self, needle: &str, needs: usize) -> Self {
        self.truncate_on.push((needle.to_string(), needs));
        self
    }

    pub fn delay_on(mut self, needle: &str, delay: Duration) -> Self {
        self.delay_on.push((needle.to_string(), delay));
        self
    }

    pub fn unloaded(mut self) -> Self {
        self.unloaded = true;
        self
    }

    pub fn with_broken_tokenizer(mut self) -> Self {
        self.broken_tokenizer = true;
        self
    }

    /// Requests received so far, in call order
    pub fn calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of token counts requested so far
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    fn count(text: &str, lang: &LanguageTag) -> usize {
        match lang.script() {
            Script::Latin | Script::Cyrillic | Script::Arabic | Script::Devanagari
            | Script::Tamil | Script::Hangul | Script::Other => text.split_whitespace().count(),
            _ => text.chars().filter(|c| !c.is_whitespace()).count(),
        }
    }
}

#[async_trait]
impl Tokenizer for EchoModel {
    async fn count_tokens(&self, text: &str, lang: &LanguageTag) -> Result<usize, ModelError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        if self.unloaded {
            return Err(ModelError::Unavailable("tokenizer not loaded".to_string()));
        }
        if self.broken_tokenizer {
            return Err(ModelError::Failed("tokenizer crashed".to_string()));
        }
        Ok(Self::count(text, lang))
    }
}

#[async_trait]
impl TranslationModel for EchoModel {
    async fn translate(&self, request: &GenerateRequest) -> Result<ModelOutput, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if self.unloaded {
            return Err(ModelError::Unavailable("model not loaded".to_string()));
        }

        if let Some((_, delay)) = self.delay_on.iter().find(|(n, _)| request.text.contains(n.as_str())) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_on.iter().any(|n| request.text.contains(n.as_str())) {
            return Err(ModelError::Failed(format!("injected failure for '{}'", request.text)));
        }

        let text = match self.transform {
            Some(transform) => transform(&request.text),
            None => request.text.clone(),
        };
        let truncated = self.truncate_on.iter()
            .any(|(n, needs)| request.text.contains(n.as_str()) && request.max_new_tokens < *needs);
        let output_tokens = if truncated {
            request.max_new_tokens
        } else {
            Self::count(&text, &request.target_lang).min(request.max_new_tokens.saturating_sub(1))
        };

        Ok(ModelOutput { text, output_tokens, truncated })
    }

    async fn health(&self) -> Result<ModelHealth, ModelError> {
        Ok(ModelHealth {
            status: if self.unloaded { "loading" } else { "healthy" }.to_string(),
            model_loaded: !self.unloaded,
            tokenizer_loaded: !self.unloaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, max_new_tokens: usize) -> GenerateRequest {
        GenerateRequest {
            text: text.to_string(),
            source_lang: "eng_Latn".into(),
            target_lang: "fra_Latn".into(),
            max_new_tokens,
        }
    }

    #[tokio::test]
    async fn test_echo_and_record() {
        let model = EchoModel::new().with_transform(|s| s.to_uppercase());
        let output = model.translate(&request("hello world", 100)).await.unwrap();
        assert_eq!(output.text, "HELLO WORLD");
        assert!(!output.hit_budget(100));
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_truncation_depends_on_budget() {
        let model = EchoModel::new().truncate_on("long", 50);
        assert!(model.translate(&request("long text", 10)).await.unwrap().hit_budget(10));
        assert!(!model.translate(&request("long text", 50)).await.unwrap().hit_budget(50));
    }

    #[tokio::test]
    async fn test_token_count_by_script() {
        let model = EchoModel::new();
        assert_eq!(model.count_tokens("a b c", &"eng_Latn".into()).await.unwrap(), 3);
        assert_eq!(model.count_tokens("សួស្តី", &"khm_Khmr".into()).await.unwrap(), 6);
    }
}
