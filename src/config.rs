use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{LingoError, Result};
use crate::language::{default_languages, Language, LanguageCatalog};

fn default_fallback_to_estimate() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub budget: BudgetConfig,
    pub splitter: SplitterConfig,
    pub model: ModelConfig,
    pub translate: TranslateConfig,
    pub bootstrap: BootstrapConfig,
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,
}

/// Token and length limits of the underlying model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetConfig {
    /// Maximum tokens accepted by the model per call
    pub input_token_budget: usize,
    /// Tokens reserved for special tokens and language codes
    pub safety_margin: usize,
    /// Maximum tokens the model may generate per call
    pub output_token_budget: usize,
    /// Output budget used when retrying a truncated chunk, twice the output budget when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_output_token_budget: Option<usize>,
    /// Maximum characters accepted per request
    pub max_text_chars: usize,
}

impl BudgetConfig {
    /// Token count a chunk must not exceed.
    pub fn effective_input_budget(&self) -> usize {
        self.input_token_budget.saturating_sub(self.safety_margin)
    }

    pub fn retry_output_budget(&self) -> usize {
        self.retry_output_token_budget
            .unwrap_or_else(|| self.output_token_budget.saturating_mul(2))
    }

    pub fn validate(&self) -> Result<()> {
        if self.safety_margin >= self.input_token_budget {
            return Err(LingoError::Config(format!(
                "safety_margin ({}) must be smaller than input_token_budget ({})",
                self.safety_margin, self.input_token_budget
            )));
        }
        if self.output_token_budget == 0 {
            return Err(LingoError::Config("output_token_budget must be positive".to_string()));
        }
        if self.retry_output_budget() <= self.output_token_budget {
            return Err(LingoError::Config(format!(
                "retry_output_token_budget ({}) must be larger than output_token_budget ({})",
                self.retry_output_budget(), self.output_token_budget
            )));
        }
        if self.max_text_chars == 0 {
            return Err(LingoError::Config("max_text_chars must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitterConfig {
    /// Maximum characters per sentence for scripts without sentence punctuation
    pub max_span_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Which backend serves tokenization and translation
    pub backend: BackendKind,
    /// Model server endpoint URL
    pub endpoint: String,
    /// HTTP client timeout in seconds
    pub request_timeout_secs: u64,
    /// Estimate token counts from character length when the tokenizer fails
    #[serde(default = "default_fallback_to_estimate")]
    pub fallback_to_estimate: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackendKind {
    /// Remote model server over HTTP
    Http,
    /// In-process echo model, useful offline and for smoke tests
    Echo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslateConfig {
    /// Per-chunk timeout in seconds
    pub chunk_timeout_secs: u64,
    /// What to do with a single sentence larger than the input budget
    pub oversized_policy: OversizedPolicy,
    /// What to do when the model fills its output budget
    pub overflow_policy: OverflowPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OversizedPolicy {
    /// Send the sentence anyway and report it as oversized
    Accept,
    /// Fail the chunk without calling the model
    Reject,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Mark the chunk as failed with "output truncated"
    Flag,
    /// Retry once with the larger retry budget before failing the chunk
    RetryOnce,
}

/// Backoff parameters for waiting on the model to load
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootstrapConfig {
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget: BudgetConfig {
                input_token_budget: 1024,
                safety_margin: 50,
                output_token_budget: 2048,
                retry_output_token_budget: None,
                max_text_chars: 5000,
            },
            splitter: SplitterConfig {
                max_span_chars: 200,
            },
            model: ModelConfig {
                backend: BackendKind::Http,
                endpoint: "http://localhost:8000".to_string(),
                request_timeout_secs: 300,
                fallback_to_estimate: default_fallback_to_estimate(),
            },
            translate: TranslateConfig {
                chunk_timeout_secs: 120,
                oversized_policy: OversizedPolicy::Accept,
                overflow_policy: OverflowPolicy::Flag,
            },
            bootstrap: BootstrapConfig {
                initial_delay_ms: 2000,
                multiplier: 1.5,
                max_delay_ms: 10000,
                max_attempts: 10,
            },
            languages: default_languages(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LingoError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.budget.validate()?;
        if self.splitter.max_span_chars == 0 {
            return Err(LingoError::Config("max_span_chars must be positive".to_string()));
        }
        if self.bootstrap.max_attempts == 0 {
            return Err(LingoError::Config("bootstrap max_attempts must be positive".to_string()));
        }
        if self.bootstrap.multiplier.is_nan() || self.bootstrap.multiplier < 1.0 {
            return Err(LingoError::Config(format!(
                "bootstrap multiplier must be at least 1.0, got {}",
                self.bootstrap.multiplier
            )));
        }
        if self.translate.chunk_timeout_secs == 0 {
            return Err(LingoError::Config("chunk_timeout_secs must be positive".to_string()));
        }
        if self.languages.is_empty() {
            return Err(LingoError::Config("language catalog is empty".to_string()));
        }
        Ok(())
    }

    pub fn catalog(&self) -> LanguageCatalog {
        LanguageCatalog::new(self.languages.clone())
    }
}
