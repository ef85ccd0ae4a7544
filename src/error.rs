use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a failed call to the model server.
///
/// Callers dispatch on this instead of inspecting error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Unavailable,
    Malformed,
    Unknown,
}

impl ErrorKind {
    /// Timeouts and unavailability are expected while the model warms up.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable)
    }
}

/// Error from a single tokenizer or model invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("unsupported language tag: {0}")]
    UnsupportedLanguage(String),

    #[error("model error: {0}")]
    Failed(String),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Malformed(_) | Self::UnsupportedLanguage(_) => ErrorKind::Malformed,
            Self::Failed(_) => ErrorKind::Unknown,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }

    /// Classify an HTTP client error the same way for every endpoint.
    pub fn from_http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Duration::ZERO)
        } else if err.is_connect() || err.is_request() {
            Self::Unavailable(err.to_string())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Failed(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum LingoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Text cannot be empty")]
    EmptyText,

    #[error("Text too long: {length} characters (maximum is {max})")]
    TextTooLong { length: usize, max: usize },

    #[error("Invalid language code: {0}. Check source and target languages")]
    InvalidLanguage(String),

    #[error("Translation model is not loaded yet ({0}); retry shortly")]
    ModelNotReady(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Text produced no chunks to translate")]
    NoChunks,

    #[error("Translation failed: all {chunks} chunks failed (first failure: {first_reason})")]
    AllChunksFailed { chunks: usize, first_reason: String },

    #[error("Translation cancelled after {completed} of {total} chunks")]
    Cancelled { completed: usize, total: usize },

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl LingoError {
    /// Whether the caller should back off and retry rather than give up.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ModelNotReady(_) => true,
            Self::Model(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LingoError>;
