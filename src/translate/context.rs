use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Progress of one chunk, reported after the chunk finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkProgress {
    pub index: usize,
    pub total: usize,
    pub succeeded: bool,
}

pub type ProgressObserver = Arc<dyn Fn(&ChunkProgress) + Send + Sync>;

/// State owned by a single translation request.
///
/// Passed explicitly through the pipeline so nothing about a request lives in
/// process-wide state.
#[derive(Clone)]
pub struct TranslationContext {
    pub request_id: Uuid,
    cancel: CancellationToken,
    progress: Option<ProgressObserver>,
}

impl TranslationContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, observer: ProgressObserver) -> Self {
        self.progress = Some(observer);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report(&self, progress: ChunkProgress) {
        if let Some(observer) = &self.progress {
            observer(&progress);
        }
    }
}

impl Default for TranslationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TranslationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationContext")
            .field("request_id", &self.request_id)
            .field("cancelled", &self.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
