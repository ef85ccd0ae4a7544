//! Waiting for the model to come up.
//!
//! The bootstrap polls a [`LanguageSource`] until it returns the language list,
//! backing off exponentially on transient failures:
//!
//! ```text
//! Idle --start--> Polling --success--> Ready
//!                    |  ^
//!  transient error   |  | (delay grows, capped)
//!                    v  |
//!                  Polling --attempts exhausted--> Degraded --retry--> Polling
//! ```
//!
//! Progress is published on a `tokio::sync::watch` channel so callers can show
//! "attempt k of N" while waiting.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::BootstrapConfig;
use crate::error::{ErrorKind, ModelError};
use crate::language::Language;

/// Anything that can report the supported languages once the model is loaded.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageSource: Send + Sync {
    async fn fetch_languages(&self) -> Result<Vec<Language>, ModelError>;
}

#[async_trait]
impl<T: LanguageSource + ?Sized> LanguageSource for Arc<T> {
    async fn fetch_languages(&self) -> Result<Vec<Language>, ModelError> {
        (**self).fetch_languages().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Idle,
    Polling,
    Ready,
    Degraded,
}

/// Capped exponential backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Backoff {
    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts,
        }
    }

    /// Delay after the `failure`-th consecutive failure (1-based).
    pub fn delay_for(&self, failure: u32) -> Duration {
        let exponent = failure.saturating_sub(1).min(i32::MAX as u32) as i32;
        let ms = self.initial.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.round() as u64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapStatus {
    pub state: BootstrapState,
    /// Attempts made in the current polling run
    pub attempt: u32,
    pub max_attempts: u32,
    pub next_delay: Option<Duration>,
    pub last_error: Option<String>,
    pub last_error_kind: Option<ErrorKind>,
    pub languages: Vec<Language>,
}

impl BootstrapStatus {
    fn idle(max_attempts: u32) -> Self {
        Self {
            state: BootstrapState::Idle,
            attempt: 0,
            max_attempts,
            next_delay: None,
            last_error: None,
            last_error_kind: None,
            languages: Vec::new(),
        }
    }

    /// Human-readable line describing where the bootstrap stands.
    pub fn progress_message(&self) -> String {
        match self.state {
            BootstrapState::Idle => "Not started".to_string(),
            BootstrapState::Ready => format!("Ready, {} languages available", self.languages.len()),
            BootstrapState::Polling => match self.next_delay {
                Some(delay) => format!(
                    "Model loading, retrying (attempt {} of {}) in {:.1}s",
                    self.attempt + 1,
                    self.max_attempts,
                    delay.as_secs_f64()
                ),
                None => format!(
                    "Connecting to model (attempt {} of {})",
                    self.attempt, self.max_attempts
                ),
            },
            BootstrapState::Degraded => format!(
                "Model unavailable after {} attempts ({}); retry manually",
                self.attempt,
                self.last_error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

pub struct Bootstrap<S> {
    source: S,
    backoff: Backoff,
    status: watch::Sender<BootstrapStatus>,
}

impl<S: LanguageSource> Bootstrap<S> {
    pub fn new(source: S, config: &BootstrapConfig) -> Self {
        let backoff = Backoff::from_config(config);
        let (status, _) = watch::channel(BootstrapStatus::idle(backoff.max_attempts));
        Self { source, backoff, status }
    }

    pub fn subscribe(&self) -> watch::Receiver<BootstrapStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> BootstrapStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> BootstrapState {
        self.status.borrow().state
    }

    /// Idle → Polling. Any other state is returned unchanged.
    pub async fn start(&self) -> BootstrapState {
        match self.state() {
            BootstrapState::Idle => self.poll().await,
            other => {
                warn!("Bootstrap already started (state {:?})", other);
                other
            }
        }
    }

    /// Degraded → Polling, starting a fresh run of attempts.
    pub async fn retry(&self) -> BootstrapState {
        match self.state() {
            BootstrapState::Degraded => self.poll().await,
            other => {
                warn!("Manual retry ignored in state {:?}", other);
                other
            }
        }
    }

    async fn poll(&self) -> BootstrapState {
        let max_attempts = self.backoff.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.status.send_modify(|s| {
                s.state = BootstrapState::Polling;
                s.attempt = attempt;
                s.next_delay = None;
            });

            let error = match self.source.fetch_languages().await {
                Ok(languages) => {
                    info!("Model ready after {} attempt(s), {} languages", attempt, languages.len());
                    self.status.send_modify(|s| {
                        s.state = BootstrapState::Ready;
                        s.last_error = None;
                        s.last_error_kind = None;
                        s.languages = languages;
                    });
                    return BootstrapState::Ready;
                }
                Err(e) => e,
            };

            let kind = error.kind();
            let exhausted = attempt >= max_attempts;
            if !kind.is_transient() || exhausted {
                self.status.send_modify(|s| {
                    s.state = BootstrapState::Degraded;
                    s.last_error = Some(error.to_string());
                    s.last_error_kind = Some(kind);
                });
                warn!("{}", self.status.borrow().progress_message());
                return BootstrapState::Degraded;
            }

            let delay = self.backoff.delay_for(attempt);
            self.status.send_modify(|s| {
                s.next_delay = Some(delay);
                s.last_error = Some(error.to_string());
                s.last_error_kind = Some(kind);
            });
            info!("{}", self.status.borrow().progress_message());
            tokio::time::sleep(delay).await;
        }
    }
}

impl<S: LanguageSource + 'static> Bootstrap<S> {
    /// Run the bootstrap on its own task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<BootstrapState> {
        tokio::spawn(async move { self.start().await })
    }
}
