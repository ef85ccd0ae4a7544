//! lingochunk - Long-text translation over a token-limited model
//!
//! Splits text into sentences, packs them into chunks that fit the model's
//! input token budget, translates the chunks in order and reassembles the
//! result, marking any chunk that failed in place.

pub mod bootstrap;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod model;
pub mod translate;
pub mod workflow;
