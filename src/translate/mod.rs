// Chunked translation pipeline
//
// - translator: sends planned chunks to the model one at a time, in order,
//   isolating failures per chunk
// - reassemble: joins chunk translations and marks failed chunks in place
// - service: request validation, readiness gating and orchestration

pub mod context;
pub mod reassemble;
pub mod service;
pub mod translator;

pub use context::{ChunkProgress, ProgressObserver, TranslationContext};
pub use reassemble::{reassemble, TranslationResult};
pub use service::{TranslationRequest, TranslationResponse, TranslationService};
pub use translator::{ChunkFailure, ChunkResult, ChunkStatus, ChunkTranslator};
