// Token-aware chunking
//
// Text is first split into sentences (script-aware, lossless), then packed
// greedily into chunks that fit the model's input token budget.

pub mod planner;
pub mod splitter;

pub use planner::{Chunk, ChunkPlanner};
pub use splitter::{Sentence, SentenceSplitter};
