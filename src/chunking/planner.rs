use tracing::{debug, info, warn};

use crate::config::BudgetConfig;
use crate::error::Result;
use crate::language::LanguageTag;
use crate::model::Tokenizer;
use super::splitter::Sentence;

/// Consecutive sentences translated by a single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub sentences: Vec<Sentence>,
    pub token_count: usize,
    /// A lone sentence larger than the input budget
    pub oversized: bool,
}

impl Chunk {
    pub fn text(&self) -> String {
        self.sentences.iter().map(|s| s.text.as_str()).collect()
    }

    /// Byte range of the chunk in the original text.
    pub fn span(&self) -> (usize, usize) {
        let start = self.sentences.first().map_or(0, |s| s.start);
        let end = self.sentences.last().map_or(start, |s| s.end);
        (start, end)
    }
}

/// Greedily packs sentences into chunks that fit the input token budget.
pub struct ChunkPlanner<'a> {
    tokenizer: &'a dyn Tokenizer,
    budget: usize,
}

impl<'a> ChunkPlanner<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, budget: &BudgetConfig) -> Self {
        Self {
            tokenizer,
            budget: budget.effective_input_budget(),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Plan chunks for `sentences`.
    ///
    /// The token count of a candidate chunk is measured on its concatenated
    /// text, since tokenization is not additive across sentence boundaries.
    /// A sentence that alone exceeds the budget becomes its own chunk and is
    /// flagged `oversized` instead of being cut. Whitespace-only sentences
    /// are attached to a neighbour even when that makes the chunk oversized.
    pub async fn plan(&self, sentences: &[Sentence], lang: &LanguageTag) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current: Vec<Sentence> = Vec::new();
        let mut current_tokens = 0;

        for sentence in sentences {
            if current.is_empty() {
                current.push(sentence.clone());
                current_tokens = self.tokenizer.count_tokens(&sentence.text, lang).await?;
                continue;
            }

            let candidate: String = current.iter()
                .chain(std::iter::once(sentence))
                .map(|s| s.text.as_str())
                .collect();
            let candidate_tokens = self.tokenizer.count_tokens(&candidate, lang).await?;

            // Whitespace never stands alone as a chunk
            let blank = is_blank(&sentence.text) || current.iter().all(|s| is_blank(&s.text));
            if candidate_tokens <= self.budget || blank {
                current.push(sentence.clone());
                current_tokens = candidate_tokens;
            } else {
                self.close(&mut chunks, std::mem::take(&mut current), current_tokens);
                current.push(sentence.clone());
                current_tokens = self.tokenizer.count_tokens(&sentence.text, lang).await?;
            }
        }

        if !current.is_empty() {
            self.close(&mut chunks, current, current_tokens);
        }

        info!(
            "Planned {} chunks from {} sentences (budget {} tokens)",
            chunks.len(), sentences.len(), self.budget
        );
        Ok(chunks)
    }

    fn close(&self, chunks: &mut Vec<Chunk>, sentences: Vec<Sentence>, token_count: usize) {
        let oversized = token_count > self.budget;
        let index = chunks.len();
        if oversized {
            warn!(
                "Chunk {} is a single sentence of {} tokens, over the {} token budget; \
                 the model may truncate it",
                index + 1, token_count, self.budget
            );
        } else {
            debug!("Chunk {}: {} sentences, {} tokens", index + 1, sentences.len(), token_count);
        }
        chunks.push(Chunk {
            index,
            sentences,
            token_count,
            oversized,
        });
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
