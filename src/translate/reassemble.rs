use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LingoError, Result};
use crate::language::LanguageTag;
use super::translator::{ChunkResult, ChunkStatus};

/// Final output of a translation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub had_partial_failure: bool,
    pub chunk_count: usize,
    /// Zero-based indices of chunks replaced by a placeholder
    pub failed_chunks: Vec<usize>,
    /// Zero-based indices of chunks sent over the input budget
    pub oversized_chunks: Vec<usize>,
}

/// Placeholder standing in for a chunk that could not be translated.
pub fn failure_placeholder(index: usize, reason: &str) -> String {
    format!("[Translation error in chunk {}: {}]", index + 1, reason)
}

/// Separator between the pieces of chunk `previous` and the next chunk.
///
/// Paragraph and line breaks that ended the previous chunk's source text are
/// kept; otherwise the target script's word joiner is used.
fn joiner_after(previous_source: &str, target_lang: &LanguageTag) -> &'static str {
    let trailing = &previous_source[previous_source.trim_end().len()..];
    let newlines = trailing.matches('\n').count();
    if newlines >= 2 {
        "\n\n"
    } else if newlines == 1 {
        "\n"
    } else {
        target_lang.script().joiner()
    }
}

/// Combine chunk results, in chunk order, into one result.
///
/// Failed chunks are kept in place as a visible placeholder. If no chunk
/// produced any text the whole request fails instead.
pub fn reassemble(results: Vec<ChunkResult>, target_lang: &LanguageTag) -> Result<TranslationResult> {
    if results.is_empty() {
        return Err(LingoError::NoChunks);
    }

    let translated_any = results.iter()
        .any(|r| matches!(&r.status, ChunkStatus::Success(text) if !text.trim().is_empty()));
    if !translated_any {
        let first_reason = results.iter()
            .find_map(|r| match &r.status {
                ChunkStatus::Failure(f) => Some(f.to_string()),
                ChunkStatus::Success(_) => None,
            })
            .unwrap_or_default();
        return Err(LingoError::AllChunksFailed {
            chunks: results.len(),
            first_reason,
        });
    }

    let chunk_count = results.len();
    let mut translated_text = String::new();
    let mut failed_chunks = Vec::new();
    let mut oversized_chunks = Vec::new();
    let mut previous_source: Option<String> = None;

    for result in results {
        if result.chunk.oversized {
            oversized_chunks.push(result.chunk.index);
        }
        let source = result.chunk.text();

        let piece = match result.status {
            ChunkStatus::Success(text) => text,
            ChunkStatus::Failure(failure) => {
                warn!("Chunk {} failed: {}", result.chunk.index + 1, failure);
                failed_chunks.push(result.chunk.index);
                failure_placeholder(result.chunk.index, &failure.to_string())
            }
        };

        if piece.is_empty() {
            previous_source = Some(source);
            continue;
        }
        if let Some(prev) = previous_source.as_deref() {
            if !translated_text.is_empty() {
                translated_text.push_str(joiner_after(prev, target_lang));
            }
        }
        translated_text.push_str(&piece);
        previous_source = Some(source);
    }

    let had_partial_failure = !failed_chunks.is_empty();
    info!(
        "Reassembled {} chunks ({} failed) into {} chars",
        chunk_count, failed_chunks.len(), translated_text.chars().count()
    );

    Ok(TranslationResult {
        translated_text,
        had_partial_failure,
        chunk_count,
        failed_chunks,
        oversized_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{Chunk, Sentence};
    use crate::error::ModelError;
    use crate::translate::translator::ChunkFailure;

    fn chunk(index: usize, source: &str) -> Chunk {
        Chunk {
            index,
            sentences: vec![Sentence { text: source.to_string(), start: 0, end: source.len() }],
            token_count: 1,
            oversized: false,
        }
    }

    fn ok(index: usize, source: &str, text: &str) -> ChunkResult {
        ChunkResult { chunk: chunk(index, source), status: ChunkStatus::Success(text.to_string()) }
    }

    fn failed(index: usize, source: &str, failure: ChunkFailure) -> ChunkResult {
        ChunkResult { chunk: chunk(index, source), status: ChunkStatus::Failure(failure) }
    }

    #[test]
    fn test_joins_with_space() {
        let results = vec![ok(0, "s1 s2. ", "T12"), ok(1, "s3.", "T3")];
        let result = reassemble(results, &"eng_Latn".into()).unwrap();
        assert_eq!(result.translated_text, "T12 T3");
        assert!(!result.had_partial_failure);
        assert_eq!(result.chunk_count, 2);
    }

    #[test]
    fn test_middle_failure_is_visible() {
        let results = vec![
            ok(0, "a. ", "A"),
            failed(1, "b. ", ChunkFailure::Model(ModelError::Failed("boom".into()))),
            ok(2, "c.", "C"),
        ];
        let result = reassemble(results, &"eng_Latn".into()).unwrap();
        assert_eq!(
            result.translated_text,
            "A [Translation error in chunk 2: model error: boom] C"
        );
        assert!(result.had_partial_failure);
        assert_eq!(result.failed_chunks, vec![1]);
    }

    #[test]
    fn test_paragraph_breaks_preserved() {
        let results = vec![ok(0, "First.\n\n", "Premier."), ok(1, "Second.\n", "Deuxième."), ok(2, "Third.", "Troisième.")];
        let result = reassemble(results, &"fra_Latn".into()).unwrap();
        assert_eq!(result.translated_text, "Premier.\n\nDeuxième.\nTroisième.");
    }

    #[test]
    fn test_cjk_target_has_no_joiner() {
        let results = vec![ok(0, "One. ", "一。"), ok(1, "Two.", "二。")];
        let result = reassemble(results, &"zho_Hans".into()).unwrap();
        assert_eq!(result.translated_text, "一。二。");
    }

    #[test]
    fn test_empty_piece_adds_no_separator() {
        let results = vec![ok(0, "\n", ""), ok(1, "a. ", "A"), ok(2, "b.", "B")];
        let result = reassemble(results, &"eng_Latn".into()).unwrap();
        assert_eq!(result.translated_text, "A B");
    }

    #[test]
    fn test_all_failed_is_aggregate_error() {
        let results = vec![
            failed(0, "a. ", ChunkFailure::OutputTruncated),
            failed(1, "b.", ChunkFailure::Cancelled),
        ];
        match reassemble(results, &"eng_Latn".into()) {
            Err(LingoError::AllChunksFailed { chunks, first_reason }) => {
                assert_eq!(chunks, 2);
                assert_eq!(first_reason, "output truncated");
            }
            other => panic!("expected aggregate failure, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_success_does_not_count_as_translated() {
        let results = vec![ok(0, "\n", ""), failed(1, "word word.", ChunkFailure::OutputTruncated)];
        assert!(matches!(
            reassemble(results, &"eng_Latn".into()),
            Err(LingoError::AllChunksFailed { chunks: 2, .. })
        ));
    }

    #[test]
    fn test_no_chunks() {
        assert!(matches!(reassemble(Vec::new(), &"eng_Latn".into()), Err(LingoError::NoChunks)));
    }

    #[test]
    fn test_oversized_chunks_reported() {
        let mut big = ok(0, "huge.", "HUGE");
        big.chunk.oversized = true;
        let result = reassemble(vec![big], &"eng_Latn".into()).unwrap();
        assert_eq!(result.oversized_chunks, vec![0]);
        assert!(!result.had_partial_failure);
    }
}
