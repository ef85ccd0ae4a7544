use std::sync::Arc;

use lingochunk::config::Config;
use lingochunk::error::LingoError;
use lingochunk::model::mock::EchoModel;
use lingochunk::translate::{TranslationContext, TranslationRequest, TranslationService};

fn service_with_budget(model: EchoModel, input_token_budget: usize, safety_margin: usize) -> TranslationService {
    let mut config = Config::default();
    config.budget.input_token_budget = input_token_budget;
    config.budget.safety_margin = safety_margin;
    TranslationService::new(&config, Arc::new(model)).unwrap()
}

#[tokio::test]
async fn failed_middle_chunk_is_marked_in_place() {
    let model = EchoModel::new().fail_on("Bravo");
    let service = service_with_budget(model.clone(), 3, 1);
    let request = TranslationRequest::new("Alpha one. Bravo two. Charlie three.", "eng_Latn", "fra_Latn");

    let response = service.translate(&request, &TranslationContext::new()).await.unwrap();
    let result = &response.result;

    assert_eq!(result.chunk_count, 3);
    assert!(result.had_partial_failure);
    assert_eq!(result.failed_chunks, vec![1]);
    assert!(response.translated_text().starts_with("Alpha one. [Translation error in chunk 2"));
    assert!(response.translated_text().ends_with("] Charlie three."));

    let sent: Vec<String> = model.calls().into_iter().map(|c| c.text).collect();
    assert_eq!(sent, vec!["Alpha one.", "Bravo two.", "Charlie three."]);
}

#[tokio::test]
async fn khmer_text_is_chunked_on_khan() {
    let service = service_with_budget(EchoModel::new(), 14, 1);
    let text = "សួស្តី។ អរគុណ។ លាហើយ។";
    let request = TranslationRequest::new(text, "khm_Khmr", "eng_Latn");

    let chunks = service.plan(&request).await.unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].token_count, 13);
    assert!(chunks.iter().all(|c| !c.oversized));

    let response = service.translate(&request, &TranslationContext::new()).await.unwrap();
    assert!(!response.result.had_partial_failure);
    assert_eq!(response.translated_text(), text);
}

#[tokio::test]
async fn every_chunk_failing_is_an_error() {
    let service = service_with_budget(EchoModel::new().fail_on("."), 3, 1);
    let request = TranslationRequest::new("Alpha one. Bravo two.", "eng_Latn", "fra_Latn");

    let err = service.translate(&request, &TranslationContext::new()).await.unwrap_err();
    assert!(matches!(err, LingoError::AllChunksFailed { chunks: 2, .. }));
}

#[tokio::test]
async fn paragraphs_survive_chunk_boundaries() {
    let service = service_with_budget(EchoModel::new().with_transform(|s| s.to_uppercase()), 4, 1);
    let request = TranslationRequest::new("First paragraph here.\n\nSecond one now.", "eng_Latn", "fra_Latn");

    let response = service.translate(&request, &TranslationContext::new()).await.unwrap();
    assert_eq!(response.translated_text(), "FIRST PARAGRAPH HERE.\n\nSECOND ONE NOW.");
}

#[tokio::test]
async fn leading_newline_before_failed_oversized_sentence_is_an_error() {
    let service = service_with_budget(EchoModel::new().truncate_on("word", usize::MAX), 5, 1);
    let request = TranslationRequest::new("\nword word word word word word", "eng_Latn", "fra_Latn");

    let chunks = service.plan(&request).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].oversized);

    let err = service.translate(&request, &TranslationContext::new()).await.unwrap_err();
    assert!(matches!(err, LingoError::AllChunksFailed { chunks: 1, .. }));
}
