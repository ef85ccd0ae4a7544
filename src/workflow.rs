use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{LingoError, Result};
use crate::language::LanguageTag;
use crate::translate::{TranslationContext, TranslationRequest, TranslationResponse, TranslationService};

const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Outcome counts of a directory run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub translated: usize,
    pub partial: usize,
    pub failed: usize,
}

/// Translates text files on disk through a [`TranslationService`].
pub struct Workflow {
    service: Arc<TranslationService>,
}

impl Workflow {
    pub fn new(service: Arc<TranslationService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Translate one file and write the result next to it or to `output_path`.
    pub async fn translate_file<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Option<PathBuf>,
        source_lang: &LanguageTag,
        target_lang: &LanguageTag,
        ctx: &TranslationContext,
    ) -> Result<TranslationResponse> {
        let input_path = input_path.as_ref();
        if !input_path.exists() {
            return Err(LingoError::FileNotFound(input_path.display().to_string()));
        }

        let text = fs::read_to_string(input_path).await?;
        let request = TranslationRequest {
            text,
            source_lang: source_lang.clone(),
            target_lang: target_lang.clone(),
        };
        let response = self.service.translate(&request, ctx).await?;

        let output_path = match output_path {
            Some(path) => path,
            None => output_path_for(input_path, input_path.parent().unwrap_or(Path::new(".")), target_lang)?,
        };
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&output_path, response.translated_text()).await?;
        info!("Wrote translation to {}", output_path.display());

        Ok(response)
    }

    /// Translate every text file under `input_dir` into each target language.
    ///
    /// A file that fails is logged and counted; the run continues.
    pub async fn translate_directory<P: AsRef<Path>>(
        &self,
        input_dir: P,
        output_dir: Option<PathBuf>,
        source_lang: &LanguageTag,
        target_langs: &[LanguageTag],
    ) -> Result<BatchSummary> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(LingoError::Config("Input path is not a directory".to_string()));
        }

        let output_dir = output_dir.unwrap_or_else(|| input_dir.to_path_buf());
        fs::create_dir_all(&output_dir).await?;

        let mut text_files = Vec::new();
        for entry in WalkDir::new(input_dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !has_text_extension(path) || is_translation_output(path, target_langs) {
                continue;
            }
            text_files.push(path.to_path_buf());
        }

        info!("Found {} text files to translate", text_files.len());

        let mut summary = BatchSummary::default();
        for path in &text_files {
            for target_lang in target_langs {
                let output_path = output_path_for(path, &output_dir.join(relative_dir(path, input_dir)), target_lang)?;
                let ctx = TranslationContext::new();
                match self.translate_file(path, Some(output_path), source_lang, target_lang, &ctx).await {
                    Ok(response) if response.result.had_partial_failure => {
                        warn!("Partially translated {} to {}", path.display(), target_lang);
                        summary.partial += 1;
                    }
                    Ok(_) => {
                        info!("Successfully translated {} to {}", path.display(), target_lang);
                        summary.translated += 1;
                    }
                    Err(e) => {
                        warn!("Failed to translate {}: {}", path.display(), e);
                        summary.failed += 1;
                    }
                }
            }
        }

        Ok(summary)
    }
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// `notes.fra_Latn.txt` is an earlier output, not an input.
fn is_translation_output(path: &Path, target_langs: &[LanguageTag]) -> bool {
    let inner = path.file_stem()
        .map(Path::new)
        .and_then(|stem| stem.extension())
        .and_then(|e| e.to_str());
    inner.is_some_and(|code| target_langs.iter().any(|t| t.as_str() == code))
}

/// Directory of `path` relative to `root`, so nested inputs keep their layout.
fn relative_dir<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .unwrap_or(Path::new(""))
}

fn output_path_for(input_path: &Path, output_dir: &Path, target_lang: &LanguageTag) -> Result<PathBuf> {
    let stem = input_path.file_stem()
        .ok_or_else(|| LingoError::Config("Invalid input filename".to_string()))?
        .to_string_lossy();
    let extension = input_path.extension().map(|e| e.to_string_lossy()).unwrap_or_else(|| "txt".into());
    Ok(output_dir.join(format!("{}.{}.{}", stem, target_lang, extension)))
}
