//! lingochunk - Long-text translation over a token-limited model
//!
//! Command-line entry point: splits text into budget-sized chunks, translates
//! them through the configured model backend and reassembles the result.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use lingochunk::bootstrap::{Bootstrap, BootstrapState};
use lingochunk::cli::{Args, Commands};
use lingochunk::config::{BackendKind, Config};
use lingochunk::error::LingoError;
use lingochunk::language::LanguageTag;
use lingochunk::translate::{ChunkProgress, TranslationContext, TranslationRequest, TranslationService};
use lingochunk::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("lingochunk.toml").exists() {
                info!("Found lingochunk.toml in current directory, loading...");
                Config::from_file("lingochunk.toml")?
            } else {
                Config::default()
            }
        }
    };
    if args.echo {
        config.model.backend = BackendKind::Echo;
    }

    let service = Arc::new(TranslationService::from_config(&config)?);

    match args.command {
        Commands::Translate { text, input, output, source, target, json, wait } => {
            if wait && wait_for_model(service.clone(), &config).await != BootstrapState::Ready {
                return Err(LingoError::ModelNotReady("model did not become ready".to_string()).into());
            }

            let text = match (text, input) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path).await?,
                (None, None) => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let request = TranslationRequest::new(text, source, target);

            let progress = chunk_progress_bar();
            let observer = progress.clone();
            let ctx = TranslationContext::new().with_progress(Arc::new(move |p: &ChunkProgress| {
                observer.set_length(p.total as u64);
                observer.set_message(if p.succeeded { "ok" } else { "failed" });
                observer.inc(1);
            }));

            // Ctrl-C stops scheduling further chunks
            let cancel = ctx.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });

            let response = service.translate(&request, &ctx).await;
            progress.finish_and_clear();
            let response = response?;

            if !response.result.oversized_chunks.is_empty() {
                eprintln!(
                    "Warning: {} chunk(s) held a single sentence longer than the input budget and may be truncated by the model",
                    response.result.oversized_chunks.len()
                );
            }
            if response.result.had_partial_failure {
                eprintln!(
                    "Warning: {} of {} chunk(s) failed and are marked in the output",
                    response.result.failed_chunks.len(),
                    response.result.chunk_count
                );
            }

            let rendered = if json {
                serde_json::to_string_pretty(&response)?
            } else {
                response.translated_text().to_string()
            };
            match output {
                Some(path) => {
                    tokio::fs::write(&path, rendered).await?;
                    info!("Wrote translation to {}", path.display());
                }
                None => println!("{}", rendered),
            }
        }
        Commands::Batch { input_dir, output_dir, source, target_langs } => {
            let target_languages = target_langs
                .split(',')
                .map(|s| LanguageTag::new(s.trim()))
                .collect::<Vec<_>>();

            let workflow = Workflow::new(service);
            let summary = workflow
                .translate_directory(&input_dir, output_dir, &LanguageTag::new(source), &target_languages)
                .await?;
            println!(
                "Translated {} file(s), {} partially, {} failed",
                summary.translated, summary.partial, summary.failed
            );
        }
        Commands::Plan { input, source } => {
            let text = tokio::fs::read_to_string(&input).await?;
            let request = TranslationRequest::new(text, source.clone(), source);
            let chunks = service.plan(&request).await?;

            println!("{:<8} {:<10} {:<10} {:<10} {:<10}", "Chunk", "Sentences", "Tokens", "Chars", "Oversized");
            println!("{}", "-".repeat(52));
            for chunk in &chunks {
                println!(
                    "{:<8} {:<10} {:<10} {:<10} {:<10}",
                    chunk.index + 1,
                    chunk.sentences.len(),
                    chunk.token_count,
                    chunk.text().chars().count(),
                    if chunk.oversized { "yes" } else { "" }
                );
            }
            println!("Budget: {} tokens per chunk", config.budget.effective_input_budget());
        }
        Commands::Languages => {
            let languages = service.list_languages().await?;
            println!("{:<12} {:<30}", "Code", "Name");
            println!("{}", "-".repeat(42));
            for language in languages {
                println!("{:<12} {:<30}", language.code, language.name);
            }
        }
        Commands::Health => {
            let health = service.health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Wait => {
            let state = wait_for_model(service, &config).await;
            println!("Bootstrap finished in state {:?}", state);
            if state != BootstrapState::Ready {
                anyhow::bail!("model is not available");
            }
        }
        Commands::InitConfig { path } => {
            config.save_to_file(&path)?;
            println!("Wrote configuration to {}", path.display());
        }
    }

    Ok(())
}

/// Poll the service until the model is ready, printing progress.
async fn wait_for_model(service: Arc<TranslationService>, config: &Config) -> BootstrapState {
    let bootstrap = Arc::new(Bootstrap::new(service, &config.bootstrap));
    let mut status = bootstrap.subscribe();
    let handle = bootstrap.clone().spawn();

    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        eprintln!("{}", current.progress_message());
        if matches!(current.state, BootstrapState::Ready | BootstrapState::Degraded) {
            break;
        }
    }

    handle.await.unwrap_or(BootstrapState::Degraded)
}

/// Length is set from the first chunk report, once the plan is known.
fn chunk_progress_bar() -> ProgressBar {
    let progress = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] chunk {pos}/{len} {msg}")
    {
        progress.set_style(style.progress_chars("#>-"));
    }
    progress
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".lingochunk").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "lingochunk.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so translations on stdout stay clean
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("lingochunk.log").display());

    Ok(())
}
