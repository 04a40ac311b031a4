//! Narration entry points.
//!
//! [`narrate`] is the core: it drives one [`SourceDocument`] through
//! extract → rewrite → synthesize inside a caller-owned [`Workspace`],
//! reporting every [`PipelineState`] transition. The other functions wrap it
//! for path/URL inputs and for the partial runs used by the CLI.
//!
//! A failure at any stage moves the run to [`PipelineState::Failed`] and
//! returns the error; later stages are never started.

use crate::config::NarrationConfig;
use crate::error::Docx2SpeechError;
use crate::output::{NarrationOutput, NarrationStats, PipelineState};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::rewrite::{self, Completer, LlmCompleter, Rewrite};
use crate::pipeline::{extract, speech, synthesize};
use crate::progress::ProgressCallback;
use crate::workspace::Workspace;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Narrate `doc` and write `final.mp3` into `workspace`'s output directory.
///
/// # Errors
/// - [`Docx2SpeechError::Parse`] / [`Docx2SpeechError::NothingToConvert`]
///   from extraction; no completion call is made.
/// - [`Docx2SpeechError::ProviderNotConfigured`] / [`Docx2SpeechError::Upstream`]
///   from the rewrite; no speech call is made.
/// - [`Docx2SpeechError::Synthesis`], [`Docx2SpeechError::AudioMissing`] or
///   [`Docx2SpeechError::OutputWriteFailed`] from synthesis.
pub async fn narrate(
    doc: &SourceDocument,
    workspace: &Workspace,
    config: &NarrationConfig,
) -> Result<NarrationOutput, Docx2SpeechError> {
    let total_start = Instant::now();
    let mut run = Run::new(config.progress_callback.as_ref());
    info!("Narrating '{}' ({} bytes)", doc.file_name, doc.bytes.len());

    // ── Step 1: Extract ──────────────────────────────────────────────────
    run.advance();
    let stage_start = Instant::now();
    if let Err(e) = workspace.store_upload(doc).await {
        return Err(run.fail(e));
    }
    let paragraphs = extract_stage(doc).map_err(|e| run.fail(e))?;
    let extracted_text = paragraphs.join("\n");
    let extract_ms = run.complete(stage_start);

    // ── Step 2: Rewrite ──────────────────────────────────────────────────
    run.advance();
    let stage_start = Instant::now();
    let rewrite = match rewrite_stage(&extracted_text, config).await {
        Ok(r) => r,
        Err(e) => return Err(run.fail(e)),
    };
    let rewrite_ms = run.complete(stage_start);

    // ── Step 3: Synthesize ───────────────────────────────────────────────
    run.advance();
    let stage_start = Instant::now();
    let engine = speech::engine_for(config).map_err(|e| run.fail(e))?;
    let audio = match synthesize::synthesize_to_file(
        engine.as_ref(),
        &rewrite.text,
        &workspace.audio_path(),
        config,
    )
    .await
    {
        Ok(a) => a,
        Err(e) => return Err(run.fail(e)),
    };
    let synthesize_ms = run.complete(stage_start);

    run.advance();

    let stats = NarrationStats {
        paragraph_count: paragraphs.len(),
        extracted_chars: extracted_text.chars().count(),
        narration_chars: rewrite.text.chars().count(),
        input_tokens: rewrite.prompt_tokens,
        output_tokens: rewrite.completion_tokens,
        audio_bytes: audio.size_bytes,
        extract_ms,
        rewrite_ms,
        synthesize_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Narration complete: {} paragraphs, {} audio bytes, {}ms total",
        stats.paragraph_count, stats.audio_bytes, stats.total_ms
    );

    Ok(NarrationOutput {
        extracted_text,
        narration_text: rewrite.text,
        audio,
        stats,
    })
}

/// Narrate a local `.docx` or HTTP(S) URL and write the MP3 to `output_path`.
///
/// The run uses a private workspace under `config.scratch_root`, which is
/// removed on return. The returned artifact points at `output_path`.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &NarrationConfig,
) -> Result<NarrationOutput, Docx2SpeechError> {
    let doc = input::load_document(input_str.as_ref(), config.download_timeout_secs).await?;
    let workspace = Workspace::create(&config.scratch_root).await?;
    let mut output = narrate(&doc, &workspace, config).await?;

    let path = output_path.as_ref();
    let write_err = |source: std::io::Error| Docx2SpeechError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    // Atomic write: copy to temp, then rename
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("mp3.tmp");
    tokio::fs::copy(&output.audio.path, &tmp_path)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    output.audio.path = path.to_path_buf();
    Ok(output)
}

/// Synchronous wrapper around [`convert_to_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &NarrationConfig,
) -> Result<NarrationOutput, Docx2SpeechError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Docx2SpeechError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_to_file(input_str, output_path, config))
}

/// Extract the text of a document without rewriting or speaking it.
///
/// Does not require an LLM provider or API key.
pub async fn extract_document(
    input_str: impl AsRef<str>,
    config: &NarrationConfig,
) -> Result<String, Docx2SpeechError> {
    let doc = input::load_document(input_str.as_ref(), config.download_timeout_secs).await?;
    Ok(extract_stage(&doc)?.join("\n"))
}

/// Extract and rewrite a document, skipping synthesis.
pub async fn rewrite_document(
    input_str: impl AsRef<str>,
    config: &NarrationConfig,
) -> Result<String, Docx2SpeechError> {
    let doc = input::load_document(input_str.as_ref(), config.download_timeout_secs).await?;
    let text = extract_stage(&doc)?.join("\n");
    Ok(rewrite_stage(&text, config).await?.text)
}

// ── Stages ───────────────────────────────────────────────────────────────

/// Paragraphs of `doc`, or `NothingToConvert` when they hold no text.
fn extract_stage(doc: &SourceDocument) -> Result<Vec<String>, Docx2SpeechError> {
    let paragraphs = extract::extract_paragraphs(&doc.bytes)?;
    if paragraphs.iter().all(|p| p.trim().is_empty()) {
        return Err(Docx2SpeechError::NothingToConvert);
    }
    debug!("Extracted {} paragraphs from '{}'", paragraphs.len(), doc.file_name);
    Ok(paragraphs)
}

async fn rewrite_stage(text: &str, config: &NarrationConfig) -> Result<Rewrite, Docx2SpeechError> {
    let completer = resolve_completer(config)?;
    rewrite::rewrite_notation(completer.as_ref(), text, config).await
}

/// Tracks the current [`PipelineState`] of one run and reports transitions.
struct Run<'a> {
    state: PipelineState,
    callback: Option<&'a ProgressCallback>,
}

impl<'a> Run<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            state: PipelineState::Idle,
            callback,
        }
    }

    /// Move to the next stage of a successful run.
    fn advance(&mut self) {
        if let Some(to) = self.state.next() {
            self.enter(to);
        }
    }

    fn enter(&mut self, to: PipelineState) {
        let from = self.state;
        self.state = to;
        debug!("State: {} → {}", from, to);
        if let Some(cb) = self.callback {
            cb.on_state_change(from, to);
        }
    }

    /// Report the current stage as finished; returns its duration.
    fn complete(&self, started: Instant) -> u64 {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Some(cb) = self.callback {
            cb.on_stage_complete(self.state, elapsed_ms);
        }
        elapsed_ms
    }

    fn fail(&mut self, err: Docx2SpeechError) -> Docx2SpeechError {
        warn!("{} failed: {}", self.state, err);
        if let Some(cb) = self.callback {
            cb.on_stage_error(self.state, &err.to_string());
        }
        self.enter(PipelineState::Failed);
        err
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the completion backend, from most-specific to least-specific.
///
/// 1. **Pre-built completer** (`config.completer`), used as-is.
/// 2. **Pre-built provider** (`config.provider`), wrapped in [`LlmCompleter`].
/// 3. **Named provider + model** (`config.provider_name`), created through
///    [`ProviderFactory::create_llm_provider`], which reads the provider's
///    API key from the environment.
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **OpenAI** when `OPENAI_API_KEY` is set, with the configured model or
///    [`crate::DEFAULT_MODEL`].
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_completer(config: &NarrationConfig) -> Result<Arc<dyn Completer>, Docx2SpeechError> {
    if let Some(ref completer) = config.completer {
        return Ok(Arc::clone(completer));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmCompleter::new(provider)))
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Docx2SpeechError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Docx2SpeechError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn resolve_provider(config: &NarrationConfig) -> Result<Arc<dyn LLMProvider>, Docx2SpeechError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Docx2SpeechError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY (or put it in .env), or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
