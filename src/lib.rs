//! # docx2speech
//!
//! Turn a Word document into narrated audio.
//!
//! Plain text-to-speech reads `$x^2$` as "dollar x caret two dollar" and
//! skips over tables and figures. This crate puts a language model between
//! extraction and speech: it rewrites formulas as spoken maths, tables as a
//! description of the relationship they encode, and images as a neutral
//! "there is an image here", while leaving ordinary prose untouched.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. Extract     body paragraphs from word/document.xml, joined by \n
//!  ├─ 2. Rewrite     one completion call (gpt-3.5-turbo by default)
//!  ├─ 3. Synthesize  Google Translate TTS or an OpenAI-compatible endpoint
//!  └─ 4. Output      final.mp3 in a per-run workspace
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docx2speech::{convert_to_file, NarrationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Completion provider auto-detected from OPENAI_API_KEY etc.
//!     let config = NarrationConfig::default();
//!     let output = convert_to_file("lecture.docx", "lecture.mp3", &config).await?;
//!     println!("{}", output.narration_text);
//!     eprintln!("{} bytes of audio", output.stats.audio_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | via cli | Upload form and download endpoint (axum) |
//! | `cli`    | on      | Enables the `docx2speech` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable default features when using only the library:
//! ```toml
//! docx2speech = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NarrationConfig, NarrationConfigBuilder, SpeechBackend, DEFAULT_MODEL};
pub use convert::{
    convert_sync, convert_to_file, extract_document, narrate, resolve_completer, rewrite_document,
};
pub use error::Docx2SpeechError;
pub use output::{
    AudioArtifact, NarrationOutput, NarrationStats, PipelineState, AUDIO_CONTENT_TYPE,
    AUDIO_FILE_NAME,
};
pub use pipeline::input::SourceDocument;
pub use pipeline::rewrite::{Completer, Completion, CompletionRequest, LlmCompleter};
pub use pipeline::speech::{GoogleTranslateTts, OpenAiSpeech, SpeechEngine};
pub use progress::{NarrationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use workspace::Workspace;
