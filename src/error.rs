//! Error types for the docx2speech library.
//!
//! Every stage of the pipeline fails into a single [`Docx2SpeechError`]. The
//! variants are grouped by the stage that produces them so a front end can
//! tell *where* a run stopped ([`Docx2SpeechError::stage`]) while showing the
//! user nothing more than the `Display` text.
//!
//! No variant is retried anywhere in the pipeline: a failure at a stage
//! boundary ends the run and later stages are never attempted.

use crate::output::PipelineState;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docx2speech library.
#[derive(Debug, Error)]
pub enum Docx2SpeechError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input was read, but it is not a ZIP-based Word document.
    #[error("'{name}' is not a .docx document (first bytes: {magic:?})")]
    NotADocx { name: String, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The container or its WordprocessingML part could not be parsed.
    #[error("Could not read document: {detail}")]
    Parse { detail: String },

    /// Extraction succeeded but produced no text worth narrating.
    #[error("Nothing to convert: the document contains no text")]
    NothingToConvert,

    // ── Rewrite errors ────────────────────────────────────────────────────
    /// The completion provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The completion call failed (auth, network, quota, malformed response).
    #[error("Error communicating with the language model: {message}")]
    Upstream { message: String },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// The speech engine reported an error.
    #[error("Error during text-to-speech conversion: {reason}")]
    Synthesis { reason: String },

    /// The speech engine reported success but no audio file exists.
    #[error("Text-to-speech conversion failed: audio file not created at '{path}'")]
    AudioMissing { path: PathBuf },

    /// Could not create or write the audio file.
    #[error("Failed to write audio file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Scratch storage errors ────────────────────────────────────────────
    /// Per-request scratch storage could not be created or written.
    #[error("Scratch storage error: {detail}")]
    Workspace { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Docx2SpeechError {
    /// The pipeline stage this error belongs to.
    ///
    /// Scratch storage errors belong to extraction, where the upload is
    /// stored. Input and configuration problems are reported as
    /// [`PipelineState::Idle`]: they happen before extraction starts.
    pub fn stage(&self) -> PipelineState {
        match self {
            Docx2SpeechError::Parse { .. }
            | Docx2SpeechError::NothingToConvert
            | Docx2SpeechError::Workspace { .. } => PipelineState::Extracting,
            Docx2SpeechError::ProviderNotConfigured { .. } | Docx2SpeechError::Upstream { .. } => {
                PipelineState::Rewriting
            }
            Docx2SpeechError::Synthesis { .. }
            | Docx2SpeechError::AudioMissing { .. }
            | Docx2SpeechError::OutputWriteFailed { .. } => PipelineState::Synthesizing,
            _ => PipelineState::Idle,
        }
    }

    pub(crate) fn parse(detail: impl Into<String>) -> Self {
        Docx2SpeechError::Parse {
            detail: detail.into(),
        }
    }

    pub(crate) fn workspace(detail: impl std::fmt::Display) -> Self {
        Docx2SpeechError::Workspace {
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_display_carries_cause() {
        let e = Docx2SpeechError::Upstream {
            message: "401 invalid api key".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("401 invalid api key"), "got: {msg}");
    }

    #[test]
    fn audio_missing_display_names_path() {
        let e = Docx2SpeechError::AudioMissing {
            path: PathBuf::from("/tmp/x/output/final.mp3"),
        };
        assert!(e.to_string().contains("final.mp3"));
    }

    #[test]
    fn not_a_docx_display() {
        let e = Docx2SpeechError::NotADocx {
            name: "notes.txt".into(),
            magic: *b"Hell",
        };
        assert!(e.to_string().contains("notes.txt"));
    }

    #[test]
    fn stages_are_attributed() {
        assert_eq!(
            Docx2SpeechError::parse("bad zip").stage(),
            PipelineState::Extracting
        );
        assert_eq!(
            Docx2SpeechError::NothingToConvert.stage(),
            PipelineState::Extracting
        );
        assert_eq!(
            Docx2SpeechError::Upstream {
                message: "x".into()
            }
            .stage(),
            PipelineState::Rewriting
        );
        assert_eq!(
            Docx2SpeechError::Synthesis {
                reason: "x".into()
            }
            .stage(),
            PipelineState::Synthesizing
        );
        assert_eq!(
            Docx2SpeechError::workspace("disk full").stage(),
            PipelineState::Extracting
        );
        assert_eq!(
            Docx2SpeechError::InvalidConfig("x".into()).stage(),
            PipelineState::Idle
        );
    }
}
