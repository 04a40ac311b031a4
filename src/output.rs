//! Result types produced by a narration run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Fixed file name of the narrated audio artifact.
pub const AUDIO_FILE_NAME: &str = "final.mp3";

/// Content type served with the audio artifact.
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Where a narration run currently is.
///
/// ```text
/// Idle → Extracting → Rewriting → Synthesizing → Done
///            │             │             │
///            └─────────────┴─────────────┴──────▶ Failed
/// ```
///
/// `Done` and `Failed` are terminal for a run; the next upload starts a new
/// run from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Extracting,
    Rewriting,
    Synthesizing,
    Done,
    Failed,
}

impl PipelineState {
    /// `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// The state that follows `self` on success, if any.
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Idle => Some(PipelineState::Extracting),
            PipelineState::Extracting => Some(PipelineState::Rewriting),
            PipelineState::Rewriting => Some(PipelineState::Synthesizing),
            PipelineState::Synthesizing => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Idle => "idle",
            PipelineState::Extracting => "extracting text",
            PipelineState::Rewriting => "rewriting notation",
            PipelineState::Synthesizing => "synthesizing speech",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// The audio file written by the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioArtifact {
    /// Absolute or workspace-relative location of the MP3.
    pub path: PathBuf,
    /// Name offered to the user on download (always [`AUDIO_FILE_NAME`]).
    pub file_name: String,
    /// Size on disk; never zero for a returned artifact.
    pub size_bytes: u64,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationOutput {
    /// Paragraph text as extracted, joined with `\n`.
    pub extracted_text: String,
    /// Text returned by the rewriter; this is what gets displayed.
    pub narration_text: String,
    pub audio: AudioArtifact,
    pub stats: NarrationStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationStats {
    pub paragraph_count: usize,
    pub extracted_chars: usize,
    pub narration_chars: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub audio_bytes: u64,
    pub extract_ms: u64,
    pub rewrite_ms: u64,
    pub synthesize_ms: u64,
    pub total_ms: u64,
}
