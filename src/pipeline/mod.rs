//! Pipeline stages for document narration.
//!
//! Each submodule implements one step; the orchestration (state machine,
//! progress events, timings) lives in [`crate::convert`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ rewrite ──▶ synthesize ──▶ final.mp3
//! (path/URL)  (zip+xml)   (LLM)      (speech engine)
//! ```
//!
//! 1. [`input`]: load a path or URL into a [`input::SourceDocument`]
//! 2. [`extract`]: read body paragraphs out of `word/document.xml`
//! 3. [`rewrite`]: one completion call turning notation into prose
//! 4. [`synthesize`]: clean the prose with [`narration`], speak it through a
//!    [`speech::SpeechEngine`] and persist the MP3

pub mod extract;
pub mod input;
pub mod narration;
pub mod rewrite;
pub mod speech;
pub mod synthesize;
