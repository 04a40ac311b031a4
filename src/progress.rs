//! Progress-callback trait for pipeline state transitions.
//!
//! Inject an [`Arc<dyn NarrationProgressCallback>`] via
//! [`crate::config::NarrationConfigBuilder::progress_callback`] to observe a
//! run as it moves through [`PipelineState`]. The CLI drives a spinner from
//! it; tests use it to assert which stages were (and were not) entered.
//!
//! # Example
//!
//! ```rust
//! use docx2speech::{NarrationConfig, NarrationProgressCallback, PipelineState};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl NarrationProgressCallback for Printer {
//!     fn on_state_change(&self, _from: PipelineState, to: PipelineState) {
//!         eprintln!("now {to}");
//!     }
//! }
//!
//! let config = NarrationConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::PipelineState;
use std::sync::Arc;

/// Called by the pipeline on every state transition.
///
/// All methods default to no-ops so implementors override only what they
/// need. The web front end runs requests on several tasks at once, so
/// implementations must be `Send + Sync`.
pub trait NarrationProgressCallback: Send + Sync {
    /// A run moved from `from` to `to`.
    fn on_state_change(&self, from: PipelineState, to: PipelineState) {
        let _ = (from, to);
    }

    /// `stage` finished successfully after `elapsed_ms`.
    fn on_stage_complete(&self, stage: PipelineState, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// `stage` failed; `error` is the user-facing message. Always followed
    /// by a transition to [`PipelineState::Failed`].
    fn on_stage_error(&self, stage: PipelineState, error: &str) {
        let _ = (stage, error);
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl NarrationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::NarrationConfig`].
pub type ProgressCallback = Arc<dyn NarrationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        transitions: Mutex<Vec<(PipelineState, PipelineState)>>,
        errors: Mutex<Vec<String>>,
    }

    impl NarrationProgressCallback for Recorder {
        fn on_state_change(&self, from: PipelineState, to: PipelineState) {
            self.transitions.lock().unwrap().push((from, to));
        }

        fn on_stage_error(&self, _stage: PipelineState, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_state_change(PipelineState::Idle, PipelineState::Extracting);
        cb.on_stage_complete(PipelineState::Extracting, 3);
        cb.on_stage_error(PipelineState::Rewriting, "boom");
    }

    #[test]
    fn recorder_receives_events_through_arc_dyn() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();
        cb.on_state_change(PipelineState::Idle, PipelineState::Extracting);
        cb.on_stage_error(PipelineState::Extracting, "bad zip");
        cb.on_state_change(PipelineState::Extracting, PipelineState::Failed);

        assert_eq!(rec.transitions.lock().unwrap().len(), 2);
        assert_eq!(rec.errors.lock().unwrap().as_slice(), ["bad zip"]);
    }
}
