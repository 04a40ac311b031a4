//! Configuration types for document narration.
//!
//! All behaviour is controlled through [`NarrationConfig`], built once at
//! process start via [`NarrationConfigBuilder`] and passed by reference to
//! whatever needs it. Credentials live in here (or in the pre-built
//! provider/engine handles) rather than in process-wide globals.

use crate::error::Docx2SpeechError;
use crate::pipeline::rewrite::Completer;
use crate::pipeline::speech::SpeechEngine;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used for the rewrite call when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Configuration for a narration run.
///
/// # Example
/// ```rust
/// use docx2speech::{NarrationConfig, SpeechBackend};
///
/// let config = NarrationConfig::builder()
///     .model("gpt-4.1-mini")
///     .language("en")
///     .speech(SpeechBackend::google("co.uk"))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct NarrationConfig {
    /// Completion model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completer. Takes precedence over every provider
    /// setting; used to plug in non-`edgequake-llm` backends and stubs.
    pub completer: Option<Arc<dyn Completer>>,

    /// Sampling temperature. None leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Maximum completion tokens. None leaves the provider default in place.
    pub max_tokens: Option<usize>,

    /// Which speech service to call.
    pub speech: SpeechBackend,

    /// Pre-constructed speech engine. Takes precedence over `speech`.
    pub speech_engine: Option<Arc<dyn SpeechEngine>>,

    /// Narration language (IETF tag understood by the speech service). Default: "en".
    pub language: String,

    /// Directory under which per-request workspaces are created.
    /// Default: `$TMPDIR/docx2speech`.
    pub scratch_root: PathBuf,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Timeout for the completion call. None inherits the client's behaviour.
    pub api_timeout_secs: Option<u64>,

    /// Timeout for each speech request. None inherits the client's behaviour.
    pub speech_timeout_secs: Option<u64>,

    /// Observer for state transitions.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            completer: None,
            temperature: None,
            max_tokens: None,
            speech: SpeechBackend::default(),
            speech_engine: None,
            language: "en".to_string(),
            scratch_root: std::env::temp_dir().join("docx2speech"),
            download_timeout_secs: 120,
            api_timeout_secs: None,
            speech_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NarrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("completer", &self.completer.as_ref().map(|_| "<dyn Completer>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("speech", &self.speech)
            .field(
                "speech_engine",
                &self.speech_engine.as_ref().map(|_| "<dyn SpeechEngine>"),
            )
            .field("language", &self.language)
            .field("scratch_root", &self.scratch_root)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("speech_timeout_secs", &self.speech_timeout_secs)
            .finish()
    }
}

impl NarrationConfig {
    /// Create a new builder for `NarrationConfig`.
    pub fn builder() -> NarrationConfigBuilder {
        NarrationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model name the rewrite call will use.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`NarrationConfig`].
pub struct NarrationConfigBuilder {
    config: NarrationConfig,
}

impl fmt::Debug for NarrationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl NarrationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn completer(mut self, completer: Arc<dyn Completer>) -> Self {
        self.config.completer = Some(completer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn speech(mut self, backend: SpeechBackend) -> Self {
        self.config.speech = backend;
        self
    }

    pub fn speech_engine(mut self, engine: Arc<dyn SpeechEngine>) -> Self {
        self.config.speech_engine = Some(engine);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = dir.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn speech_timeout_secs(mut self, secs: u64) -> Self {
        self.config.speech_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NarrationConfig, Docx2SpeechError> {
        let c = &self.config;
        if c.language.trim().is_empty() {
            return Err(Docx2SpeechError::InvalidConfig(
                "Narration language must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) || c.speech_timeout_secs == Some(0) {
            return Err(Docx2SpeechError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if let SpeechBackend::OpenAi { api_key, .. } = &c.speech {
            if api_key.is_empty() && c.speech_engine.is_none() {
                return Err(Docx2SpeechError::InvalidConfig(
                    "The OpenAI speech backend needs an API key".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Speech service used by the synthesizer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechBackend {
    /// Google Translate's public TTS endpoint (default). `tld` selects the
    /// regional host, e.g. "com", "co.uk", "com.au", which changes the accent.
    GoogleTranslate { tld: String },
    /// Any OpenAI-compatible `/audio/speech` endpoint.
    OpenAi {
        base_url: String,
        model: String,
        voice: String,
        #[serde(skip_serializing, default)]
        api_key: String,
    },
}

impl SpeechBackend {
    pub fn google(tld: impl Into<String>) -> Self {
        SpeechBackend::GoogleTranslate { tld: tld.into() }
    }

    /// OpenAI's hosted speech endpoint with `tts-1` and the `alloy` voice.
    pub fn openai(api_key: impl Into<String>) -> Self {
        SpeechBackend::OpenAi {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            api_key: api_key.into(),
        }
    }
}

impl Default for SpeechBackend {
    fn default() -> Self {
        SpeechBackend::google("com")
    }
}

impl fmt::Debug for SpeechBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechBackend::GoogleTranslate { tld } => f
                .debug_struct("GoogleTranslate")
                .field("tld", tld)
                .finish(),
            SpeechBackend::OpenAi {
                base_url,
                model,
                voice,
                ..
            } => f
                .debug_struct("OpenAi")
                .field("base_url", base_url)
                .field("model", model)
                .field("voice", voice)
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}
