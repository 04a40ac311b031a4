//! Speech engines: text in, MP3 bytes out.
//!
//! [`SpeechEngine`] is the seam between the synthesizer and whatever service
//! produces audio. Two engines ship with the crate:
//!
//! - [`GoogleTranslateTts`] calls the public Google Translate TTS endpoint.
//!   It needs no credentials but accepts at most 100 characters per request,
//!   so the text is chunked and the MP3 frames of every chunk are
//!   concatenated in order.
//! - [`OpenAiSpeech`] calls an OpenAI-compatible `/audio/speech` endpoint in
//!   a single request.

use crate::config::{NarrationConfig, SpeechBackend};
use crate::error::Docx2SpeechError;
use crate::pipeline::narration::chunk_text;
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Longest text Google Translate TTS accepts in one request.
pub const GOOGLE_MAX_CHARS: usize = 100;

/// Text-to-speech capability.
///
/// Implementations return the complete MP3 stream for `text`. Errors are
/// returned as a message; the synthesizer wraps them into
/// [`Docx2SpeechError::Synthesis`].
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, String>;
}

/// Build the engine selected by `config`.
///
/// A pre-constructed `speech_engine` wins over the `speech` backend setting.
pub fn engine_for(config: &NarrationConfig) -> Result<Arc<dyn SpeechEngine>, Docx2SpeechError> {
    if let Some(engine) = &config.speech_engine {
        return Ok(Arc::clone(engine));
    }
    let client = http_client(config.speech_timeout_secs)?;
    let engine: Arc<dyn SpeechEngine> = match &config.speech {
        SpeechBackend::GoogleTranslate { tld } => {
            Arc::new(GoogleTranslateTts::with_client(client, tld))
        }
        SpeechBackend::OpenAi {
            base_url,
            model,
            voice,
            api_key,
        } => Arc::new(OpenAiSpeech::with_client(
            client,
            base_url.as_str(),
            model.as_str(),
            voice.as_str(),
            api_key.as_str(),
        )),
    };
    Ok(engine)
}

fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, Docx2SpeechError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| Docx2SpeechError::Internal(format!("cannot build HTTP client: {e}")))
}

// ── Google Translate ─────────────────────────────────────────────────────────

/// Google Translate's unofficial TTS endpoint.
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateTts {
    /// Engine for `translate.google.<tld>`.
    pub fn new(tld: &str) -> Self {
        Self::with_client(reqwest::Client::new(), tld)
    }

    pub fn with_client(client: reqwest::Client, tld: &str) -> Self {
        Self {
            client,
            base_url: format!("https://translate.google.{tld}"),
        }
    }

    /// Point the engine at another host, such as a mirror.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chunk_request(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> reqwest::RequestBuilder {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();
        self.client
            .get(format!("{}/translate_tts", self.base_url))
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", lang),
                ("client", "tw-ob"),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
    }
}

#[async_trait]
impl SpeechEngine for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, String> {
        let chunks = chunk_text(text, GOOGLE_MAX_CHARS);
        if chunks.is_empty() {
            return Err("no speakable text".to_string());
        }
        let total = chunks.len();
        info!("Requesting {} speech chunk(s) from {}", total, self.base_url);

        // One request at a time, in chunk order.
        let parts: Vec<Vec<u8>> = stream::iter(chunks.iter().enumerate())
            .then(|(idx, chunk)| async move {
                let response = self
                    .chunk_request(chunk, lang, idx, total)
                    .send()
                    .await
                    .map_err(|e| format!("chunk {}/{total}: {e}", idx + 1))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(format!("chunk {}/{total}: HTTP {status}", idx + 1));
                }
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| format!("chunk {}/{total}: {e}", idx + 1))?;
                debug!("Chunk {}/{}: {} bytes", idx + 1, total, bytes.len());
                Ok::<_, String>(bytes.to_vec())
            })
            .try_collect()
            .await?;

        Ok(parts.concat())
    }
}

// ── OpenAI-compatible ────────────────────────────────────────────────────────

/// An OpenAI-compatible `/audio/speech` endpoint.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    base_url: String,
    model: String,
    voice: String,
    api_key: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

impl OpenAiSpeech {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, model, voice, api_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            voice: voice.into(),
            api_key: api_key.into(),
        }
    }

    fn request(&self, text: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SpeechRequest {
                model: &self.model,
                voice: &self.voice,
                input: text,
                response_format: "mp3",
            })
    }
}

#[async_trait]
impl SpeechEngine for OpenAiSpeech {
    // The voice decides the accent, so `lang` is not sent.
    async fn synthesize(&self, text: &str, _lang: &str) -> Result<Vec<u8>, String> {
        if text.trim().is_empty() {
            return Err("no speakable text".to_string());
        }
        info!("Requesting speech from {} ({})", self.base_url, self.model);

        let response = self.request(text).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {}", body.trim()));
        }
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}
