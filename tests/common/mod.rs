//! Shared helpers for integration tests: a minimal .docx builder and stub
//! completion/speech backends.

#![allow(dead_code)]

use async_trait::async_trait;
use docx2speech::{
    Completer, Completion, CompletionRequest, NarrationConfig, NarrationProgressCallback,
    PipelineState, SpeechEngine,
};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Build a .docx whose body holds one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            if p.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!(r#"<w:p><w:r><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#)
            }
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(b"<Types/>").unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

// ── Completion stub ──────────────────────────────────────────────────────────

pub struct StubCompleter {
    reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubCompleter {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Completer for StubCompleter {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, String> {
        self.prompts.lock().unwrap().push(request.user.clone());
        self.reply.clone().map(|text| Completion {
            text,
            prompt_tokens: 40,
            completion_tokens: 8,
        })
    }
}

// ── Speech stub ──────────────────────────────────────────────────────────────

pub struct StubSpeech {
    reply: Result<Vec<u8>, String>,
    pub texts: Mutex<Vec<String>>,
}

impl StubSpeech {
    pub fn producing(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(bytes.to_vec()),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechEngine for StubSpeech {
    async fn synthesize(&self, text: &str, _lang: &str) -> Result<Vec<u8>, String> {
        self.texts.lock().unwrap().push(text.to_string());
        self.reply.clone()
    }
}

// ── State recorder ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StateRecorder {
    pub states: Mutex<Vec<PipelineState>>,
}

impl StateRecorder {
    pub fn last(&self) -> Option<PipelineState> {
        self.states.lock().unwrap().last().copied()
    }
}

impl NarrationProgressCallback for StateRecorder {
    fn on_state_change(&self, _from: PipelineState, to: PipelineState) {
        self.states.lock().unwrap().push(to);
    }
}

/// Config wired to the given stubs, with scratch space under `root`.
pub fn stub_config(
    completer: Arc<StubCompleter>,
    speech: Arc<StubSpeech>,
    recorder: Arc<StateRecorder>,
    root: &std::path::Path,
) -> NarrationConfig {
    NarrationConfig::builder()
        .completer(completer)
        .speech_engine(speech)
        .progress_callback(recorder)
        .scratch_root(root)
        .build()
        .unwrap()
}
