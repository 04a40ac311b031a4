//! Synthesis: hand the narration text to a [`SpeechEngine`] and persist the
//! MP3 it returns.
//!
//! The audio is written to a temp file next to the target and renamed into
//! place, so a reader never observes a half-written `final.mp3`. After the
//! rename the file is checked for existence and a non-zero size; an engine
//! that reports success without producing audio is an error, not a silent
//! empty download.

use crate::config::NarrationConfig;
use crate::error::Docx2SpeechError;
use crate::output::{AudioArtifact, AUDIO_FILE_NAME};
use crate::pipeline::narration::prepare_for_speech;
use crate::pipeline::speech::SpeechEngine;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Speak `text` and write the audio to `target`.
pub async fn synthesize_to_file(
    engine: &dyn SpeechEngine,
    text: &str,
    target: &Path,
    config: &NarrationConfig,
) -> Result<AudioArtifact, Docx2SpeechError> {
    let start = Instant::now();
    let spoken = prepare_for_speech(text);
    info!(
        "Synthesizing {} chars in '{}'",
        spoken.chars().count(),
        config.language
    );

    let call = engine.synthesize(&spoken, &config.language);
    let result = match config.speech_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .unwrap_or_else(|_| Err(format!("speech request timed out after {secs}s"))),
        None => call.await,
    };

    let audio = result.map_err(|reason| {
        warn!("Speech engine failed: {}", reason);
        Docx2SpeechError::Synthesis { reason }
    })?;

    if audio.is_empty() {
        return Err(Docx2SpeechError::AudioMissing {
            path: target.to_path_buf(),
        });
    }

    write_atomic(target, &audio)?;
    let size_bytes = verify_audio(target).await?;

    debug!(
        "Wrote {} bytes to {} in {:?}",
        size_bytes,
        target.display(),
        start.elapsed()
    );

    Ok(AudioArtifact {
        path: target.to_path_buf(),
        file_name: AUDIO_FILE_NAME.to_string(),
        size_bytes,
    })
}

fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), Docx2SpeechError> {
    let write_err = |source: std::io::Error| Docx2SpeechError::OutputWriteFailed {
        path: target.to_path_buf(),
        source,
    };

    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(target).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Size of the file at `path`, or [`Docx2SpeechError::AudioMissing`] when it
/// is absent or empty.
pub async fn verify_audio(path: &Path) -> Result<u64, Docx2SpeechError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        _ => Err(Docx2SpeechError::AudioMissing {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::speech::tests::StubSpeech;

    #[tokio::test]
    async fn success_writes_non_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("output").join(AUDIO_FILE_NAME);
        let engine = StubSpeech::producing(b"ID3\x04fake-mp3");
        let config = NarrationConfig::default();

        let artifact = synthesize_to_file(&engine, "Intro. x squared.", &target, &config)
            .await
            .unwrap();

        assert_eq!(artifact.path, target);
        assert_eq!(artifact.file_name, "final.mp3");
        assert_eq!(artifact.size_bytes, 12);
        assert_eq!(std::fs::read(&target).unwrap(), b"ID3\x04fake-mp3");
    }

    #[tokio::test]
    async fn engine_receives_cleaned_text_and_language() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubSpeech::producing(b"mp3");
        let config = NarrationConfig::builder().language("de").build().unwrap();

        synthesize_to_file(&engine, "## Title\n**Bold** text.", &dir.path().join("a.mp3"), &config)
            .await
            .unwrap();

        let spoken = engine.spoken.lock().unwrap();
        assert_eq!(spoken[0], ("Title\nBold text.".to_string(), "de".to_string()));
    }

    #[tokio::test]
    async fn engine_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(AUDIO_FILE_NAME);
        let engine = StubSpeech::failing("HTTP 503");
        let config = NarrationConfig::default();

        let err = synthesize_to_file(&engine, "hello", &target, &config)
            .await
            .unwrap_err();

        assert!(matches!(err, Docx2SpeechError::Synthesis { ref reason } if reason.contains("503")));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn empty_audio_is_missing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(AUDIO_FILE_NAME);
        let engine = StubSpeech::producing(b"");
        let config = NarrationConfig::default();

        let err = synthesize_to_file(&engine, "hello", &target, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Docx2SpeechError::AudioMissing { .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn verify_audio_rejects_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp3");
        assert!(verify_audio(&missing).await.is_err());

        let empty = dir.path().join("empty.mp3");
        std::fs::write(&empty, b"").unwrap();
        assert!(verify_audio(&empty).await.is_err());

        let ok = dir.path().join("ok.mp3");
        std::fs::write(&ok, b"x").unwrap();
        assert_eq!(verify_audio(&ok).await.unwrap(), 1);
    }
}
