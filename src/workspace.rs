//! Per-request scratch storage.
//!
//! Every run gets its own directory `<scratch_root>/<uuid>/` with an
//! `uploads/` and an `output/` subdirectory. Two runs never share a path, so
//! concurrent requests cannot read each other's upload or overwrite each
//! other's audio. The directory is removed when the [`Workspace`] is dropped.

use crate::error::Docx2SpeechError;
use crate::output::AUDIO_FILE_NAME;
use crate::pipeline::input::SourceDocument;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Scratch directory owned by one narration run.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace under `root`.
    pub async fn create(root: impl AsRef<Path>) -> Result<Self, Docx2SpeechError> {
        let id = Uuid::new_v4();
        let dir = root.as_ref().join(id.to_string());
        for sub in ["uploads", "output"] {
            tokio::fs::create_dir_all(dir.join(sub))
                .await
                .map_err(|e| {
                    Docx2SpeechError::workspace(format!("cannot create {}: {e}", dir.display()))
                })?;
        }
        debug!("Created workspace {}", dir.display());
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.join("output")
    }

    /// Where the narrated audio of this run is written.
    pub fn audio_path(&self) -> PathBuf {
        self.output_dir().join(AUDIO_FILE_NAME)
    }

    /// Persist the uploaded document under `uploads/` using its sanitised
    /// file name, and return the stored path.
    pub async fn store_upload(&self, doc: &SourceDocument) -> Result<PathBuf, Docx2SpeechError> {
        let path = self.uploads_dir().join(doc.safe_file_name());
        tokio::fs::write(&path, &doc.bytes).await.map_err(|e| {
            Docx2SpeechError::workspace(format!("cannot store upload {}: {e}", path.display()))
        })?;
        Ok(path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove workspace {}: {}", self.dir.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn layout_under_root() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();
        assert_eq!(ws.dir(), root.path().join(ws.id().to_string()));
        assert!(ws.uploads_dir().is_dir());
        assert!(ws.output_dir().is_dir());
        assert_eq!(ws.audio_path(), ws.dir().join("output").join("final.mp3"));
    }

    #[tokio::test]
    async fn workspaces_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(root.path()).await.unwrap();
        let b = Workspace::create(root.path()).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.audio_path(), b.audio_path());

        let doc = SourceDocument::new("notes.docx", b"PK\x03\x04a".to_vec());
        let pa = a.store_upload(&doc).await.unwrap();
        let pb = b
            .store_upload(&SourceDocument::new("notes.docx", b"PK\x03\x04b".to_vec()))
            .await
            .unwrap();
        assert_ne!(pa, pb);
        assert_eq!(std::fs::read(pa).unwrap(), b"PK\x03\x04a");
    }

    #[tokio::test]
    async fn upload_name_cannot_escape() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();
        let doc = SourceDocument::new("../../evil.docx", b"x".to_vec());
        let stored = ws.store_upload(&doc).await.unwrap();
        assert_eq!(stored, ws.uploads_dir().join("evil.docx"));
    }

    #[tokio::test]
    async fn drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();
        let dir = ws.dir().to_path_buf();
        assert!(dir.exists());
        drop(ws);
        assert!(!dir.exists());
    }
}
