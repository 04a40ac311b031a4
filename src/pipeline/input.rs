//! Input resolution: turn a user-supplied path or URL into a [`SourceDocument`].
//!
//! Documents are small, so both local files and downloads are read fully
//! into memory. The ZIP magic bytes (`PK\x03\x04`) are checked up front so
//! an obviously wrong file fails here with a clear message instead of
//! deep inside the extractor.

use crate::error::Docx2SpeechError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Every .docx starts with a local ZIP file header.
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// An uploaded or loaded document: the original file name and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name reduced to its last component, safe to join onto a directory.
    pub fn safe_file_name(&self) -> String {
        Path::new(&self.file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty() && *n != "." && *n != "..")
            .map(str::to_string)
            .unwrap_or_else(|| "upload.docx".to_string())
    }

    /// Reject inputs that cannot be a ZIP container.
    pub fn ensure_docx(&self) -> Result<(), Docx2SpeechError> {
        if self.bytes.len() >= 4 && self.bytes[..4] == ZIP_MAGIC {
            return Ok(());
        }
        let mut magic = [0u8; 4];
        let n = self.bytes.len().min(4);
        magic[..n].copy_from_slice(&self.bytes[..n]);
        Err(Docx2SpeechError::NotADocx {
            name: self.file_name.clone(),
            magic,
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a document from a local path or an HTTP(S) URL.
pub async fn load_document(
    input: &str,
    timeout_secs: u64,
) -> Result<SourceDocument, Docx2SpeechError> {
    if input.trim().is_empty() {
        return Err(Docx2SpeechError::InvalidInput {
            input: input.to_string(),
        });
    }
    let doc = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    doc.ensure_docx()?;
    Ok(doc)
}

async fn read_local(path_str: &str) -> Result<SourceDocument, Docx2SpeechError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Docx2SpeechError::PermissionDenied { path });
        }
        Err(_) => return Err(Docx2SpeechError::FileNotFound { path }),
    };

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    Ok(SourceDocument { file_name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceDocument, Docx2SpeechError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Docx2SpeechError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Docx2SpeechError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Docx2SpeechError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Docx2SpeechError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let file_name = filename_from_url(url);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Docx2SpeechError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes as '{}'", bytes.len(), file_name);
    Ok(SourceDocument {
        file_name,
        bytes: bytes.to_vec(),
    })
}

/// Last URL path segment when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.docx".to_string()
}
