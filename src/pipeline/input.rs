//! Input handling: the uploaded document and its admission checks.
//!
//! A [`SourceDocument`] is built once per request, validated against the
//! configured size limit, handed to the extraction stage and then dropped.
//! Nothing here touches the network; bad input is rejected before the
//! pipeline starts so callers get a 4xx-style error immediately.

use crate::error::AnalyzeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Broad kind of an upload; selects the extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Structured document; analysed by the size-band heuristic.
    Pdf,
    /// Scanned text; sent to OCR.
    Image,
}

impl MediaKind {
    /// Map a declared MIME type onto a kind. Parameters (`; charset=…`) are ignored.
    pub fn from_mime(mime: &str) -> Result<Self, AnalyzeError> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(MediaKind::Pdf),
            "image/jpeg" | "image/png" | "image/jpg" => Ok(MediaKind::Image),
            _ => Err(AnalyzeError::UnsupportedMediaType {
                declared: mime.to_string(),
            }),
        }
    }

    /// Map a file extension (without the dot) onto a kind.
    pub fn from_extension(ext: &str) -> Result<Self, AnalyzeError> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(MediaKind::Pdf),
            "png" | "jpg" | "jpeg" => Ok(MediaKind::Image),
            other => Err(AnalyzeError::UnsupportedMediaType {
                declared: format!(".{other}"),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Pdf => "pdf",
            MediaKind::Image => "image",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document: raw bytes plus what the uploader declared about them.
#[derive(Clone)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    kind: MediaKind,
    name: String,
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl SourceDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, kind: MediaKind, name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            kind,
            name: name.into(),
        }
    }

    /// Build from an upload's declared MIME type, rejecting unsupported kinds.
    pub fn from_upload(
        bytes: impl Into<Vec<u8>>,
        mime: &str,
        name: impl Into<String>,
    ) -> Result<Self, AnalyzeError> {
        let kind = MediaKind::from_mime(mime)?;
        Ok(Self::new(bytes, kind, name))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Check the admission rules: non-empty and within `max_size`.
    pub fn validate(&self, max_size: u64) -> Result<(), AnalyzeError> {
        if self.bytes.is_empty() {
            return Err(AnalyzeError::EmptyDocument {
                name: self.name.clone(),
            });
        }
        if self.size() > max_size {
            return Err(AnalyzeError::FileTooLarge {
                size: self.size(),
                max: max_size,
            });
        }
        Ok(())
    }
}

/// Load a local file as a [`SourceDocument`], inferring the kind from its extension.
///
/// The size limit is checked against file metadata before the bytes are read.
pub async fn load_file(path: &Path, max_size: u64) -> Result<SourceDocument, AnalyzeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let kind = MediaKind::from_extension(ext)?;

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_to_input_error(e, path))?;
    if meta.len() > max_size {
        return Err(AnalyzeError::FileTooLarge {
            size: meta.len(),
            max: max_size,
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_to_input_error(e, path))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Loaded {} ({} bytes, {})", name, bytes.len(), kind);
    Ok(SourceDocument::new(bytes, kind, name))
}

fn io_to_input_error(e: std::io::Error, path: &Path) -> AnalyzeError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => AnalyzeError::PermissionDenied { path },
        _ => AnalyzeError::FileNotFound { path },
    }
}
