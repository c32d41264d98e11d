//! VCF upload payloads.
//!
//! An upload is the file the user picked, held in memory until it is sent as the `file` part of
//! `POST /analyze`. The 5 MiB limit is checked against file metadata before any bytes are read,
//! so oversized files are never loaded.

use crate::constants::{ACCEPTED_EXTENSIONS, MAX_UPLOAD_BYTES};
use crate::{ClientError, ClientResult};
use std::fs;
use std::path::Path;

/// A file selected for analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VcfUpload {
    file_name: String,
    bytes: Vec<u8>,
}

impl VcfUpload {
    /// Wrap an in-memory file. No size check happens here; the submission view applies it.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::FileTooLarge` if the file is larger than [`MAX_UPLOAD_BYTES`]
    /// (checked from metadata, before reading), or `ClientError::Io` if it cannot be read.
    pub fn from_path(path: &Path) -> ClientResult<Self> {
        let metadata = fs::metadata(path).map_err(|e| {
            ClientError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot stat {}: {}", path.display(), e),
            ))
        })?;

        if metadata.len() > MAX_UPLOAD_BYTES {
            return Err(ClientError::FileTooLarge {
                size_bytes: metadata.len(),
            });
        }

        let bytes = fs::read(path).map_err(|e| {
            ClientError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot read {}: {}", path.display(), e),
            ))
        })?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.vcf")
            .to_string();

        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn exceeds_limit(&self) -> bool {
        self.size_bytes() > MAX_UPLOAD_BYTES
    }

    /// Whether the name ends with one of the picker's advisory extensions.
    pub fn has_accepted_extension(&self) -> bool {
        let lower = self.file_name.to_ascii_lowercase();
        ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.file_name, self.bytes)
    }
}
