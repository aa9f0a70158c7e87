use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::AppError,
    storage::{StorageClient, StoredObject},
};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("file body must not be empty")]
    Empty,
    #[error("file '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FileError> for AppError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::Empty => AppError::Validation(e.to_string()),
            FileError::NotFound(_) => AppError::NotFound(e.to_string()),
            FileError::Internal(e) => AppError::Internal(e),
        }
    }
}

pub struct FileService {
    storage: Arc<dyn StorageClient>,
}

impl FileService {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Stores the bytes under a fresh `<uuid><.ext>` name and returns it.
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn upload_file(&self, body: Bytes, declared: Option<&str>) -> Result<String, FileError> {
        if body.is_empty() {
            return Err(FileError::Empty);
        }
        let content_type = detect_content_type(&body, declared);
        let ext = ext_from_mime(&content_type)
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let file_name = format!("{}{}", Uuid::new_v4(), ext);

        self.storage
            .put_object(&file_name, body, &content_type)
            .await
            .with_context(|| format!("put_object {file_name}"))?;
        info!(%file_name, %content_type, "file uploaded");
        Ok(file_name)
    }

    pub async fn download_file(&self, file_name: &str) -> Result<StoredObject, FileError> {
        check_name(file_name)?;
        self.storage
            .get_object(file_name)
            .await
            .with_context(|| format!("get_object {file_name}"))?
            .ok_or_else(|| FileError::NotFound(file_name.to_string()))
    }

    pub async fn get_file_last_modified(&self, file_name: &str) -> Result<OffsetDateTime, FileError> {
        check_name(file_name)?;
        self.storage
            .object_last_modified(file_name)
            .await
            .with_context(|| format!("stat object {file_name}"))?
            .ok_or_else(|| FileError::NotFound(file_name.to_string()))
    }
}

// Uploaded names are flat; anything path-like cannot exist.
fn check_name(file_name: &str) -> Result<(), FileError> {
    if file_name.is_empty() || file_name.contains('/') || file_name.contains("..") {
        return Err(FileError::NotFound(file_name.to_string()));
    }
    Ok(())
}

/// Known binary signatures win over the declared type; unknown content falls
/// back to the declared type, then to text or octet-stream.
fn detect_content_type(body: &[u8], declared: Option<&str>) -> String {
    let sniffed = if body.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if body.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if body.starts_with(b"GIF87a") || body.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if body.len() >= 12 && &body[..4] == b"RIFF" && &body[8..12] == b"WEBP" {
        Some("image/webp")
    } else if body.starts_with(b"%PDF-") {
        Some("application/pdf")
    } else {
        None
    };
    if let Some(ct) = sniffed {
        return ct.to_string();
    }

    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.starts_with("application/octet-stream") => ct.to_string(),
        _ if std::str::from_utf8(body).is_ok() => "text/plain; charset=utf-8".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    let essence = ct.split(';').next().unwrap_or_default().trim();
    match essence {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        "image/svg+xml" => Some("svg"),
        "application/pdf" => Some("pdf"),
        "text/plain" => Some("txt"),
        "text/markdown" => Some("md"),
        _ => None,
    }
}
