use anyhow::{Context, Result};
use axum::extract::Multipart;
use std::path::Path;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "pdf"];

const FILE_FIELD: &str = "file";

/// Checks the text after the last dot, case-insensitively.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub(super) struct UploadedFile {
    pub(super) filename: String,
    pub(super) bytes: Vec<u8>,
}

/// First `file` field of the form, or `None` when the form has no such field.
pub(super) async fn read_file_field(multipart: &mut Multipart) -> Result<Option<UploadedFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .with_context(|| "failed to read upload")?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .with_context(|| "failed to read uploaded file")?;
        return Ok(Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// Stores the upload under its client-supplied name; an existing file is overwritten.
pub(super) async fn save(upload: &UploadedFile, uploads_dir: &Path) -> Result<std::path::PathBuf> {
    let path = uploads_dir.join(&upload.filename);
    tokio::fs::write(&path, &upload.bytes)
        .await
        .with_context(|| format!("failed to save upload: {}", path.display()))?;
    Ok(path)
}
