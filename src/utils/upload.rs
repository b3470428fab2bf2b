use std::path::{Path, PathBuf};

use axum::extract::{multipart::Field, Multipart};
use tokio::{fs::File, io::AsyncWriteExt};
use uuid::Uuid;

use crate::{
    error::{AppResult, OrAppError},
    extractors::multipart_error,
};

/// An uploaded file spooled to the temp directory, waiting to be forwarded
/// to the media host.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

impl LocalFile {
    /// Remove the spooled copy. Failures are logged only.
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!("Failed to remove temp file {}: {}", self.path.display(), e);
        }
    }
}

pub fn sanitize_filename(filename: &str) -> String {
    // Remove potentially dangerous characters
    let safe_chars: String = filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{}_{}", Uuid::new_v4().simple(), safe_chars)
}

/// Drain `multipart`, spooling the first part named `field_name` to
/// `temp_dir`. Other parts are ignored. Returns `None` when no file was sent.
pub async fn spool_upload(
    mut multipart: Multipart,
    field_name: &str,
    temp_dir: &Path,
) -> AppResult<Option<LocalFile>> {
    let mut spooled: Option<LocalFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                if let Some(file) = spooled.take() {
                    file.discard().await;
                }
                return Err(multipart_error(e));
            }
        };

        if spooled.is_some() || field.name() != Some(field_name) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        tokio::fs::create_dir_all(temp_dir)
            .await
            .or_internal("Error while receiving file")?;
        let path = temp_dir.join(sanitize_filename(&original_name));

        let size = match write_field(field, &path).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
        };

        let file = LocalFile {
            path,
            original_name,
            content_type,
            size,
        };

        // Browsers send an empty nameless part when no file was chosen.
        if file.original_name.is_empty() && file.size == 0 {
            file.discard().await;
            continue;
        }

        tracing::debug!(
            "Spooled upload {} ({} bytes) to {}",
            file.original_name,
            file.size,
            file.path.display()
        );
        spooled = Some(file);
    }

    Ok(spooled)
}

async fn write_field(mut field: Field<'_>, path: &Path) -> AppResult<u64> {
    let mut out = File::create(path)
        .await
        .or_internal("Error while receiving file")?;
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        out.write_all(&chunk)
            .await
            .or_internal("Error while receiving file")?;
    }
    out.flush().await.or_internal("Error while receiving file")?;

    Ok(size)
}
