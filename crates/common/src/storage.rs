//! Blob storage for audit evidence (photos, receipts, documents).
//!
//! Responses and audit summaries never hold file bytes, only [`FileRef`]s
//! returned by a successful [`StorageBackend::upload`].

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Reference to a stored file, as kept on responses and audit uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Storage file id.
    pub id: String,
    /// Public URL to view the file.
    pub url: String,
    /// Original file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// MIME content type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Metadata supplied alongside an upload.
#[derive(Debug, Clone, Default)]
pub struct BlobMetadata {
    /// Original file name.
    pub name: String,
    /// MIME content type.
    pub mime_type: String,
    /// Uploading user, used to partition keys.
    pub owner_id: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file and return its reference.
    async fn upload(&self, data: &[u8], metadata: &BlobMetadata) -> AppResult<FileRef>;

    /// Delete a file.
    async fn delete(&self, file_id: &str) -> AppResult<()>;

    /// Get the public URL for a file id.
    fn public_url(&self, file_id: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, file_id: &str) -> AppResult<bool>;
}

/// Shared storage handle.
pub type StorageService = Arc<dyn StorageBackend>;

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Resolve a file id to a path, refusing ids that would escape the base directory.
    fn resolve(&self, file_id: &str) -> AppResult<PathBuf> {
        let relative = Path::new(file_id);
        if file_id.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::BadRequest(format!("Invalid file id: {file_id}")));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, data: &[u8], metadata: &BlobMetadata) -> AppResult<FileRef> {
        let file_id = generate_storage_key(&metadata.owner_id, &metadata.name);
        let path = self.resolve(&file_id)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::ExternalService(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to write file: {e}")))?;

        Ok(FileRef {
            url: self.public_url(&file_id),
            id: file_id,
            name: Some(metadata.name.clone()).filter(|n| !n.is_empty()),
            mime_type: Some(metadata.mime_type.clone()).filter(|m| !m.is_empty()),
        })
    }

    async fn delete(&self, file_id: &str) -> AppResult<()> {
        let path = self.resolve(file_id)?;
        if !path.exists() {
            return Err(AppError::NotFound(format!("File: {file_id}")));
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to delete file: {e}")))
    }

    fn public_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_id)
    }

    async fn exists(&self, file_id: &str) -> AppResult<bool> {
        Ok(self.resolve(file_id)?.exists())
    }
}

/// Generate a unique storage key for a file.
#[must_use]
pub fn generate_storage_key(owner_id: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(char::is_alphanumeric))
        .unwrap_or("bin");

    let owner: String = owner_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let owner = if owner.is_empty() { "anonymous".to_string() } else { owner };

    format!(
        "{}/{}/{}_{}.{}",
        date_path,
        owner,
        now.timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        extension
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_storage() -> (LocalStorage, PathBuf) {
        let dir = std::env::temp_dir().join(format!("audit-storage-{}", uuid::Uuid::new_v4()));
        (
            LocalStorage::new(dir.clone(), "/files/".to_string()),
            dir,
        )
    }

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("inspector1", "photo.jpg");
        assert!(key.contains("inspector1"));
        assert!(key.ends_with(".jpg"));
        assert!(key.contains('/'));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key("inspector1", "receipt");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_generate_storage_key_sanitizes_owner() {
        let key = generate_storage_key("../etc", "a.png");
        assert!(!key.contains(".."));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (storage, _) = temp_storage();
        assert!(storage.resolve("../secret").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
        assert!(storage.resolve("2025/01/01/a.png").is_ok());
    }

    #[tokio::test]
    async fn test_upload_exists_delete() {
        let (storage, dir) = temp_storage();
        let meta = BlobMetadata {
            name: "lobby.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            owner_id: "insp1".to_string(),
        };

        let file = storage.upload(b"jpeg bytes", &meta).await.unwrap();
        assert!(file.url.starts_with("/files/"));
        assert_eq!(file.name.as_deref(), Some("lobby.jpg"));
        assert!(storage.exists(&file.id).await.unwrap());

        storage.delete(&file.id).await.unwrap();
        assert!(!storage.exists(&file.id).await.unwrap());
        assert!(matches!(
            storage.delete(&file.id).await,
            Err(AppError::NotFound(_))
        ));

        let _ = std::fs::remove_dir_all(dir);
    }
}
