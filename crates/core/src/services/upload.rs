//! Evidence upload service.
//!
//! Files are stored before any audit or response references them; a failed
//! upload leaves no record behind.

use audit_common::{AppError, AppResult, BlobMetadata, Caller, FileRef, StorageService};

/// Input for uploading a file.
pub struct UploadInput {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Service for uploading and removing evidence files.
#[derive(Clone)]
pub struct UploadService {
    storage: StorageService,
    max_bytes: usize,
}

impl UploadService {
    /// Create a new upload service.
    #[must_use]
    pub fn new(storage: StorageService, max_bytes: usize) -> Self {
        Self { storage, max_bytes }
    }

    /// Store a file and return its reference.
    pub async fn upload(&self, caller: &Caller, input: UploadInput) -> AppResult<FileRef> {
        if input.data.is_empty() {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }
        if input.data.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "File too large. Maximum size is {} bytes",
                self.max_bytes
            )));
        }

        let content_type = if input.content_type.trim().is_empty() {
            "application/octet-stream".to_string()
        } else {
            input.content_type
        };
        let metadata = BlobMetadata {
            name: input.name,
            mime_type: content_type,
            owner_id: caller.id.clone(),
        };

        let file = self.storage.upload(&input.data, &metadata).await?;

        tracing::info!(
            file_id = %file.id,
            user_id = %caller.id,
            size = input.data.len(),
            "File uploaded"
        );
        Ok(file)
    }

    /// Remove a stored file. Only its uploader or an admin may do this.
    pub async fn delete(&self, caller: &Caller, file_id: &str) -> AppResult<()> {
        if !caller.is_admin() && owner_of(file_id) != Some(caller.id.as_str()) {
            return Err(AppError::Forbidden(
                "File belongs to another user".to_string(),
            ));
        }

        self.storage.delete(file_id).await?;

        tracing::info!(file_id = %file_id, user_id = %caller.id, "File deleted");
        Ok(())
    }
}

/// Uploader segment of a storage key (`YYYY/MM/DD/<owner>/<file>`).
fn owner_of(file_id: &str) -> Option<&str> {
    file_id.split('/').nth(3)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use audit_common::{Role, StorageBackend, generate_storage_key};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl StorageBackend for MemoryStorage {
        async fn upload(&self, data: &[u8], metadata: &BlobMetadata) -> AppResult<FileRef> {
            let id = generate_storage_key(&metadata.owner_id, &metadata.name);
            self.files.lock().unwrap().insert(id.clone(), data.to_vec());
            Ok(FileRef {
                url: self.public_url(&id),
                id,
                name: Some(metadata.name.clone()),
                mime_type: Some(metadata.mime_type.clone()),
            })
        }

        async fn delete(&self, file_id: &str) -> AppResult<()> {
            self.files
                .lock()
                .unwrap()
                .remove(file_id)
                .map(|_| ())
                .ok_or_else(|| AppError::NotFound(format!("File: {file_id}")))
        }

        fn public_url(&self, file_id: &str) -> String {
            format!("/files/{file_id}")
        }

        async fn exists(&self, file_id: &str) -> AppResult<bool> {
            Ok(self.files.lock().unwrap().contains_key(file_id))
        }
    }

    fn service(max_bytes: usize) -> (UploadService, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::default());
        (UploadService::new(storage.clone(), max_bytes), storage)
    }

    fn input(data: &[u8]) -> UploadInput {
        UploadInput {
            name: "receipt.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_upload_and_delete_own_file() {
        let (service, storage) = service(1024);
        let caller = Caller::new("insp1", Role::Inspector);

        let file = service.upload(&caller, input(b"jpeg")).await.unwrap();
        assert!(file.id.ends_with(".jpg"));
        assert_eq!(owner_of(&file.id), Some("insp1"));
        assert!(storage.exists(&file.id).await.unwrap());

        service.delete(&caller, &file.id).await.unwrap();
        assert!(!storage.exists(&file.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_limits() {
        let (service, _) = service(4);
        let caller = Caller::new("insp1", Role::Inspector);

        let empty = service.upload(&caller, input(b"")).await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));

        let large = service.upload(&caller, input(b"too large")).await;
        assert!(matches!(large, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_foreign_file_forbidden() {
        let (service, _) = service(1024);
        let owner = Caller::new("insp1", Role::Inspector);
        let file = service.upload(&owner, input(b"jpeg")).await.unwrap();

        let other = service
            .delete(&Caller::new("insp2", Role::Inspector), &file.id)
            .await;
        assert!(matches!(other, Err(AppError::Forbidden(_))));

        service
            .delete(&Caller::new("admin1", Role::Admin), &file.id)
            .await
            .unwrap();
    }
}
