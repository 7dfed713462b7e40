//! The backing object store boundary and its filesystem implementation.
//!
//! The gateway holds no upload state of its own: the store is the source of
//! truth for which uploads exist and what state they are in. Multipart state
//! lives under `{root}/.multipart/{uploadId}/`:
//! - `metadata.json` - upload metadata (key, initiated time)
//! - `part-{partNumber}` - individual uploaded parts

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use mime_guess::MimeGuess;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};
use uuid::Uuid;

/// Caller-held resumption token for a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartUploadHandle {
    #[serde(rename = "key")]
    pub object_key: String,
    #[serde(rename = "uploadId")]
    pub upload_id: String,
}

/// One transferred part, as returned by the store and later re-supplied by
/// the caller on complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPart {
    pub part_number: u32,
    pub etag: String,
}

/// A stored object read back in full, with the metadata the response
/// headers need.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub size: u64,
    pub content_type: String,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug)]
pub enum StoreError {
    /// The object does not exist.
    NotFound(String),
    /// The store refused the operation; the message is caller-facing.
    Rejected(String),
    Io(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(key) => write!(f, "no such object: {}", key),
            StoreError::Rejected(msg) => f.write_str(msg),
            StoreError::Io(err) => write!(f, "store IO error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Object store operations the gateway depends on. One implementation backs
/// production; tests plug in fakes at this seam.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<StoredObject, StoreError>;

    /// Deleting an absent object is a success.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;

    async fn create_multipart_upload(
        &self,
        key: &str,
    ) -> Result<MultipartUploadHandle, StoreError>;

    async fn upload_part(
        &self,
        handle: &MultipartUploadHandle,
        part_number: u32,
        data: Bytes,
    ) -> Result<UploadedPart, StoreError>;

    /// Assemble the object from the caller-supplied part list, in the
    /// caller's order. Returns the final etag.
    async fn complete_multipart_upload(
        &self,
        handle: &MultipartUploadHandle,
        parts: &[UploadedPart],
    ) -> Result<String, StoreError>;

    async fn abort_multipart_upload(
        &self,
        handle: &MultipartUploadHandle,
    ) -> Result<(), StoreError>;
}

/// Upload session metadata persisted next to the parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UploadState {
    upload_id: String,
    key: String,
    initiated: DateTime<Utc>,
}

/// Filesystem-backed object store.
pub struct FilesystemStore {
    root_dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn multipart_base(&self) -> PathBuf {
        self.root_dir.join(".multipart")
    }

    fn upload_dir(&self, upload_id: &str) -> PathBuf {
        self.multipart_base().join(upload_id)
    }

    fn state_path(&self, upload_id: &str) -> PathBuf {
        self.upload_dir(upload_id).join("metadata.json")
    }

    fn part_path(&self, upload_id: &str, part_number: u32) -> PathBuf {
        self.upload_dir(upload_id)
            .join(format!("part-{}", part_number))
    }

    async fn load_state(&self, upload_id: &str) -> Result<UploadState, StoreError> {
        let raw = fs::read_to_string(self.state_path(upload_id))
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StoreError::Rejected(format!("no such upload: {}", upload_id))
                } else {
                    StoreError::Io(e)
                }
            })?;
        serde_json::from_str(&raw).map_err(|e| {
            error!(upload_id = %upload_id, "Failed to parse upload metadata: {}", e);
            StoreError::Rejected(format!("upload state unreadable: {}", upload_id))
        })
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn get_object(&self, key: &str) -> Result<StoredObject, StoreError> {
        let path = self.object_path(key);
        debug!(key = %key, path = ?path, "Reading object");

        let metadata = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(StoreError::NotFound(key.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let data = fs::read(&path).await?;
        let last_modified = metadata
            .modified()
            .ok()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);
        let content_type = MimeGuess::from_path(&path)
            .first_or_octet_stream()
            .to_string();
        let etag = format!("\"{:x}\"", md5::compute(&data));

        Ok(StoredObject {
            size: data.len() as u64,
            data: Bytes::from(data),
            content_type,
            etag,
            last_modified,
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(key);
        debug!(key = %key, path = ?path, "Deleting object");

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Deleting a non-existent object is a success.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
    ) -> Result<MultipartUploadHandle, StoreError> {
        let upload_id = Uuid::new_v4().to_string();
        let state = UploadState {
            upload_id: upload_id.clone(),
            key: key.to_string(),
            initiated: Utc::now(),
        };

        let upload_dir = self.upload_dir(&upload_id);
        fs::create_dir_all(&upload_dir).await.map_err(|e| {
            error!(upload_dir = ?upload_dir, "Failed to create upload directory: {}", e);
            StoreError::Io(e)
        })?;

        let state_json = serde_json::to_string_pretty(&state)
            .map_err(|e| StoreError::Rejected(format!("failed to serialize upload state: {}", e)))?;
        fs::write(self.state_path(&upload_id), state_json).await?;

        debug!(upload_id = %upload_id, key = %key, "Created multipart upload");

        Ok(MultipartUploadHandle {
            object_key: key.to_string(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        handle: &MultipartUploadHandle,
        part_number: u32,
        data: Bytes,
    ) -> Result<UploadedPart, StoreError> {
        if !(1..=10000).contains(&part_number) {
            return Err(StoreError::Rejected(
                "part number must be between 1 and 10000".to_string(),
            ));
        }

        self.load_state(&handle.upload_id).await?;

        let part_path = self.part_path(&handle.upload_id, part_number);
        let mut file = fs::File::create(&part_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        let etag = format!("\"{:x}\"", md5::compute(&data));

        debug!(
            upload_id = %handle.upload_id,
            part_number = %part_number,
            size = %data.len(),
            "Uploaded part"
        );

        Ok(UploadedPart { part_number, etag })
    }

    async fn complete_multipart_upload(
        &self,
        handle: &MultipartUploadHandle,
        parts: &[UploadedPart],
    ) -> Result<String, StoreError> {
        let state = self.load_state(&handle.upload_id).await?;

        if parts.is_empty() {
            return Err(StoreError::Rejected("part list is empty".to_string()));
        }

        // Every listed part must exist with a matching etag before anything
        // is assembled.
        for part in parts {
            let part_path = self.part_path(&handle.upload_id, part.part_number);
            let data = fs::read(&part_path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StoreError::Rejected(format!("part {} not found", part.part_number))
                } else {
                    StoreError::Io(e)
                }
            })?;
            let actual = format!("\"{:x}\"", md5::compute(&data));
            if actual != part.etag {
                return Err(StoreError::Rejected(format!(
                    "etag mismatch for part {}: expected {}, got {}",
                    part.part_number, part.etag, actual
                )));
            }
        }

        let dest_path = self.object_path(&state.key);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Assemble in caller order, to a temp file first so a partially
        // written object is never visible under the final key.
        let temp_path = dest_path.with_extension("tmp");
        let mut dest = fs::File::create(&temp_path).await?;
        let mut all_data = Vec::new();
        for part in parts {
            let data = fs::read(self.part_path(&handle.upload_id, part.part_number)).await?;
            dest.write_all(&data).await?;
            all_data.extend_from_slice(&data);
        }
        dest.sync_all().await?;
        drop(dest);
        fs::rename(&temp_path, &dest_path).await?;

        let final_etag = format!("\"{:x}\"", md5::compute(&all_data));

        let upload_dir = self.upload_dir(&handle.upload_id);
        if let Err(e) = fs::remove_dir_all(&upload_dir).await {
            error!(upload_dir = ?upload_dir, "Failed to clean up upload state: {}", e);
        }

        debug!(
            upload_id = %handle.upload_id,
            key = %state.key,
            parts = %parts.len(),
            total_size = %all_data.len(),
            "Completed multipart upload"
        );

        Ok(final_etag)
    }

    async fn abort_multipart_upload(
        &self,
        handle: &MultipartUploadHandle,
    ) -> Result<(), StoreError> {
        self.load_state(&handle.upload_id).await?;

        fs::remove_dir_all(self.upload_dir(&handle.upload_id)).await?;
        debug!(upload_id = %handle.upload_id, "Aborted multipart upload");
        Ok(())
    }
}
