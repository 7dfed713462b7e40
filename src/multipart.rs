//! Multipart upload orchestration.
//!
//! Drives the create / upload-part / complete / abort lifecycle against the
//! object store. The gateway keeps no session state: the caller re-presents
//! the upload handle on every call and the store decides whether it is
//! still live. Request-shape problems (missing parameters, missing body)
//! are rejected here before the store is touched; store rejections come
//! back as client errors with the store's message passed through verbatim.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::store::{MultipartUploadHandle, ObjectStore, UploadedPart};

pub struct MultipartUploadOrchestrator {
    store: Arc<dyn ObjectStore>,
}

impl MultipartUploadOrchestrator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, key: &str) -> Result<MultipartUploadHandle, GatewayError> {
        let handle = self.store.create_multipart_upload(key).await.map_err(|e| {
            warn!(key = %key, error = %e, "Store refused to create multipart upload");
            GatewayError::CreateFailure(e.to_string())
        })?;

        debug!(key = %key, upload_id = %handle.upload_id, "Multipart upload created");
        Ok(handle)
    }

    pub async fn upload_part(
        &self,
        key: &str,
        upload_id: Option<&str>,
        part_number: Option<&str>,
        data: Bytes,
    ) -> Result<UploadedPart, GatewayError> {
        let upload_id = upload_id.ok_or(GatewayError::MissingParameter("uploadId"))?;
        let raw_part_number = part_number.ok_or(GatewayError::MissingParameter("partNumber"))?;
        let part_number: u32 = raw_part_number
            .parse()
            .map_err(|_| GatewayError::InvalidPartNumber(raw_part_number.to_string()))?;

        let handle = MultipartUploadHandle {
            object_key: key.to_string(),
            upload_id: upload_id.to_string(),
        };

        let part = self
            .store
            .upload_part(&handle, part_number, data)
            .await
            .map_err(|e| {
                warn!(
                    key = %key,
                    upload_id = %upload_id,
                    part_number = %part_number,
                    error = %e,
                    "Store rejected part upload"
                );
                GatewayError::PartUploadFailure(e.to_string())
            })?;

        debug!(
            key = %key,
            upload_id = %upload_id,
            part_number = %part.part_number,
            etag = %part.etag,
            "Part uploaded"
        );
        Ok(part)
    }

    /// The caller supplies the full ordered part list; nothing is tracked
    /// between calls.
    pub async fn complete(
        &self,
        key: &str,
        upload_id: Option<&str>,
        body: &Bytes,
    ) -> Result<String, GatewayError> {
        let upload_id = upload_id.ok_or(GatewayError::MissingParameter("uploadId"))?;
        if body.is_empty() {
            return Err(GatewayError::MissingBody);
        }

        let parts: Vec<UploadedPart> = serde_json::from_slice(body)
            .map_err(|e| GatewayError::MalformedBody(e.to_string()))?;

        let handle = MultipartUploadHandle {
            object_key: key.to_string(),
            upload_id: upload_id.to_string(),
        };

        let etag = self
            .store
            .complete_multipart_upload(&handle, &parts)
            .await
            .map_err(|e| {
                warn!(
                    key = %key,
                    upload_id = %upload_id,
                    error = %e,
                    "Store rejected completion"
                );
                GatewayError::CompletionFailure(e.to_string())
            })?;

        debug!(key = %key, upload_id = %upload_id, etag = %etag, "Multipart upload completed");
        Ok(etag)
    }

    pub async fn abort(&self, key: &str, upload_id: Option<&str>) -> Result<(), GatewayError> {
        let upload_id = upload_id.ok_or(GatewayError::MissingParameter("uploadId"))?;

        let handle = MultipartUploadHandle {
            object_key: key.to_string(),
            upload_id: upload_id.to_string(),
        };

        self.store
            .abort_multipart_upload(&handle)
            .await
            .map_err(|e| {
                warn!(key = %key, upload_id = %upload_id, error = %e, "Store rejected abort");
                GatewayError::AbortFailure(e.to_string())
            })?;

        debug!(key = %key, upload_id = %upload_id, "Multipart upload aborted");
        Ok(())
    }
}
