//! Uploader — copies one document into the archive under its derived key.
//!
//! Each attempt walks `Idle → SessionEstablished → Streaming → Finalizing` and
//! ends either committed or failed. The whole attempt runs under a deadline;
//! when it expires the in-flight future is dropped, which releases the backend
//! session without committing anything.

use crate::{
    models::{descriptor::UploadDescriptor, object_key::ObjectKey},
    storage::{ArchiveBackend, BackendError},
};
use futures::StreamExt;
use md5::Context;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

/// Default deadline for one upload attempt.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(50);

/// Why an upload did not commit.
#[derive(Debug, Error)]
pub enum UploadError {
    /// An object is already stored at the key; it was left untouched.
    #[error("object `{0}` already exists")]
    AlreadyExists(ObjectKey),
    #[error("storage session for `{key}` could not be opened: {source}")]
    BackendUnavailable {
        key: ObjectKey,
        #[source]
        source: BackendError,
    },
    #[error("copying `{key}` failed after {copied} bytes: {source}")]
    CopyFailed {
        key: ObjectKey,
        copied: u64,
        #[source]
        source: BackendError,
    },
    #[error("finalizing `{key}` failed: {source}")]
    CommitFailed {
        key: ObjectKey,
        #[source]
        source: BackendError,
    },
    #[error("upload of `{key}` timed out after {}s", .after.as_secs())]
    Timeout { key: ObjectKey, after: Duration },
}

impl UploadError {
    pub fn key(&self) -> &ObjectKey {
        match self {
            UploadError::AlreadyExists(key)
            | UploadError::BackendUnavailable { key, .. }
            | UploadError::CopyFailed { key, .. }
            | UploadError::CommitFailed { key, .. }
            | UploadError::Timeout { key, .. } => key,
        }
    }
}

/// What was stored by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: ObjectKey,
    pub size_bytes: u64,
    /// Lowercase hex MD5 of the stored bytes.
    pub md5: String,
}

#[derive(Clone)]
pub struct Uploader {
    backend: Arc<dyn ArchiveBackend>,
    bucket: String,
    timeout: Duration,
}

impl Uploader {
    pub fn new(backend: Arc<dyn ArchiveBackend>, bucket: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            timeout,
        }
    }

    pub fn backend(&self) -> &Arc<dyn ArchiveBackend> {
        &self.backend
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store `reader`'s contents at the descriptor's key, refusing to overwrite.
    pub async fn upload<R>(
        &self,
        descriptor: &UploadDescriptor,
        reader: R,
    ) -> Result<UploadReceipt, UploadError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let key = descriptor.object_key();
        let start = Instant::now();
        info!(bucket = %self.bucket, key = %key, "uploading document");

        let result = match tokio::time::timeout(self.timeout, self.copy_to_store(&key, reader)).await
        {
            Ok(result) => result,
            Err(_) => Err(UploadError::Timeout {
                key: key.clone(),
                after: self.timeout,
            }),
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(receipt) => info!(
                bucket = %self.bucket,
                key = %key,
                size_bytes = receipt.size_bytes,
                md5 = %receipt.md5,
                duration_ms,
                "document archived"
            ),
            Err(err @ UploadError::AlreadyExists(_)) => warn!(
                bucket = %self.bucket,
                key = %key,
                duration_ms,
                error = %err,
                "upload rejected"
            ),
            Err(err) => error!(
                bucket = %self.bucket,
                key = %key,
                backend = self.backend.kind(),
                duration_ms,
                error = %err,
                "upload failed"
            ),
        }
        result
    }

    async fn copy_to_store<R>(&self, key: &ObjectKey, reader: R) -> Result<UploadReceipt, UploadError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let mut session = self
            .backend
            .create_session(key)
            .await
            .map_err(|err| match err {
                BackendError::AlreadyExists(_) => UploadError::AlreadyExists(key.clone()),
                source => UploadError::BackendUnavailable {
                    key: key.clone(),
                    source,
                },
            })?;

        let mut stream = ReaderStream::new(reader);
        let mut digest = Context::new();
        let mut copied: u64 = 0;
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    session.abort().await;
                    return Err(UploadError::CopyFailed {
                        key: key.clone(),
                        copied,
                        source: BackendError::Io(err),
                    });
                }
            };
            digest.consume(&chunk);
            let len = chunk.len() as u64;
            if let Err(source) = session.write(chunk).await {
                session.abort().await;
                return Err(UploadError::CopyFailed {
                    key: key.clone(),
                    copied,
                    source,
                });
            }
            copied += len;
        }

        session.commit().await.map_err(|err| match err {
            BackendError::AlreadyExists(_) => UploadError::AlreadyExists(key.clone()),
            source => UploadError::CommitFailed {
                key: key.clone(),
                source,
            },
        })?;

        Ok(UploadReceipt {
            bucket: self.bucket.clone(),
            key: key.clone(),
            size_bytes: copied,
            md5: format!("{:x}", digest.compute()),
        })
    }
}
