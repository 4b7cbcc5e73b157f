//! Build the configured archive backend.

use super::{ArchiveBackend, DiskBackend, ObjectStoreBackend};
use crate::config::{AppConfig, BackendKind};
use anyhow::{Context, Result};
use object_store::{aws::AmazonS3Builder, gcp::GoogleCloudStorageBuilder, memory::InMemory};
use std::sync::Arc;

/// Create the backend named by `cfg.backend`.
///
/// Cloud credentials come from the provider's usual environment variables
/// (`GOOGLE_APPLICATION_CREDENTIALS`, `AWS_ACCESS_KEY_ID`, ...).
pub fn create_backend(cfg: &AppConfig) -> Result<Arc<dyn ArchiveBackend>> {
    let backend: Arc<dyn ArchiveBackend> = match cfg.backend {
        BackendKind::Gcs => {
            let bucket = cfg.require_bucket()?;
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .with_context(|| format!("building Google Cloud Storage client for `{bucket}`"))?;
            Arc::new(ObjectStoreBackend::new(Arc::new(store), "gcs"))
        }
        BackendKind::S3 => {
            let bucket = cfg.require_bucket()?;
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .with_context(|| format!("building S3 client for `{bucket}`"))?;
            Arc::new(ObjectStoreBackend::new(Arc::new(store), "s3"))
        }
        BackendKind::Disk => Arc::new(DiskBackend::new(cfg.storage_dir.join(cfg.bucket_name()))),
        BackendKind::Memory => Arc::new(ObjectStoreBackend::new(
            Arc::new(InMemory::new()),
            "memory",
        )),
    };

    tracing::info!(
        backend = backend.kind(),
        bucket = %cfg.bucket_name(),
        "archive backend ready"
    );
    Ok(backend)
}
