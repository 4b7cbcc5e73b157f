//! Archive storage backends.
//!
//! A backend hands out write sessions for a single key. A session stages bytes
//! out of sight and only publishes them on `commit`, which fails with
//! [`BackendError::AlreadyExists`] if another object got there first. Dropping
//! or aborting a session publishes nothing.

pub mod disk;
pub mod factory;
pub mod object_store_backend;

use crate::models::object_key::ObjectKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

pub use disk::DiskBackend;
pub use factory::create_backend;
pub use object_store_backend::ObjectStoreBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("object `{0}` already exists")]
    AlreadyExists(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error(transparent)]
    ObjectStore(object_store::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage capable of "create object if absent".
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    /// Short backend name for logs and readiness output.
    fn kind(&self) -> &'static str;

    /// Open a conditional write session for `key`.
    ///
    /// Backends may already reject keys that exist here; the authoritative
    /// check happens in [`WriteSession::commit`].
    async fn create_session(&self, key: &ObjectKey) -> BackendResult<Box<dyn WriteSession>>;

    /// Cheap round trip used by the readiness probe.
    async fn probe(&self) -> BackendResult<()>;
}

/// One uncommitted write. Consumed by either `commit` or `abort`.
#[async_trait]
pub trait WriteSession: Send {
    async fn write(&mut self, chunk: Bytes) -> BackendResult<()>;

    async fn commit(self: Box<Self>) -> BackendResult<()>;

    async fn abort(self: Box<Self>);
}
