//! Backend for remote object stores (Google Cloud Storage, S3) and the
//! in-memory store, via the `object_store` crate.
//!
//! Chunks are staged in a [`PutPayloadMut`] and committed with a single
//! `PutMode::Create` put, so the store itself enforces create-if-absent and an
//! aborted session never reaches it.

use super::{ArchiveBackend, BackendError, BackendResult, WriteSession};
use crate::models::object_key::ObjectKey;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    Error as ObjectStoreError, ObjectStore, PutMode, PutOptions, PutPayloadMut, path::Path,
};
use std::sync::Arc;
use tracing::debug;

/// Location probed by readiness checks. It never needs to exist.
const PROBE_PATH: &str = "uploads/.readyz";

#[derive(Clone)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    kind: &'static str,
}

impl ObjectStoreBackend {
    pub fn new(store: Arc<dyn ObjectStore>, kind: &'static str) -> Self {
        Self { store, kind }
    }

    fn location(key: &ObjectKey) -> BackendResult<Path> {
        Path::parse(key.as_str()).map_err(|_| BackendError::InvalidKey(key.to_string()))
    }
}

/// Fold the store's "object is there" failures into [`BackendError::AlreadyExists`].
fn map_store_error(err: ObjectStoreError, key: &ObjectKey) -> BackendError {
    match err {
        ObjectStoreError::AlreadyExists { .. } | ObjectStoreError::Precondition { .. } => {
            BackendError::AlreadyExists(key.to_string())
        }
        other => BackendError::ObjectStore(other),
    }
}

#[async_trait]
impl ArchiveBackend for ObjectStoreBackend {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn create_session(&self, key: &ObjectKey) -> BackendResult<Box<dyn WriteSession>> {
        let location = Self::location(key)?;

        // Fail before the client streams a whole file at a taken key.
        match self.store.head(&location).await {
            Ok(_) => return Err(BackendError::AlreadyExists(key.to_string())),
            Err(ObjectStoreError::NotFound { .. }) => {}
            Err(err) => return Err(map_store_error(err, key)),
        }

        Ok(Box::new(ObjectStoreSession {
            store: Arc::clone(&self.store),
            key: key.clone(),
            location,
            payload: PutPayloadMut::new(),
        }))
    }

    async fn probe(&self) -> BackendResult<()> {
        match self.store.head(&Path::from(PROBE_PATH)).await {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(err) => Err(BackendError::ObjectStore(err)),
        }
    }
}

struct ObjectStoreSession {
    store: Arc<dyn ObjectStore>,
    key: ObjectKey,
    location: Path,
    payload: PutPayloadMut,
}

#[async_trait]
impl WriteSession for ObjectStoreSession {
    async fn write(&mut self, chunk: Bytes) -> BackendResult<()> {
        self.payload.push(chunk);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BackendResult<()> {
        let Self {
            store,
            key,
            location,
            payload,
        } = *self;

        store
            .put_opts(&location, payload.freeze(), PutOptions::from(PutMode::Create))
            .await
            .map(|_| ())
            .map_err(|err| map_store_error(err, &key))
    }

    async fn abort(self: Box<Self>) {
        debug!(key = %self.key, "discarding staged payload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::{PutPayload, memory::InMemory};

    fn key(raw: &str) -> ObjectKey {
        crate::models::descriptor::RawUploadForm {
            study: Some("computer-science".into()),
            year: Some("first-year".into()),
            code: Some(raw.into()),
            kind: Some("exam".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
        .object_key()
    }

    #[tokio::test]
    async fn commit_publishes_all_chunks() {
        let store = Arc::new(InMemory::new());
        let backend = ObjectStoreBackend::new(store.clone(), "memory");
        let key = key("CS1010");

        let mut session = backend.create_session(&key).await.unwrap();
        session.write(Bytes::from_static(b"hello ")).await.unwrap();
        session.write(Bytes::from_static(b"archive")).await.unwrap();
        session.commit().await.unwrap();

        let stored = store
            .get(&Path::from(key.as_str()))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&stored[..], b"hello archive");
    }

    #[tokio::test]
    async fn existing_key_rejected_at_open() {
        let store = Arc::new(InMemory::new());
        let key = key("CS1010");
        store
            .put(&Path::from(key.as_str()), PutPayload::from(Bytes::from_static(b"old")))
            .await
            .unwrap();

        let backend = ObjectStoreBackend::new(store, "memory");
        let result = backend.create_session(&key).await;
        assert!(matches!(result, Err(BackendError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn commit_loses_race_without_overwriting() {
        let store = Arc::new(InMemory::new());
        let backend = ObjectStoreBackend::new(store.clone(), "memory");
        let key = key("CS2020");

        let mut first = backend.create_session(&key).await.unwrap();
        let mut second = backend.create_session(&key).await.unwrap();
        first.write(Bytes::from_static(b"first")).await.unwrap();
        second.write(Bytes::from_static(b"second")).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, BackendError::AlreadyExists(_)));

        let stored = store
            .get(&Path::from(key.as_str()))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&stored[..], b"first");
    }

    #[tokio::test]
    async fn abort_publishes_nothing() {
        let store = Arc::new(InMemory::new());
        let backend = ObjectStoreBackend::new(store.clone(), "memory");
        let key = key("CS3030");

        let mut session = backend.create_session(&key).await.unwrap();
        session.write(Bytes::from_static(b"partial")).await.unwrap();
        session.abort().await;

        let result = store.head(&Path::from(key.as_str())).await;
        assert!(matches!(result, Err(ObjectStoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn probe_succeeds_on_empty_store() {
        let backend = ObjectStoreBackend::new(Arc::new(InMemory::new()), "memory");
        backend.probe().await.unwrap();
    }
}
