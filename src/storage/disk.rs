//! Local-disk archive backend.
//!
//! Objects live at `base_path/{key}`. A session streams into a hidden
//! `.tmp-{uuid}` file next to its destination; `commit` fsyncs it and publishes
//! it with `hard_link`, which refuses to replace an existing file. The temp file
//! is removed on every path, including when the session is dropped mid-write
//! or mid-commit.
//! Directories created for a session are left in place.

use super::{ArchiveBackend, BackendError, BackendResult, WriteSession};
use crate::models::object_key::ObjectKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;

#[derive(Clone, Debug)]
pub struct DiskBackend {
    /// Directory holding the archive tree.
    base_path: PathBuf,
}

impl DiskBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Reject keys that could escape `base_path`.
    fn ensure_key_safe(key: &str) -> BackendResult<()> {
        let unsafe_key = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.contains("..")
            || key
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if unsafe_key {
            return Err(BackendError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait]
impl ArchiveBackend for DiskBackend {
    fn kind(&self) -> &'static str {
        "disk"
    }

    async fn create_session(&self, key: &ObjectKey) -> BackendResult<Box<dyn WriteSession>> {
        Self::ensure_key_safe(key.as_str())?;

        let final_path = self.object_path(key.as_str());
        if fs::try_exists(&final_path).await? {
            return Err(BackendError::AlreadyExists(key.to_string()));
        }

        let parent = final_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| BackendError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let file = File::create(&tmp_path).await?;

        Ok(Box::new(DiskSession {
            file: Some(file),
            finished: false,
            tmp_path,
            final_path,
            key: key.clone(),
        }))
    }

    /// Write, read back and delete a scratch file under `base_path`.
    async fn probe(&self) -> BackendResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));

        let result = async {
            fs::write(&tmp_path, b"readyz").await?;
            let bytes = fs::read(&tmp_path).await?;
            if bytes != b"readyz" {
                return Err(io::Error::new(ErrorKind::Other, "file content mismatch"));
            }
            Ok::<(), io::Error>(())
        }
        .await;

        let _ = fs::remove_file(&tmp_path).await;
        result.map_err(BackendError::Io)
    }
}

struct DiskSession {
    /// `None` once `publish` has started or the session was aborted.
    file: Option<File>,
    /// Set once the temp file has been removed by `commit` or `abort`.
    finished: bool,
    tmp_path: PathBuf,
    final_path: PathBuf,
    key: ObjectKey,
}

impl DiskSession {
    async fn remove_tmp(&self) {
        if let Err(err) = fs::remove_file(&self.tmp_path).await {
            if err.kind() != ErrorKind::NotFound {
                debug!("failed to remove temp file {}: {}", self.tmp_path.display(), err);
            }
        }
    }

    async fn publish(&mut self) -> BackendResult<()> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| io::Error::new(ErrorKind::Other, "session already finished"))?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        match fs::hard_link(&self.tmp_path, &self.final_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(BackendError::AlreadyExists(self.key.to_string()))
            }
            Err(err) => Err(BackendError::Io(err)),
        }
    }
}

#[async_trait]
impl WriteSession for DiskSession {
    async fn write(&mut self, chunk: Bytes) -> BackendResult<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::Other, "session already finished"))?;
        file.write_all(&chunk).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BackendResult<()> {
        let mut session = self;
        let result = session.publish().await;
        // The published link keeps the data alive; the temp name always goes.
        session.remove_tmp().await;
        session.finished = true;
        result
    }

    async fn abort(self: Box<Self>) {
        let mut session = self;
        session.file = None;
        session.remove_tmp().await;
        session.finished = true;
    }
}

impl Drop for DiskSession {
    fn drop(&mut self) {
        // Not finished means commit or abort never ran to completion, e.g. the
        // upload deadline cancelled the future part way through a commit.
        // Drop cannot await; a single unlink is short enough to run inline.
        if !self.finished {
            self.file = None;
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::descriptor::RawUploadForm;
    use futures::FutureExt;

    fn key(code: &str, answers: bool) -> ObjectKey {
        RawUploadForm {
            study: Some("applied-mathematics".into()),
            year: Some("second-year".into()),
            code: Some(code.into()),
            kind: Some("midterm".into()),
            answers: answers.then(|| "on".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap()
        .object_key()
    }

    async fn write_all(
        backend: &DiskBackend,
        key: &ObjectKey,
        body: &'static [u8],
    ) -> BackendResult<()> {
        let mut session = backend.create_session(key).await?;
        session.write(Bytes::from_static(body)).await?;
        session.commit().await
    }

    #[tokio::test]
    async fn commit_places_file_at_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        let key = key("AM1000", false);

        write_all(&backend, &key, b"%PDF-1.7").await.unwrap();

        let path = dir
            .path()
            .join("uploads/applied-mathematics/second-year/AM1000/midterm.pdf");
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        let key = key("AM1001", true);

        write_all(&backend, &key, b"answers").await.unwrap();

        let parent = dir.path().join("uploads/applied-mathematics/second-year/AM1001");
        let names: Vec<_> = std::fs::read_dir(parent)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["midterm_answers.pdf".to_string()]);
    }

    #[tokio::test]
    async fn existing_file_is_never_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        let key = key("AM1002", false);

        let mut late = backend.create_session(&key).await.unwrap();
        write_all(&backend, &key, b"original").await.unwrap();

        assert!(matches!(
            backend.create_session(&key).await,
            Err(BackendError::AlreadyExists(_))
        ));

        late.write(Bytes::from_static(b"replacement")).await.unwrap();
        assert!(matches!(
            late.commit().await,
            Err(BackendError::AlreadyExists(_))
        ));

        let stored = std::fs::read(dir.path().join(key.as_str())).unwrap();
        assert_eq!(stored, b"original");
    }

    #[tokio::test]
    async fn abort_removes_staged_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        let key = key("AM1003", false);

        let mut session = backend.create_session(&key).await.unwrap();
        session.write(Bytes::from_static(b"half")).await.unwrap();
        session.abort().await;

        assert!(!dir.path().join(key.as_str()).exists());
        let parent = dir.path().join("uploads/applied-mathematics/second-year/AM1003");
        assert_eq!(std::fs::read_dir(parent).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn dropped_session_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        let key = key("AM1004", false);

        let mut session = backend.create_session(&key).await.unwrap();
        session.write(Bytes::from_static(b"cut off")).await.unwrap();
        drop(session);

        let parent = dir.path().join("uploads/applied-mathematics/second-year/AM1004");
        assert_eq!(std::fs::read_dir(parent).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cancelled_commit_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        let key = key("AM1005", false);

        let mut session = backend.create_session(&key).await.unwrap();
        session.write(Bytes::from_static(b"interrupted")).await.unwrap();
        let _ = session.commit().now_or_never();

        // Blocking-pool work started by the first poll may still be in flight.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let parent = dir.path().join("uploads/applied-mathematics/second-year/AM1005");
        let temp_files: Vec<_> = std::fs::read_dir(parent)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.starts_with(".tmp-"))
            .collect();
        assert!(temp_files.is_empty(), "{temp_files:?}");
    }

    #[test]
    fn rejects_traversal_keys() {
        for bad in ["", "/etc/passwd", "uploads/../secret", "a\\b", "a\nb"] {
            assert!(DiskBackend::ensure_key_safe(bad).is_err(), "{bad:?}");
        }
        assert!(DiskBackend::ensure_key_safe("uploads/x/y.pdf").is_ok());
    }

    #[tokio::test]
    async fn probe_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().join("bucket"));
        backend.probe().await.unwrap();
        assert_eq!(std::fs::read_dir(backend.base_path()).unwrap().count(), 0);
    }
}
