use crate::error::UploadError;
use crate::path::RemotePathMapper;
use crate::remote::{RemoteMetadata, RemoteStore, SessionId, WriteMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, UNIX_EPOCH};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Threshold between single-shot and session uploads (4 MiB).
pub const CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// One file (or folder) queued for upload.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub local_path: PathBuf,
    pub subfolder: String,
    pub name: String,
    pub overwrite: bool,
}

/// In-progress session upload. Owned for the duration of one large-file
/// upload and dropped on completion or error; an interrupted upload restarts
/// from byte 0 on the next attempt.
struct UploadSession {
    id: SessionId,
    offset: u64,
}

/// Uploads a single item to the remote store: direct single-shot for small
/// files, three-phase session for anything larger than one chunk. Stateless
/// per call, so concurrent uploads of distinct files are safe.
pub struct ChunkedUploader<R: RemoteStore> {
    remote: Arc<R>,
    chunk_size: u64,
}

impl<R: RemoteStore> ChunkedUploader<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self {
            remote,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Test constructor; the daemon always uses [`CHUNK_SIZE`].
    pub fn with_chunk_size(remote: Arc<R>, chunk_size: u64) -> Self {
        assert!(chunk_size > 0);
        Self { remote, chunk_size }
    }

    /// Resolve an [`UploadTask`] to its remote path and upload it. Both the
    /// reconciliation scanner and the live-event dispatcher route through
    /// here so the two paths cannot drift apart.
    pub async fn run(
        &self,
        mapper: &RemotePathMapper,
        task: &UploadTask,
    ) -> Result<RemoteMetadata, UploadError> {
        let remote_path = mapper.normalize(&task.subfolder, &task.name);
        self.upload(&task.local_path, &remote_path, task.overwrite).await
    }

    pub async fn upload(
        &self,
        local: &Path,
        remote_path: &str,
        overwrite: bool,
    ) -> Result<RemoteMetadata, UploadError> {
        let mode = if overwrite {
            WriteMode::Overwrite
        } else {
            WriteMode::Add
        };
        let meta = tokio::fs::metadata(local)
            .await
            .map_err(|e| UploadError::local(local, e))?;

        if meta.is_dir() {
            let created = self.remote.create_folder(remote_path).await?;
            debug!("uploaded as {}", created.name);
            return Ok(created);
        }

        let size = meta.len();
        let modified = meta.modified().map_err(|e| UploadError::local(local, e))?;
        // Whole-second wall-clock precision, as the remote stores it.
        let client_modified = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let started = Instant::now();
        let result = if size <= self.chunk_size {
            let data = tokio::fs::read(local)
                .await
                .map_err(|e| UploadError::local(local, e))?;
            self.remote
                .upload_file(data, remote_path, mode, client_modified)
                .await?
        } else {
            self.upload_in_session(local, size, remote_path, mode).await?
        };
        debug!(
            bytes = size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload complete"
        );
        debug!("uploaded as {}", result.name);
        Ok(result)
    }

    /// Three-phase session upload: start with the first chunk, append full
    /// chunks while more than one chunk remains, finish with the rest. Any
    /// phase error abandons the whole session; there is no resume.
    async fn upload_in_session(
        &self,
        local: &Path,
        size: u64,
        remote_path: &str,
        mode: WriteMode,
    ) -> Result<RemoteMetadata, UploadError> {
        let mut file = File::open(local)
            .await
            .map_err(|e| UploadError::local(local, e))?;

        let first = read_chunk(&mut file, self.chunk_size)
            .await
            .map_err(|e| UploadError::local(local, e))?;
        let mut session = UploadSession {
            offset: first.len() as u64,
            id: self.remote.session_start(first).await?,
        };

        loop {
            let chunk = read_chunk(&mut file, self.chunk_size)
                .await
                .map_err(|e| UploadError::local(local, e))?;
            let len = chunk.len() as u64;
            if len == 0 && session.offset < size {
                // The file shrank underneath us; the session is unusable.
                return Err(UploadError::local(
                    local,
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "file truncated during session upload",
                    ),
                ));
            }
            if session.offset + len >= size {
                return Ok(self
                    .remote
                    .session_finish(&session.id, session.offset, chunk, remote_path, mode)
                    .await?);
            }
            self.remote
                .session_append(&session.id, session.offset, chunk)
                .await?;
            session.offset += len;
        }
    }
}

async fn read_chunk(file: &mut File, limit: u64) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit as usize);
    let mut bounded = file.take(limit);
    bounded.read_to_end(&mut buf).await?;
    Ok(buf)
}
