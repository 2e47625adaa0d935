use async_trait::async_trait;
use thiserror::Error;

/// Write-mode policy for committing a file on the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if an object already exists at the target path.
    Add,
    /// Replace any existing object at the target path.
    Overwrite,
}

/// Opaque token identifying one in-progress session upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Metadata the remote store reports for a committed file or folder.
#[derive(Debug, Clone)]
pub struct RemoteMetadata {
    pub name: String,
    pub path_display: String,
    pub size: u64,
}

/// Failure reported by the storage backend, carrying its human-readable
/// message (folder exists, quota exceeded, forwarded network failure, ...).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Object-storage backend as seen by the upload pipeline.
///
/// `client_modified` values are seconds since the Unix epoch, already
/// truncated to whole-second precision by the caller.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn create_folder(&self, path: &str) -> Result<RemoteMetadata, RemoteError>;

    /// Single-shot atomic upload for payloads that fit in one chunk.
    async fn upload_file(
        &self,
        data: Vec<u8>,
        path: &str,
        mode: WriteMode,
        client_modified: u64,
    ) -> Result<RemoteMetadata, RemoteError>;

    /// Open a session with its first chunk.
    async fn session_start(&self, chunk: Vec<u8>) -> Result<SessionId, RemoteError>;

    /// Append one chunk at the given byte offset.
    async fn session_append(
        &self,
        session: &SessionId,
        offset: u64,
        chunk: Vec<u8>,
    ) -> Result<(), RemoteError>;

    /// Send the final chunk and commit the file at `path`.
    async fn session_finish(
        &self,
        session: &SessionId,
        offset: u64,
        chunk: Vec<u8>,
        path: &str,
        mode: WriteMode,
    ) -> Result<RemoteMetadata, RemoteError>;
}
