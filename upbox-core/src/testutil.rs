//! Hand-rolled remote-store doubles shared by the unit tests.

use crate::remote::{RemoteError, RemoteMetadata, RemoteStore, SessionId, WriteMode};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CreateFolder {
        path: String,
    },
    Upload {
        path: String,
        bytes: usize,
        mode: WriteMode,
        client_modified: u64,
    },
    SessionStart {
        bytes: usize,
    },
    SessionAppend {
        session: String,
        offset: u64,
        bytes: usize,
    },
    SessionFinish {
        session: String,
        offset: u64,
        bytes: usize,
        path: String,
        mode: WriteMode,
    },
}

/// Records every call; optionally fails uploads to exercise error paths.
#[derive(Default)]
pub struct RecordingRemote {
    calls: Mutex<Vec<RemoteCall>>,
    fail_uploads: AtomicBool,
    next_session: AtomicU64,
}

impl RecordingRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn should_fail(&self) -> bool {
        self.fail_uploads.load(Ordering::SeqCst)
    }

    fn meta(path: &str) -> RemoteMetadata {
        RemoteMetadata {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path_display: path.to_string(),
            size: 0,
        }
    }
}

#[async_trait]
impl RemoteStore for RecordingRemote {
    async fn create_folder(&self, path: &str) -> Result<RemoteMetadata, RemoteError> {
        self.record(RemoteCall::CreateFolder { path: path.into() });
        Ok(Self::meta(path))
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        path: &str,
        mode: WriteMode,
        client_modified: u64,
    ) -> Result<RemoteMetadata, RemoteError> {
        self.record(RemoteCall::Upload {
            path: path.into(),
            bytes: data.len(),
            mode,
            client_modified,
        });
        if self.should_fail() {
            return Err(RemoteError::new("injected upload failure"));
        }
        Ok(Self::meta(path))
    }

    async fn session_start(&self, chunk: Vec<u8>) -> Result<SessionId, RemoteError> {
        if self.should_fail() {
            return Err(RemoteError::new("injected session failure"));
        }
        self.record(RemoteCall::SessionStart { bytes: chunk.len() });
        let n = self.next_session.fetch_add(1, Ordering::SeqCst);
        Ok(SessionId(format!("session-{n}")))
    }

    async fn session_append(
        &self,
        session: &SessionId,
        offset: u64,
        chunk: Vec<u8>,
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::SessionAppend {
            session: session.0.clone(),
            offset,
            bytes: chunk.len(),
        });
        Ok(())
    }

    async fn session_finish(
        &self,
        session: &SessionId,
        offset: u64,
        chunk: Vec<u8>,
        path: &str,
        mode: WriteMode,
    ) -> Result<RemoteMetadata, RemoteError> {
        self.record(RemoteCall::SessionFinish {
            session: session.0.clone(),
            offset,
            bytes: chunk.len(),
            path: path.into(),
            mode,
        });
        Ok(Self::meta(path))
    }
}

/// Every upload waits on a shared barrier, so a test only completes when the
/// expected number of uploads are in flight at the same time.
pub struct RendezvousRemote {
    barrier: Barrier,
}

impl RendezvousRemote {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            barrier: Barrier::new(parties),
        })
    }
}

#[async_trait]
impl RemoteStore for RendezvousRemote {
    async fn create_folder(&self, path: &str) -> Result<RemoteMetadata, RemoteError> {
        Ok(RecordingRemote::meta(path))
    }

    async fn upload_file(
        &self,
        _data: Vec<u8>,
        path: &str,
        _mode: WriteMode,
        _client_modified: u64,
    ) -> Result<RemoteMetadata, RemoteError> {
        self.barrier.wait().await;
        Ok(RecordingRemote::meta(path))
    }

    async fn session_start(&self, _chunk: Vec<u8>) -> Result<SessionId, RemoteError> {
        Ok(SessionId("rendezvous".into()))
    }

    async fn session_append(
        &self,
        _session: &SessionId,
        _offset: u64,
        _chunk: Vec<u8>,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn session_finish(
        &self,
        _session: &SessionId,
        _offset: u64,
        _chunk: Vec<u8>,
        path: &str,
        _mode: WriteMode,
    ) -> Result<RemoteMetadata, RemoteError> {
        Ok(RecordingRemote::meta(path))
    }
}
