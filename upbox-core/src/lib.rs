//! Core library for upbox – background directory-to-cloud upload agent.

mod config;
mod error;
mod events;
mod filter;
mod path;
mod remote;
mod scanner;
mod task;
mod uploader;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{OverwritePolicy, Pattern, SyncTarget};
pub use error::UploadError;
pub use events::{qualifying_events, FsEvent};
pub use filter::PathFilter;
pub use path::{split_local, RemotePathMapper};
pub use remote::{RemoteError, RemoteMetadata, RemoteStore, SessionId, WriteMode};
pub use scanner::ReconciliationScanner;
pub use task::{spawn_task, SyncTaskHandle, TaskCommand, WatchState};
pub use uploader::{ChunkedUploader, UploadTask, CHUNK_SIZE};
