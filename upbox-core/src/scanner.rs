use crate::filter::PathFilter;
use crate::path::{split_local, RemotePathMapper};
use crate::remote::RemoteStore;
use crate::uploader::{ChunkedUploader, UploadTask};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Full-tree reconciliation: walks the watched root, uploads every file the
/// allow-list admits and optionally prunes local copies after the remote
/// store acknowledges them. Used once at startup and again on every timer
/// tick to catch anything the live watcher missed.
pub struct ReconciliationScanner<R: RemoteStore> {
    root: PathBuf,
    uploader: Arc<ChunkedUploader<R>>,
    mapper: RemotePathMapper,
    filter: Arc<PathFilter>,
}

impl<R: RemoteStore> ReconciliationScanner<R> {
    pub fn new(
        root: PathBuf,
        uploader: Arc<ChunkedUploader<R>>,
        mapper: RemotePathMapper,
        filter: Arc<PathFilter>,
    ) -> Self {
        Self {
            root,
            uploader,
            mapper,
            filter,
        }
    }

    /// Per-file failures are logged and left for the next pass; a local file
    /// is removed only after its upload is acknowledged successful.
    pub async fn scan(&self, overwrite: bool, remove_after_upload: bool) {
        info!(root = %self.root.display(), "start sync from host");
        for entry in walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some((subfolder, name)) = split_local(&self.root, path) else {
                continue;
            };
            if !self.filter.check(&name) {
                continue;
            }
            debug!(file = %path.display(), "uploading");
            let task = UploadTask {
                local_path: path.to_path_buf(),
                subfolder,
                name,
                overwrite,
            };
            match self.uploader.run(&self.mapper, &task).await {
                Ok(_) if remove_after_upload => {
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        warn!("failed to remove {} after upload: {e}", path.display());
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("upload of {} failed: {e}", path.display()),
            }
        }
    }
}
