use crate::remote::RemoteError;
use std::path::PathBuf;
use thiserror::Error;

/// Per-item upload failure. Callers log these at warning level and continue;
/// they never abort the watcher or the reconciliation loop.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("remote api error: {0}")]
    Remote(#[from] RemoteError),
    #[error("local io error on {path}: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    pub(crate) fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Local {
            path: path.into(),
            source,
        }
    }
}
