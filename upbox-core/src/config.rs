use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Glob pattern (wrapper type for clarity)
/// Stored as plain String; compilation to `globset` happens in `PathFilter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern(pub String);

/// Which side wins when local and remote copies of a path both exist.
///
/// Only the upload direction is implemented: `PreferLocal` makes the startup
/// pass upload with overwrite write-mode, `PreferRemote` and `None` upload
/// with add write-mode so an existing remote copy is never clobbered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    #[default]
    None,
    PreferRemote,
    PreferLocal,
}

/// One watched directory mapped to one remote folder. Immutable for the
/// process lifetime, constructed once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTarget {
    pub local_root: PathBuf,
    pub remote_folder: String,
    /// Seconds between periodic reconciliation passes.
    #[serde(default = "SyncTarget::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub overwrite: OverwritePolicy,
    /// File-name allow-list. Empty means include everything.
    #[serde(default = "SyncTarget::default_include")]
    pub include: Vec<Pattern>,
}

impl SyncTarget {
    fn default_interval_secs() -> u64 {
        10
    }

    fn default_include() -> Vec<Pattern> {
        vec![Pattern("*.mkv".into())]
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
