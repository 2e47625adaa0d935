use crate::config::Pattern;
use globset::{Glob, GlobSet, GlobSetBuilder};

const TEMP_SUFFIXES: &[&str] = &["~", ".tmp", ".part", ".swp", ".crdownload"];

/// Hidden files and in-progress editor/download artifacts are never synced,
/// regardless of the configured allow-list.
pub fn is_transient(name: &str) -> bool {
    name.starts_with('.') || TEMP_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Runtime allow-list compiled from the configured include patterns.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: GlobSet,
}

impl PathFilter {
    /// Build a filter from a pattern list. Empty list means "include all".
    pub fn new(include: &[Pattern]) -> Self {
        let mut builder = GlobSetBuilder::new();
        // compile patterns, ignore compile errors individually
        for pat in include {
            if let Ok(g) = Glob::new(&pat.0) {
                builder.add(g);
            }
        }
        Self {
            include: builder
                .build()
                .unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap()),
        }
    }

    /// Determine whether a file with the given name should be uploaded.
    pub fn check(&self, name: &str) -> bool {
        if is_transient(name) {
            return false;
        }
        self.include.len() == 0 || self.include.is_match(name)
    }
}
