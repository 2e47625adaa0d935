use std::path::Path;

/// Maps local (subfolder, name) pairs onto canonical remote paths.
///
/// Remote paths are always absolute, start with the configured remote folder
/// and never contain doubled separators.
#[derive(Debug, Clone)]
pub struct RemotePathMapper {
    folder: String,
}

impl RemotePathMapper {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// `normalize("season/1", "a.mkv")` with folder `"videos"` yields
    /// `/videos/season/1/a.mkv`. Local separators are translated and runs of
    /// duplicate separators collapse to one, so re-normalizing an already
    /// clean path is a no-op.
    pub fn normalize(&self, subfolder: &str, name: &str) -> String {
        let raw = format!(
            "/{}/{}/{}",
            self.folder,
            subfolder.replace('\\', "/"),
            name
        );
        collapse_separators(raw)
    }
}

fn collapse_separators(mut path: String) -> String {
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    path
}

/// Derive the (subfolder, name) pair of a changed path relative to the
/// watched root. The subfolder is empty at the root itself. Returns `None`
/// for the root and for paths outside it.
pub fn split_local(root: &Path, changed: &Path) -> Option<(String, String)> {
    let rel = changed.strip_prefix(root).ok()?;
    let name = rel.file_name()?.to_string_lossy().into_owned();
    let subfolder = rel
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    Some((subfolder, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalize_root_file() {
        let mapper = RemotePathMapper::new("videos");
        assert_eq!(mapper.normalize("", "a.mkv"), "/videos/a.mkv");
    }

    #[test]
    fn normalize_collapses_doubled_separators() {
        let mapper = RemotePathMapper::new("videos/");
        let out = mapper.normalize("season//one/", "//a.mkv");
        assert_eq!(out, "/videos/season/one/a.mkv");
        assert!(!out.contains("//"));
    }

    #[test]
    fn normalize_is_stable_on_clean_output() {
        let mapper = RemotePathMapper::new("videos");
        let once = mapper.normalize("season/1", "a.mkv");
        assert_eq!(collapse_separators(once.clone()), once);
    }

    #[test]
    fn normalize_translates_local_separators() {
        let mapper = RemotePathMapper::new("videos");
        assert_eq!(
            mapper.normalize("season\\one", "a.mkv"),
            "/videos/season/one/a.mkv"
        );
    }

    #[test]
    fn normalize_with_empty_folder() {
        let mapper = RemotePathMapper::new("");
        assert_eq!(mapper.normalize("", "a.mkv"), "/a.mkv");
    }

    #[test]
    fn split_local_at_root_level() {
        let root = PathBuf::from("/watch");
        let (sub, name) = split_local(&root, &root.join("a.mkv")).unwrap();
        assert_eq!(sub, "");
        assert_eq!(name, "a.mkv");
    }

    #[test]
    fn split_local_nested() {
        let root = PathBuf::from("/watch");
        let (sub, name) = split_local(&root, &root.join("season/1/a.mkv")).unwrap();
        assert_eq!(sub, "season/1");
        assert_eq!(name, "a.mkv");
    }

    #[test]
    fn split_local_rejects_root_and_foreign_paths() {
        let root = PathBuf::from("/watch");
        assert!(split_local(&root, &root).is_none());
        assert!(split_local(&root, Path::new("/elsewhere/a.mkv")).is_none());
    }
}
