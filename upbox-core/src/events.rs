use notify::{
    event::{CreateKind, ModifyKind},
    EventKind,
};
use std::path::{Path, PathBuf};

/// Filesystem change that qualifies for dispatch into the upload path.
/// Removes and renames do not qualify; the periodic reconciliation pass is
/// the only mechanism that reacts to anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FsEvent {
    Create(PathBuf),
    Modify(PathBuf),
    MkDir(PathBuf),
}

impl FsEvent {
    pub fn path(&self) -> &Path {
        match self {
            FsEvent::Create(p) | FsEvent::Modify(p) | FsEvent::MkDir(p) => p,
        }
    }
}

/// Convert a notify::Event into zero or more qualifying events.
pub fn qualifying_events(event: notify::Event) -> Vec<FsEvent> {
    let mut out = Vec::new();
    match event.kind {
        EventKind::Create(CreateKind::File) | EventKind::Create(CreateKind::Any) => {
            for p in event.paths {
                out.push(FsEvent::Create(p));
            }
        }
        EventKind::Create(CreateKind::Folder) => {
            for p in event.paths {
                out.push(FsEvent::MkDir(p));
            }
        }
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Metadata(_)) => {
            for p in event.paths {
                out.push(FsEvent::Modify(p));
            }
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, RemoveKind};

    #[test]
    fn create_and_modify_qualify() {
        let ev = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/watch/a.mkv"));
        assert_eq!(
            qualifying_events(ev),
            vec![FsEvent::Create(PathBuf::from("/watch/a.mkv"))]
        );

        let ev = notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/watch/a.mkv"));
        assert_eq!(
            qualifying_events(ev),
            vec![FsEvent::Modify(PathBuf::from("/watch/a.mkv"))]
        );
    }

    #[test]
    fn removes_do_not_qualify() {
        let ev = notify::Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/watch/a.mkv"));
        assert!(qualifying_events(ev).is_empty());
    }
}
