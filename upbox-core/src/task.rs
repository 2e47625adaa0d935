use crate::config::{OverwritePolicy, SyncTarget};
use crate::events::{qualifying_events, FsEvent};
use crate::filter::{is_transient, PathFilter};
use crate::path::{split_local, RemotePathMapper};
use crate::remote::RemoteStore;
use crate::scanner::ReconciliationScanner;
use crate::uploader::{ChunkedUploader, UploadTask};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Lifecycle of the change watcher: `Stopped -> Starting -> Running ->
/// Stopping -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone)]
pub enum TaskCommand {
    Stop,
}

/// Public handle returned to callers for controlling a running sync task.
#[derive(Debug)]
pub struct SyncTaskHandle {
    target: SyncTarget,
    ctrl_tx: mpsc::Sender<TaskCommand>,
    state_rx: watch::Receiver<WatchState>,
    join: JoinHandle<()>,
}

impl SyncTaskHandle {
    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    pub fn state(&self) -> WatchState {
        *self.state_rx.borrow()
    }

    /// Signal shutdown and block until the notification listener and the
    /// reconciliation timer have both fully terminated.
    pub async fn stop(self) {
        let _ = self.ctrl_tx.send(TaskCommand::Stop).await;
        let _ = self.join.await;
    }
}

/// Spawn the full pipeline for one target: startup reconciliation pass,
/// recursive change watcher and periodic catch-up scans, all sharing one
/// upload path.
pub fn spawn_task<R: RemoteStore>(target: SyncTarget, remote: Arc<R>) -> SyncTaskHandle {
    let (ctrl_tx, ctrl_rx) = mpsc::channel(4);
    let (state_tx, state_rx) = watch::channel(WatchState::Stopped);
    let task = SyncTask::new(target.clone(), remote);
    let join = tokio::spawn(task.run(ctrl_rx, state_tx));
    SyncTaskHandle {
        target,
        ctrl_tx,
        state_rx,
        join,
    }
}

struct SyncTask<R: RemoteStore> {
    target: SyncTarget,
    filter: Arc<PathFilter>,
    mapper: RemotePathMapper,
    uploader: Arc<ChunkedUploader<R>>,
}

impl<R: RemoteStore> SyncTask<R> {
    fn new(target: SyncTarget, remote: Arc<R>) -> Self {
        let filter = Arc::new(PathFilter::new(&target.include));
        let mapper = RemotePathMapper::new(target.remote_folder.clone());
        let uploader = Arc::new(ChunkedUploader::new(remote));
        Self {
            target,
            filter,
            mapper,
            uploader,
        }
    }

    async fn run(self, mut ctrl_rx: mpsc::Receiver<TaskCommand>, state_tx: watch::Sender<WatchState>) {
        let _ = state_tx.send(WatchState::Starting);

        let scanner = Arc::new(ReconciliationScanner::new(
            self.target.local_root.clone(),
            self.uploader.clone(),
            self.mapper.clone(),
            self.filter.clone(),
        ));

        // One blocking pass before live watching begins. PreferLocal is the
        // only policy that clobbers existing remote copies.
        let overwrite = self.target.overwrite == OverwritePolicy::PreferLocal;
        info!(overwrite, "startup reconciliation");
        scanner.scan(overwrite, false).await;

        // Live filesystem events flow through this channel from notify's
        // worker thread into the dispatch loop.
        let (event_tx, mut event_rx) = mpsc::channel::<FsEvent>(1024);
        let watcher = match self.spawn_watcher(event_tx) {
            Ok(w) => w,
            Err(e) => {
                error!("failed to watch {}: {e}", self.target.local_root.display());
                let _ = state_tx.send(WatchState::Stopped);
                return;
            }
        };

        // Single shutdown signal shared by the background activities.
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        // Periodic catch-up pass, pruning files already uploaded. Exits
        // within one interval of the shutdown signal.
        let timer = {
            let scanner = scanner.clone();
            let interval = self.target.interval();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // The first tick completes immediately; the startup pass
                // already ran, so skip it.
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            debug!("periodic reconciliation");
                            scanner.scan(false, true).await;
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
            })
        };

        let _ = state_tx.send(WatchState::Running);
        let mut uploads: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                cmd = ctrl_rx.recv() => match cmd {
                    Some(TaskCommand::Stop) | None => break,
                },
                Some(event) = event_rx.recv() => self.dispatch(event, &mut uploads),
                Some(res) = uploads.join_next(), if !uploads.is_empty() => {
                    if let Err(e) = res {
                        warn!("upload task panicked: {e}");
                    }
                }
            }
        }

        let _ = state_tx.send(WatchState::Stopping);
        // Fixed shutdown order: timer first, then the listener, then drain
        // in-flight uploads so none is interrupted mid-transfer.
        let _ = shutdown_tx.send(true);
        if let Err(e) = timer.await {
            warn!("timer loop join failed: {e}");
        }
        drop(watcher);
        event_rx.close();
        while uploads.join_next().await.is_some() {}
        let _ = state_tx.send(WatchState::Stopped);
        debug!("watcher stopped");
    }

    /// Route one live event into the shared upload path. Live uploads never
    /// clobber an existing remote copy.
    fn dispatch(&self, event: FsEvent, uploads: &mut JoinSet<()>) {
        let Some((subfolder, name)) = split_local(&self.target.local_root, event.path()) else {
            return;
        };
        // Folder creation bypasses the file allow-list; hidden directories
        // are still skipped.
        let qualifies = match &event {
            FsEvent::MkDir(_) => !is_transient(&name),
            _ => self.filter.check(&name),
        };
        if !qualifies {
            return;
        }

        let task = UploadTask {
            local_path: event.path().to_path_buf(),
            subfolder,
            name,
            overwrite: false,
        };
        let uploader = self.uploader.clone();
        let mapper = self.mapper.clone();
        uploads.spawn(async move {
            debug!(file = %task.local_path.display(), "live upload");
            if let Err(e) = uploader.run(&mapper, &task).await {
                warn!("upload of {} failed: {e}", task.local_path.display());
            }
        });
    }

    fn spawn_watcher(&self, event_tx: mpsc::Sender<FsEvent>) -> notify::Result<RecommendedWatcher> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for ev in qualifying_events(event) {
                        let _ = event_tx.blocking_send(ev);
                    }
                }
                Err(e) => warn!("watch error: {e}"),
            },
            notify::Config::default(),
        )?;
        watcher.watch(&self.target.local_root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }
}
