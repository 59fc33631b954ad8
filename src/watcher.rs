// File: ./src/watcher.rs
//! Live reload of the Todo.txt file.
//!
//! A `notify` watcher on the file's directory forwards change signals into a
//! tokio channel. A background actor coalesces bursts of signals and asks the
//! provider to check the file, which reloads only on external edits.
use crate::error::{ProviderError, Result};
use crate::provider::TodoTxtProvider;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep_until};

/// Owns the filesystem subscription. Dropping it unsubscribes.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl SourceWatcher {
    /// Watches the directory holding `source` (non-recursively) and sends a
    /// signal for every create, modify or remove event on the file itself.
    pub fn new(source: &Path, tx: mpsc::UnboundedSender<()>) -> Result<Self> {
        let setup_err = |e: notify::Error| ProviderError::WatchSetupFailure {
            path: source.to_path_buf(),
            source: e,
        };

        let dir = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = source
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| setup_err(notify::Error::path_not_found()))?;

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                handle_notify_event(res, &file_name, &tx);
            },
            Config::default(),
        )
        .map_err(setup_err)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(setup_err)?;
        log::debug!("Watching {} for changes", dir.display());

        Ok(Self {
            _watcher: watcher,
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn handle_notify_event(
    res: std::result::Result<Event, notify::Error>,
    file_name: &OsString,
    tx: &mpsc::UnboundedSender<()>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            log::error!("File watcher error: {}", e);
            return;
        }
    };

    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    // Only the file itself; the lock and temp siblings have other names.
    if event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
    {
        log::trace!("Todo.txt change event: {:?}", event.kind);
        let _ = tx.send(());
    }
}

/// Handle to a running watch actor. Dropping it stops the actor.
pub struct WatchHandle {
    watcher: Option<SourceWatcher>,
    signal: mpsc::UnboundedSender<()>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// False when the filesystem watch could not be set up; the actor still
    /// runs and accepts manual signals.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Signals a change by hand, as if the watcher had seen one.
    pub fn notify_changed(&self) {
        let _ = self.signal.send(());
    }

    /// Unsubscribes from the filesystem and waits for the actor to finish.
    pub async fn shutdown(mut self) {
        self.watcher = None;
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            log::warn!("Watch actor ended abnormally: {}", e);
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.watcher = None;
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Starts watching the provider's file and spawns the reload actor.
///
/// A watch setup failure is reported through the provider's sink and the
/// returned handle runs without a filesystem subscription.
pub async fn spawn_watch_actor(
    provider: Arc<Mutex<TodoTxtProvider>>,
    debounce: Duration,
) -> WatchHandle {
    let (signal_tx, mut signal_rx) = mpsc::unbounded_channel::<()>();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let (source, sink) = {
        let guard = provider.lock().await;
        (guard.source_file().path().to_path_buf(), guard.sink())
    };

    let watcher = match SourceWatcher::new(&source, signal_tx.clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::warn!("Live reload disabled: {}", e);
            sink.report(e.summary(), &e.to_string());
            None
        }
    };

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                signal = signal_rx.recv() => {
                    if signal.is_none() {
                        break;
                    }

                    // Coalesce the burst (a rename usually yields several events)
                    let deadline = Instant::now() + debounce;
                    let mut stop = false;
                    loop {
                        tokio::select! {
                            _ = sleep_until(deadline) => break,
                            _ = &mut shutdown_rx => {
                                stop = true;
                                break;
                            }
                            more = signal_rx.recv() => {
                                if more.is_none() {
                                    break;
                                }
                            }
                        }
                    }
                    if stop {
                        break;
                    }

                    let mut guard = provider.lock().await;
                    match guard.handle_source_changed() {
                        Ok(true) => log::debug!("Reloaded after external change"),
                        Ok(false) => {}
                        // Already reported by the provider.
                        Err(e) => log::debug!("Reload after change failed: {}", e),
                    }
                }
            }
        }
        log::debug!("Watch actor stopped");
    });

    WatchHandle {
        watcher,
        signal: signal_tx,
        shutdown: Some(shutdown_tx),
        task: Some(task),
    }
}
