use crate::error::IndexerError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use ragcode_domain::validate;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A filesystem change relevant to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    Create,
    Modify,
    Delete,
}

/// Recursive filesystem watcher with per-path debouncing.
///
/// Bursts of events on the same path collapse into a single dispatch
/// (last event wins within the debounce window, 500 ms by default), and
/// debounced events are delivered through one channel so the consumer
/// handles them serially.
pub struct Watcher {
    watcher: RecommendedWatcher,
    raw: Option<UnboundedReceiver<(PathBuf, FileEvent)>>,
    debounce: Duration,
}

impl Watcher {
    pub fn new(debounce: Duration) -> Result<Self, IndexerError> {
        let debounce = if debounce.is_zero() {
            Duration::from_millis(500)
        } else {
            debounce
        };

        let (tx, rx) = unbounded_channel();
        let watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let Ok(event) = result else { return };
            let Some(file_event) = classify(&event.kind) else {
                return;
            };
            for path in event.paths {
                if is_noise(&path) {
                    continue;
                }
                let _ = tx.send((path, file_event));
            }
        })?;

        Ok(Self {
            watcher,
            raw: Some(rx),
            debounce,
        })
    }

    /// Watch a directory recursively. The usual noise (hidden directories,
    /// `node_modules`, `vendor`) is filtered at event time.
    pub fn watch(&mut self, path: &Path) -> Result<(), IndexerError> {
        validate::directory_path(&path.to_string_lossy())?;
        self.watcher.watch(path, RecursiveMode::Recursive)?;
        info!(path = %path.display(), "watching directory recursively");
        Ok(())
    }

    /// Start debouncing and hand back the collapsed event stream. The
    /// watcher itself must stay alive for events to keep flowing.
    pub fn debounced_events(&mut self) -> UnboundedReceiver<(PathBuf, FileEvent)> {
        let raw = self.raw.take().expect("debounced_events called twice");
        spawn_debouncer(raw, self.debounce)
    }
}

fn classify(kind: &EventKind) -> Option<FileEvent> {
    match kind {
        EventKind::Create(_) => Some(FileEvent::Create),
        EventKind::Modify(_) => Some(FileEvent::Modify),
        EventKind::Remove(_) => Some(FileEvent::Delete),
        _ => None,
    }
}

/// Paths under hidden directories, `node_modules`, or `vendor` are noise.
fn is_noise(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || name == "node_modules" || name == "vendor"
        }
        _ => false,
    })
}

/// Collapse raw events per path: each new event restarts that path's timer,
/// and only the last event within the window is delivered.
fn spawn_debouncer(
    mut raw: UnboundedReceiver<(PathBuf, FileEvent)>,
    debounce: Duration,
) -> UnboundedReceiver<(PathBuf, FileEvent)> {
    let (out_tx, out_rx) = unbounded_channel();
    let pending: Arc<Mutex<HashMap<PathBuf, u64>>> = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(async move {
        let mut generation: u64 = 0;
        while let Some((path, event)) = raw.recv().await {
            generation += 1;
            debug!(path = %path.display(), ?event, "file event detected");

            pending.lock().await.insert(path.clone(), generation);
            schedule_dispatch(
                Arc::clone(&pending),
                out_tx.clone(),
                path,
                event,
                generation,
                debounce,
            );
        }
    });

    out_rx
}

fn schedule_dispatch(
    pending: Arc<Mutex<HashMap<PathBuf, u64>>>,
    out_tx: UnboundedSender<(PathBuf, FileEvent)>,
    path: PathBuf,
    event: FileEvent,
    generation: u64,
    debounce: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(debounce).await;

        let mut guard = pending.lock().await;
        // A newer event for this path superseded us.
        if guard.get(&path) != Some(&generation) {
            return;
        }
        guard.remove(&path);
        drop(guard);

        let _ = out_tx.send((path, event));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_to_the_last_event() {
        let (tx, raw) = unbounded_channel();
        let mut debounced = spawn_debouncer(raw, Duration::from_millis(500));

        let path = PathBuf::from("/repo/src/main.rs");
        tx.send((path.clone(), FileEvent::Create)).unwrap();
        tx.send((path.clone(), FileEvent::Modify)).unwrap();
        tx.send((path.clone(), FileEvent::Modify)).unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;

        let (got_path, got_event) = debounced.recv().await.unwrap();
        assert_eq!(got_path, path);
        assert_eq!(got_event, FileEvent::Modify);

        // Nothing else arrives for the burst.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(debounced.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_paths_debounce_independently() {
        let (tx, raw) = unbounded_channel();
        let mut debounced = spawn_debouncer(raw, Duration::from_millis(500));

        tx.send((PathBuf::from("/a.rs"), FileEvent::Modify)).unwrap();
        tx.send((PathBuf::from("/b.rs"), FileEvent::Delete)).unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;

        let mut received = vec![
            debounced.recv().await.unwrap(),
            debounced.recv().await.unwrap(),
        ];
        received.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(received[0], (PathBuf::from("/a.rs"), FileEvent::Modify));
        assert_eq!(received[1], (PathBuf::from("/b.rs"), FileEvent::Delete));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_events_both_dispatch() {
        let (tx, raw) = unbounded_channel();
        let mut debounced = spawn_debouncer(raw, Duration::from_millis(500));

        let path = PathBuf::from("/repo/lib.rs");
        tx.send((path.clone(), FileEvent::Create)).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        tx.send((path.clone(), FileEvent::Modify)).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(debounced.recv().await.unwrap().1, FileEvent::Create);
        assert_eq!(debounced.recv().await.unwrap().1, FileEvent::Modify);
    }

    #[test]
    fn noise_paths_are_filtered() {
        assert!(is_noise(Path::new("/repo/node_modules/pkg/index.js")));
        assert!(is_noise(Path::new("/repo/vendor/lib.go")));
        assert!(is_noise(Path::new("/repo/.git/objects/ab")));
        assert!(!is_noise(Path::new("/repo/src/main.rs")));
    }

    #[test]
    fn only_relevant_event_kinds_classify() {
        use notify::event::{CreateKind, ModifyKind, RemoveKind};

        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(FileEvent::Create)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Any)),
            Some(FileEvent::Modify)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(FileEvent::Delete)
        );
        assert_eq!(classify(&EventKind::Access(notify::event::AccessKind::Any)), None);
    }
}
