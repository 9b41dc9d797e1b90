//! Mapping file watcher for hot reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::lifecycle::LifecycleEvent;

/// Watches the mapping file and asks the coordinator to reload on change.
///
/// The parent directory is watched rather than the file itself, so editors
/// that save by renaming a temporary file over the old one are still seen.
pub struct MappingWatcher {
    dir: PathBuf,
    file_name: Option<OsString>,
    events: mpsc::Sender<LifecycleEvent>,
}

impl MappingWatcher {
    pub fn new(path: &Path, events: mpsc::Sender<LifecycleEvent>) -> Self {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self {
            dir,
            file_name: path.file_name().map(OsString::from),
            events,
        }
    }

    /// Start watching in notify's background thread. Dropping the returned
    /// watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let events = self.events;
        let file_name = self.file_name;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    if !touches(&event, file_name.as_deref()) {
                        return;
                    }
                    tracing::info!(paths = ?event.paths, "Mapping file change detected");
                    match events.try_send(LifecycleEvent::Reload { ack: None }) {
                        Ok(()) | Err(TrySendError::Closed(_)) => {}
                        Err(TrySendError::Full(_)) => {
                            tracing::debug!("Reload queue full; change will be picked up by a pending reload");
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = ?self.dir, "Mapping file watcher started");
        Ok(watcher)
    }
}

fn touches(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    match file_name {
        Some(name) => event.paths.iter().any(|p| p.file_name() == Some(name)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind};

    #[test]
    fn bare_file_name_watches_working_directory() {
        let (tx, _rx) = mpsc::channel(1);
        let watcher = MappingWatcher::new(Path::new("urls.txt"), tx);
        assert_eq!(watcher.dir, PathBuf::from("."));
        assert_eq!(watcher.file_name.as_deref(), Some(std::ffi::OsStr::new("urls.txt")));
    }

    #[test]
    fn only_events_for_the_mapping_file_count() {
        let event = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/srv/urls.txt"));
        assert!(touches(&event, Some(std::ffi::OsStr::new("urls.txt"))));
        assert!(!touches(&event, Some(std::ffi::OsStr::new("other.txt"))));
    }

    #[tokio::test]
    async fn writing_the_file_queues_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "/a http://a.test\n").unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let _watcher = MappingWatcher::new(&path, tx).run().unwrap();

        std::fs::write(&path, "/a http://b.test\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, LifecycleEvent::Reload { ack: None }));
    }
}
