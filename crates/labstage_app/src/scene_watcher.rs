// SPDX-License-Identifier: MIT OR Apache-2.0
//! Watches a scene file on disk so it can be reloaded while being authored.
//!
//! The parent directory is watched rather than the file itself, since most
//! editors save by writing a new file and renaming it over the old one.

use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

/// Debounce applied to file system events
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// Change to the watched scene file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneFileEvent {
    /// File was written or recreated
    Changed,
    /// File was removed
    Removed,
    /// Watcher reported an error
    Error(String),
}

/// Debounced watcher for one scene file
pub struct SceneWatcher {
    _watcher: Debouncer<RecommendedWatcher, RecommendedCache>,
    event_rx: Receiver<SceneFileEvent>,
    path: PathBuf,
}

impl SceneWatcher {
    /// Start watching `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, notify::Error> {
        let path = std::path::absolute(path.as_ref())?;
        let (event_tx, event_rx) = mpsc::channel();

        let scene = path.clone();
        let mut watcher = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    if !event.paths.iter().any(|p| is_scene_path(&scene, p)) {
                        continue;
                    }
                    let mapped = match event.kind {
                        EventKind::Create(_) | EventKind::Modify(_) => SceneFileEvent::Changed,
                        EventKind::Remove(_) => SceneFileEvent::Removed,
                        EventKind::Any | EventKind::Access(_) | EventKind::Other => continue,
                    };
                    let _ = event_tx.send(mapped);
                }
            }
            Err(errors) => {
                for error in errors {
                    let _ = event_tx.send(SceneFileEvent::Error(error.to_string()));
                }
            }
        })?;

        let directory = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;
        tracing::info!("Watching scene file {:?}", path);

        Ok(Self {
            _watcher: watcher,
            event_rx,
            path,
        })
    }

    /// Watched file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collapse pending events into the one that matters (non-blocking).
    ///
    /// Several writes within a frame become a single `Changed`; the last of
    /// `Changed` and `Removed` wins.
    pub fn poll(&self) -> Option<SceneFileEvent> {
        let mut latest = None;
        loop {
            match self.event_rx.try_recv() {
                Ok(SceneFileEvent::Error(message)) => {
                    tracing::warn!("Scene watcher error: {}", message);
                }
                Ok(event) => latest = Some(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("Scene watcher channel disconnected");
                    break;
                }
            }
        }
        latest
    }
}

fn is_scene_path(scene: &Path, candidate: &Path) -> bool {
    candidate == scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_scene_path() {
        let scene = Path::new("/tmp/scenes/prism.json");
        assert!(is_scene_path(scene, Path::new("/tmp/scenes/prism.json")));
        assert!(!is_scene_path(scene, Path::new("/tmp/scenes/prism.json.swp")));
        assert!(!is_scene_path(scene, Path::new("/tmp/other/prism.json")));
    }

    #[test]
    fn test_poll_without_changes() {
        let dir = std::env::temp_dir().join("labstage-watcher-test");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("scene.json");
        std::fs::write(&file, "{}").unwrap();

        let watcher = SceneWatcher::new(&file).unwrap();
        assert!(watcher.path().is_absolute());
        assert_eq!(watcher.poll(), None);
    }
}
