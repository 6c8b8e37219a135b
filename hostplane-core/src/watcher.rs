//! File watching as a pass trigger.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error};

use crate::EngineError;

/// Calls back whenever one of the watched files is created, written or
/// removed. Watching stops when this is dropped.
///
/// Watches the parent directories, so a file replaced by rename or created
/// after startup is still seen.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn new<F>(paths: &[PathBuf], on_change: F) -> Result<Self, EngineError>
    where
        F: Fn(&Path) + Send + 'static,
    {
        let directories: BTreeSet<PathBuf> =
            paths.iter().map(|path| parent_of(path).to_path_buf()).collect();
        let watched = paths.to_vec();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in watched.iter().filter(|path| touches(&event, path)) {
                    debug!(path = %path.display(), kind = ?event.kind, "Watched file changed");
                    on_change(path);
                }
            }
            Err(e) => error!("Watch error: {e}"),
        })?;

        for directory in &directories {
            watcher.watch(directory, RecursiveMode::NonRecursive)?;
        }
        Ok(Self { _watcher: watcher })
    }
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn touches(event: &Event, watched: &Path) -> bool {
    event
        .paths
        .iter()
        .any(|path| path.file_name().is_some() && path.file_name() == watched.file_name())
}
