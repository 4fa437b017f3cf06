use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use trayicons_config::IconEntry;

const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(500);

/// A watched file that was modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// An icon source changed and `dst` should be regenerated.
    Source { src: PathBuf, dst: PathBuf },
    /// The icon shown in the tray was rewritten.
    TrayIcon(PathBuf),
}

/// Maps watched source files to the icon generated from them.
#[derive(Debug, Default)]
pub struct SourceMap {
    sources: HashMap<PathBuf, PathBuf>,
    tray_icon: Option<PathBuf>,
    dirs: HashSet<PathBuf>,
}

impl SourceMap {
    /// Adds `src`, returning its parent directory if that directory isn't watched yet.
    pub fn insert(&mut self, src: &Path, dst: &Path) -> anyhow::Result<Option<PathBuf>> {
        let src = dunce::canonicalize(src)
            .with_context(|| format!("Failed to resolve '{}'", src.display()))?;
        let dir = src
            .parent()
            .with_context(|| format!("'{}' has no parent directory", src.display()))?
            .to_path_buf();

        self.sources.insert(src, dst.to_path_buf());
        Ok(self.dirs.insert(dir.clone()).then_some(dir))
    }

    /// Tracks the tray icon file, which may not exist yet but its directory must.
    /// Returns its directory if that directory isn't watched yet.
    pub fn set_tray_icon(&mut self, path: &Path) -> anyhow::Result<Option<PathBuf>> {
        let path = canonicalize_in_dir(path)
            .with_context(|| format!("Failed to resolve '{}'", path.display()))?;
        let dir = path
            .parent()
            .with_context(|| format!("'{}' has no parent directory", path.display()))?
            .to_path_buf();

        self.tray_icon = Some(path);
        Ok(self.dirs.insert(dir.clone()).then_some(dir))
    }

    /// Destination icon for a changed `path`, if it is one of the watched sources.
    pub fn destination(&self, path: &Path) -> Option<&Path> {
        self.sources
            .get(path)
            .or_else(|| {
                dunce::canonicalize(path)
                    .ok()
                    .and_then(|path| self.sources.get(&path))
            })
            .map(PathBuf::as_path)
    }

    pub fn is_tray_icon(&self, path: &Path) -> bool {
        let Some(tray_icon) = &self.tray_icon else {
            return false;
        };

        path == tray_icon
            || canonicalize_in_dir(path)
                .map(|path| &path == tray_icon)
                .unwrap_or(false)
    }

    /// Classifies a changed `path`, the tray icon taking precedence.
    pub fn change(&self, path: &Path) -> Option<Change> {
        if self.is_tray_icon(path) {
            return Some(Change::TrayIcon(path.to_path_buf()));
        }

        self.destination(path).map(|dst| Change::Source {
            src: path.to_path_buf(),
            dst: dst.to_path_buf(),
        })
    }

    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Canonicalizes the parent of `path` and joins the file name back,
/// so files that were deleted or not yet written still resolve.
fn canonicalize_in_dir(path: &Path) -> std::io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok(dunce::canonicalize(dir)?.join(name))
}

/// Watches every directory in `dirs`, skipping the ones that fail.
/// Returns how many are being watched.
pub fn watch_dirs<W: Watcher + ?Sized>(watcher: &mut W, dirs: &[PathBuf]) -> usize {
    let mut watched = 0;
    for dir in dirs {
        if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            tracing::error!("Failed to watch directory '{}': {e}", dir.display());
            continue;
        }
        tracing::info!("Watching directory '{}' for icon changes...", dir.display());
        watched += 1;
    }
    watched
}

/// Watches icon sources and the tray icon, reporting every [`Change`].
pub struct SourceWatcher {
    #[allow(unused)]
    debouncer: Debouncer<RecommendedWatcher>,
}

impl SourceWatcher {
    pub fn new<F>(icons: &[IconEntry], tray_icon: Option<&Path>, on_change: F) -> anyhow::Result<Self>
    where
        F: Fn(Change) + Send + 'static,
    {
        let mut map = SourceMap::default();
        let mut dirs = Vec::new();
        for icon in icons {
            match map.insert(&icon.src, &icon.dst) {
                Ok(Some(dir)) => dirs.push(dir),
                Ok(None) => {}
                Err(e) => tracing::error!("Not watching icon source: {e:#}"),
            }
        }

        if let Some(path) = tray_icon {
            match map.set_tray_icon(path) {
                Ok(Some(dir)) => dirs.push(dir),
                Ok(None) => {}
                Err(e) => tracing::error!("Not watching tray icon: {e:#}"),
            }
        }

        let mut debouncer = new_debouncer(DEBOUNCE_TIMEOUT, move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    for event in events {
                        if let Some(change) = map.change(&event.path) {
                            tracing::info!("Detected change in: {}", event.path.display());
                            on_change(change);
                        }
                    }
                }
                Err(e) => tracing::error!("Source watcher error: {e}"),
            }
        })?;

        watch_dirs(debouncer.watcher(), &dirs);

        Ok(Self { debouncer })
    }
}
