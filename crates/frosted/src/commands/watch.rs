//! Watch the content directory and refresh pages as they change.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use frosted_pages::{load_dir, page, Page, Pageset, ParserRegistry};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use super::config::ConfigFile;

/// Quiet period before a batch of changes is applied.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Run the watch command until interrupted.
pub async fn run(config: &ConfigFile) -> Result<()> {
    let root = fs::canonicalize(&config.content.dir)
        .with_context(|| format!("Failed to open {}", config.content.dir.display()))?;
    let registry = Arc::new(config.registry());

    let mut set = load_dir(&root, Arc::clone(&registry))?;
    let (_watcher, mut rx) = FileWatcher::new(&root, registry)?;

    tracing::info!("Watching {} ({} pages)", root.display(), set.len());

    loop {
        let first = tokio::select! {
            key = rx.recv() => key,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping");
                return Ok(());
            }
        };
        let Some(first) = first else {
            tracing::warn!("File watcher stopped");
            return Ok(());
        };

        let mut keys = BTreeSet::from([first]);
        while let Ok(Some(key)) = tokio::time::timeout(DEBOUNCE, rx.recv()).await {
            keys.insert(key);
        }

        set = tokio::task::spawn_blocking(move || {
            refresh_all(&mut set, &keys);
            set
        })
        .await?;
    }
}

fn refresh_all(set: &mut Pageset, keys: &BTreeSet<String>) {
    for key in keys {
        match set.refresh(key) {
            Ok(()) => tracing::debug!("Refreshed {}", key),
            Err(e) if e.is_not_found() => tracing::info!("Removed {}", key),
            Err(e) => tracing::warn!("Failed to refresh {}: {}", key, e),
        }
    }
    tracing::info!("{} pages, {} listed", set.len(), set.listed().len());
}

/// File watcher producing page keys for changed content files.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `root` recursively.
    ///
    /// Returns the watcher and a channel of affected page keys. Files whose
    /// extension is not in `registry` are ignored.
    pub fn new(
        root: &Path,
        registry: Arc<ParserRegistry>,
    ) -> Result<(Self, async_mpsc::Receiver<String>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(std::io::Error::other)?;

        let root = root.to_path_buf();
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                if !is_content_change(&event.kind) {
                    continue;
                }
                for path in event.paths {
                    if let Some(key) = key_for(&root, &path, &registry) {
                        if async_tx.blocking_send(key).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Page key for a file under `root`, if it is a visible content file.
fn key_for(root: &Path, path: &Path, registry: &ParserRegistry) -> Option<String> {
    let request_path = page::request_path(root, path)?;
    if request_path.split('/').any(|part| part.starts_with('.')) {
        return None;
    }

    let page = Page::new_virtual(&request_path, Vec::new()).ok()?;
    registry
        .contains(page.extension())
        .then(|| page.key().to_string())
}
