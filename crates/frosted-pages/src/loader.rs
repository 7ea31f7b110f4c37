//! Build a page set from a content directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use walkdir::{DirEntry, WalkDir};

use crate::page::{self, Page};
use crate::pageset::{Pageset, PagesetError};
use crate::registry::ParserRegistry;

/// Load every file under `root` whose extension is registered.
///
/// Hidden files and directories are skipped. Pages are read and parsed in
/// parallel; a page that fails is logged and left out of the set.
pub fn load_dir(
    root: impl AsRef<Path>,
    registry: Arc<ParserRegistry>,
) -> Result<Pageset, LoadError> {
    let start = Instant::now();
    let root = root.as_ref();

    if !root.is_dir() {
        return Err(LoadError::RootNotFound(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let registered = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| registry.contains(ext));
        if !registered {
            continue;
        }

        match page::request_path(root, entry.path()) {
            Some(path) => paths.push(path),
            None => tracing::warn!("Skipping non UTF-8 path {}", entry.path().display()),
        }
    }

    let pages: Vec<Arc<Page>> = paths
        .par_iter()
        .filter_map(|path| match load_page(root, path, &registry) {
            Ok(page) => Some(Arc::new(page)),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path, e);
                None
            }
        })
        .collect();

    let skipped = paths.len() - pages.len();
    let set = Pageset::from_pages(root, registry, pages)?;

    tracing::info!(
        pages = set.len(),
        skipped,
        "Loaded {} in {}ms",
        root.display(),
        start.elapsed().as_millis()
    );

    Ok(set)
}

fn load_page(root: &Path, path: &str, registry: &ParserRegistry) -> Result<Page, page::PageError> {
    let page = Page::new(root, path)?;
    page.load()?;
    page.parse(registry)?;
    Ok(page)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Errors that can occur while loading a content directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("content directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Duplicate(#[from] PagesetError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_registered_files() {
        let temp = tempdir().unwrap();
        write(temp.path(), "index.md", "# Home\n");
        write(temp.path(), "blog/first.markdown", "# First\n");
        write(temp.path(), "notes.txt", "plain");
        write(temp.path(), "style.css", "body {}");

        let mut set = load_dir(temp.path(), Arc::new(ParserRegistry::default())).unwrap();

        let paths: Vec<&str> = set.by_path().iter().map(|p| p.request_path()).collect();
        assert_eq!(paths, vec!["/index.md", "/notes.txt", "/blog/first.markdown"]);
        assert_eq!(set.page("/blog/first").unwrap().title(), "First");
    }

    #[test]
    fn skips_hidden_entries() {
        let temp = tempdir().unwrap();
        write(temp.path(), ".draft.md", "# Draft\n");
        write(temp.path(), ".git/notes.md", "# Git\n");
        write(temp.path(), "page.md", "# Page\n");

        let set = load_dir(temp.path(), Arc::new(ParserRegistry::default())).unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.contains("/page"));
    }

    #[test]
    fn skips_pages_that_fail_to_parse() {
        let temp = tempdir().unwrap();
        write(temp.path(), "good.md", "# Good\n");
        write(temp.path(), "bad.md", "```json\n{\"Title\": \n```\n");

        let set = load_dir(temp.path(), Arc::new(ParserRegistry::default())).unwrap();

        assert!(set.contains("/good"));
        assert!(!set.contains("/bad"));
    }

    #[test]
    fn honors_limited_registry() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.md", "# A\n");
        write(temp.path(), "b.txt", "B");

        let registry = ParserRegistry::default().limit(&["txt"]);
        let set = load_dir(temp.path(), Arc::new(registry)).unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.contains("/b"));
    }

    #[test]
    fn reports_duplicate_keys() {
        let temp = tempdir().unwrap();
        write(temp.path(), "post.md", "# One\n");
        write(temp.path(), "post.txt", "two");

        let err = load_dir(temp.path(), Arc::new(ParserRegistry::default())).unwrap_err();

        assert!(matches!(
            err,
            LoadError::Duplicate(PagesetError::DuplicatePath { ref key, .. }) if key == "/post"
        ));
    }

    #[test]
    fn missing_root() {
        let temp = tempdir().unwrap();

        let err = load_dir(temp.path().join("nope"), Arc::new(ParserRegistry::default()))
            .unwrap_err();

        assert!(matches!(err, LoadError::RootNotFound(_)));
    }
}
