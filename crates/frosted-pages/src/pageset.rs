//! Keyed collection of pages with cached, sorted views.
//!
//! Views (listed pages, the four sort orders, tags and subsets) are built on
//! first use and dropped wholesale by any mutation of the set.
//!
//! A `Pageset` does no locking of its own. Views are cached behind
//! `&mut self`, so concurrent readers and writers must be serialized by the
//! caller, typically by keeping the set behind a `Mutex` or `RwLock`. Pages
//! themselves refresh independently; see [`Page::refresh`].

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::page::{Page, PageError};
use crate::registry::ParserRegistry;

/// A collection of pages keyed by extension-less request path.
#[derive(Debug)]
pub struct Pageset {
    /// Directory that request paths are resolved against
    root: PathBuf,

    registry: Arc<ParserRegistry>,

    pages: HashMap<String, Arc<Page>>,

    views: Views,
}

#[derive(Debug, Default)]
struct Views {
    listed: Option<Vec<Arc<Page>>>,
    by_path: Option<Vec<Arc<Page>>>,
    by_created: Option<Vec<Arc<Page>>>,
    by_mod_time: Option<Vec<Arc<Page>>>,
    by_time: Option<Vec<Arc<Page>>>,
    tags: Option<Vec<String>>,
    tag_subsets: HashMap<String, Pageset>,
    path_subsets: HashMap<(String, String), Pageset>,
    listed_subset: Option<Box<Pageset>>,
}

impl Pageset {
    /// Create an empty set.
    pub fn new(root: impl Into<PathBuf>, registry: Arc<ParserRegistry>) -> Self {
        Self {
            root: root.into(),
            registry,
            pages: HashMap::new(),
            views: Views::default(),
        }
    }

    /// Create a set from pages whose keys must all be distinct.
    pub fn from_pages<I>(
        root: impl Into<PathBuf>,
        registry: Arc<ParserRegistry>,
        pages: I,
    ) -> Result<Self, PagesetError>
    where
        I: IntoIterator<Item = Arc<Page>>,
    {
        let mut set = Self::new(root, registry);
        for page in pages {
            match set.pages.entry(page.key().to_string()) {
                Entry::Occupied(existing) => {
                    return Err(PagesetError::DuplicatePath {
                        key: existing.key().clone(),
                        first: existing.get().request_path().to_string(),
                        second: page.request_path().to_string(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(page);
                }
            }
        }
        Ok(set)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Arc<ParserRegistry> {
        &self.registry
    }

    pub fn page(&self, key: &str) -> Option<&Arc<Page>> {
        self.pages.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pages.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// All pages, listed or not, in no particular order.
    pub fn pages(&self) -> impl Iterator<Item = &Arc<Page>> {
        self.pages.values()
    }

    /// Add a page, replacing any page with the same key.
    pub fn insert(&mut self, page: Arc<Page>) -> Option<Arc<Page>> {
        self.invalidate();
        self.pages.insert(page.key().to_string(), page)
    }

    pub fn remove(&mut self, key: &str) -> Option<Arc<Page>> {
        self.invalidate();
        self.pages.remove(key)
    }

    /// Drop every cached view.
    ///
    /// Mutations through this set do this already; call it after changing a
    /// shared page through some other handle.
    pub fn invalidate(&mut self) {
        self.views = Views::default();
    }

    /// Bring the page at `key` up to date with the disk.
    ///
    /// A page whose file disappeared is removed and looked up again under
    /// every registered extension, so renaming `post.md` to `post.txt` is
    /// picked up. An unknown key is loaded the same way. Other errors are
    /// returned and the page stays in the set.
    pub fn refresh(&mut self, key: &str) -> Result<(), PageError> {
        let Some(page) = self.pages.get(key).cloned() else {
            return self.load(key).map(|_| ());
        };

        match page.refresh(&self.registry) {
            Ok(true) => {
                self.invalidate();
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::info!(key, "page source is gone, looking for another extension");
                self.remove(key);
                self.load(key).map(|_| ())
            }
            Err(err) => Err(err),
        }
    }

    /// Load `key` from disk, trying each registered extension in order, and
    /// add it to the set.
    pub fn load(&mut self, key: &str) -> Result<Arc<Page>, PageError> {
        let registry = Arc::clone(&self.registry);

        for extension in registry.extensions() {
            let page = Page::new(&self.root, &format!("{}.{}", key, extension))?;
            match page.load() {
                Ok(()) => {}
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
            page.parse(&registry)?;

            tracing::info!(page = page.request_path(), "loaded page");
            let page = Arc::new(page);
            self.insert(Arc::clone(&page));
            return Ok(page);
        }

        Err(PageError::NotFound(
            self.root.join(key.trim_start_matches('/')),
        ))
    }

    /// Pages that are not unlisted, in no particular order.
    pub fn listed(&mut self) -> &[Arc<Page>] {
        if self.views.listed.is_none() {
            let listed = self
                .pages
                .values()
                .filter(|page| !page.is_unlisted())
                .cloned()
                .collect();
            self.views.listed = Some(listed);
        }
        self.views.listed.get_or_insert_with(Vec::new)
    }

    /// Listed pages, shallowest first, index pages before their siblings,
    /// then by path.
    pub fn by_path(&mut self) -> &[Arc<Page>] {
        if self.views.by_path.is_none() {
            let mut pages = self.listed().to_vec();
            pages.sort_by(|a, b| compare_paths(a, b));
            tracing::debug!(pages = pages.len(), "sorted pages by path");
            self.views.by_path = Some(pages);
        }
        self.views.by_path.get_or_insert_with(Vec::new)
    }

    /// Listed pages, newest Created first. Pages without a Created date use
    /// their modification time.
    pub fn by_created(&mut self) -> &[Arc<Page>] {
        if self.views.by_created.is_none() {
            let pages = self.newest_first(|page| page.created().unwrap_or_else(|| page.mod_time()));
            self.views.by_created = Some(pages);
        }
        self.views.by_created.get_or_insert_with(Vec::new)
    }

    /// Listed pages, most recently modified first.
    pub fn by_mod_time(&mut self) -> &[Arc<Page>] {
        if self.views.by_mod_time.is_none() {
            let pages = self.newest_first(Page::mod_time);
            self.views.by_mod_time = Some(pages);
        }
        self.views.by_mod_time.get_or_insert_with(Vec::new)
    }

    /// Listed pages, newest [`Page::time`] first.
    pub fn by_time(&mut self) -> &[Arc<Page>] {
        if self.views.by_time.is_none() {
            let pages = self.newest_first(Page::time);
            self.views.by_time = Some(pages);
        }
        self.views.by_time.get_or_insert_with(Vec::new)
    }

    fn newest_first(&mut self, time: impl Fn(&Page) -> DateTime<Utc>) -> Vec<Arc<Page>> {
        let mut keyed: Vec<(DateTime<Utc>, Arc<Page>)> = self
            .listed()
            .iter()
            .map(|page| (time(page), Arc::clone(page)))
            .collect();
        keyed.sort_by(|(time_a, a), (time_b, b)| {
            time_b.cmp(time_a).then_with(|| compare_paths(a, b))
        });
        keyed.into_iter().map(|(_, page)| page).collect()
    }

    /// Unique, lowercased, sorted tags of all listed pages.
    pub fn tags(&mut self) -> &[String] {
        if self.views.tags.is_none() {
            let mut tags: Vec<String> = self
                .listed()
                .iter()
                .flat_map(|page| page.tags())
                .map(|tag| tag.to_lowercase())
                .collect();
            tags.sort();
            tags.dedup();
            self.views.tags = Some(tags);
        }
        self.views.tags.get_or_insert_with(Vec::new)
    }

    /// Pages tagged `tag` (case-insensitive).
    pub fn tag_subset(&mut self, tag: &str) -> Result<&mut Pageset, PagesetError> {
        let tag = tag.to_lowercase();
        match self.views.tag_subsets.entry(tag) {
            Entry::Occupied(subset) => Ok(subset.into_mut()),
            Entry::Vacant(slot) => {
                let pages = self
                    .pages
                    .values()
                    .filter(|page| page.tags().iter().any(|t| t.to_lowercase() == *slot.key()))
                    .cloned();
                let subset = Pageset::from_pages(&self.root, Arc::clone(&self.registry), pages)?;
                Ok(slot.insert(subset))
            }
        }
    }

    /// Pages whose request path, with a leading `trim` removed when present,
    /// starts with `prefix`.
    pub fn path_subset(&mut self, prefix: &str, trim: &str) -> Result<&mut Pageset, PagesetError> {
        match self
            .views
            .path_subsets
            .entry((trim.to_string(), prefix.to_string()))
        {
            Entry::Occupied(subset) => Ok(subset.into_mut()),
            Entry::Vacant(slot) => {
                let pages = self
                    .pages
                    .values()
                    .filter(|page| {
                        let path = page.request_path();
                        path.strip_prefix(trim).unwrap_or(path).starts_with(prefix)
                    })
                    .cloned();
                let subset = Pageset::from_pages(&self.root, Arc::clone(&self.registry), pages)?;
                Ok(slot.insert(subset))
            }
        }
    }

    /// The listed pages as a set of their own.
    pub fn listed_subset(&mut self) -> Result<&mut Pageset, PagesetError> {
        let subset = match self.views.listed_subset.take() {
            Some(subset) => subset,
            None => {
                let pages = self.listed().to_vec();
                Box::new(Pageset::from_pages(&self.root, Arc::clone(&self.registry), pages)?)
            }
        };
        let subset: &mut Pageset = self.views.listed_subset.insert(subset);
        Ok(subset)
    }
}

fn compare_paths(a: &Page, b: &Page) -> Ordering {
    a.depth()
        .cmp(&b.depth())
        .then_with(|| b.is_index().cmp(&a.is_index()))
        .then_with(|| a.request_path().cmp(b.request_path()))
}

/// Errors that can occur when building a [`Pageset`].
#[derive(Debug, thiserror::Error)]
pub enum PagesetError {
    /// Two source files map to the same key. Only reachable when whatever
    /// produced the pages let two sources share a canonical path.
    #[error("duplicate page path {key}: {first} and {second}")]
    DuplicatePath {
        key: String,
        first: String,
        second: String,
    },
}
