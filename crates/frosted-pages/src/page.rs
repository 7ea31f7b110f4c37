//! A single content unit, backed by a file or held in memory.
//!
//! A page moves through three states: constructed (no source), loaded
//! (source read from disk) and parsed (meta and content populated). Virtual
//! pages skip the disk entirely and get their source assigned directly.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use frosted_md::{Meta, ParseError, Parsed};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::accessors;
use crate::registry::ParserRegistry;

/// One page of a site.
///
/// Pages are shared as `Arc<Page>` between a page set and every subset
/// derived from it, so all mutable state sits behind a lock.
#[derive(Debug)]
pub struct Page {
    /// Slash-separated path, always starting with `/`
    request_path: String,

    /// `request_path` with the extension removed
    key: String,

    extension: String,

    /// `None` for virtual pages
    file_path: Option<PathBuf>,

    is_index: bool,

    state: RwLock<PageState>,

    /// Held for the whole stat, load, parse and swap of a refresh
    refresh_lock: Mutex<()>,
}

#[derive(Debug, Clone)]
struct PageState {
    source: Vec<u8>,
    content: String,
    meta: Meta,
    mod_time: SystemTime,
    unlisted: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            source: Vec::new(),
            content: String::new(),
            meta: Meta::new(),
            mod_time: SystemTime::UNIX_EPOCH,
            unlisted: false,
        }
    }
}

impl PageState {
    fn apply(&mut self, parsed: Parsed) {
        if let Some(unlisted) = accessors::boolean(&parsed.meta, "Unlisted") {
            self.unlisted = unlisted;
        }
        self.meta = parsed.meta;
        self.content = parsed.content;
    }
}

impl Page {
    /// Create a page for the file at `path` under `root`.
    ///
    /// `path` is the request path (e.g. `/blog/hello.md`) and must have a
    /// file extension and no `.` or `..` segments. Nothing is read until
    /// [`Page::load`].
    pub fn new(root: impl AsRef<Path>, path: &str) -> Result<Self, PageError> {
        let mut page = Self::new_virtual(path, Vec::new())?;
        if page
            .request_path
            .split('/')
            .any(|part| part == "." || part == "..")
        {
            return Err(PageError::InvalidPath(page.request_path));
        }
        page.file_path = Some(root.as_ref().join(page.request_path.trim_start_matches('/')));
        Ok(page)
    }

    /// Create a page that is not backed by any file.
    pub fn new_virtual(path: &str, source: impl Into<Vec<u8>>) -> Result<Self, PageError> {
        let request_path = normalize_request_path(path);

        let file_name = request_path.rsplit('/').next().unwrap_or_default();
        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, ext),
            _ => return Err(PageError::MissingExtension(request_path)),
        };

        let is_index = stem.eq_ignore_ascii_case("index");
        let extension = extension.to_string();
        let key = request_path[..request_path.len() - extension.len() - 1].to_string();

        Ok(Self {
            request_path,
            key,
            extension,
            file_path: None,
            is_index,
            state: RwLock::new(PageState {
                source: source.into(),
                ..PageState::default()
            }),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// Page set key: the request path without its extension.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Backing file, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn is_virtual(&self) -> bool {
        self.file_path.is_none()
    }

    /// Whether the file stem is `index`, in any case.
    pub fn is_index(&self) -> bool {
        self.is_index
    }

    /// Number of `/` in the request path.
    pub fn depth(&self) -> usize {
        self.request_path.matches('/').count()
    }

    pub fn is_unlisted(&self) -> bool {
        self.state.read().unlisted
    }

    pub fn set_unlisted(&self, unlisted: bool) {
        self.state.write().unlisted = unlisted;
    }

    pub fn mod_time(&self) -> DateTime<Utc> {
        DateTime::from(self.state.read().mod_time)
    }

    pub fn set_mod_time(&self, mod_time: SystemTime) {
        self.state.write().mod_time = mod_time;
    }

    pub fn source(&self) -> Vec<u8> {
        self.state.read().source.clone()
    }

    pub fn set_source(&self, source: impl Into<Vec<u8>>) {
        self.state.write().source = source.into();
    }

    /// Rendered HTML.
    pub fn content(&self) -> String {
        self.state.read().content.clone()
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.state.write().content = content.into();
    }

    pub fn meta(&self) -> Meta {
        self.state.read().meta.clone()
    }

    pub fn set_meta(&self, meta: Meta) {
        self.state.write().meta = meta;
    }

    /// Read the backing file and its modification time. Does not parse.
    /// Virtual pages have nothing to load.
    pub fn load(&self) -> Result<(), PageError> {
        let Some(path) = self.file_path.as_deref() else {
            return Ok(());
        };
        let (source, mod_time) = read(path)?;

        let mut state = self.state.write();
        state.source = source;
        state.mod_time = mod_time;
        Ok(())
    }

    /// Parse the current source with the parser registered for this page's
    /// extension. On error the page is left as it was.
    pub fn parse(&self, registry: &ParserRegistry) -> Result<(), PageError> {
        let source = self.source();
        let parsed = self.parse_source(&source, registry)?;

        let mut state = self.state.write();
        // A file-backed page is listed unless its current meta says otherwise.
        if self.file_path.is_some() {
            state.unlisted = false;
        }
        state.apply(parsed);
        Ok(())
    }

    /// Reload the page if its file changed on disk.
    ///
    /// Returns whether the page was reloaded. Any stat, read or parse error
    /// is returned with the page left exactly as it was. Virtual pages never
    /// change.
    pub fn refresh(&self, registry: &ParserRegistry) -> Result<bool, PageError> {
        let Some(path) = self.file_path.as_deref() else {
            return Ok(false);
        };
        let _guard = self.refresh_lock.lock();

        let modified = stat(path)?;
        if modified == self.state.read().mod_time {
            tracing::debug!(page = %self.request_path, "page unchanged");
            return Ok(false);
        }

        let (source, mod_time) = read(path)?;
        let parsed = self.parse_source(&source, registry)?;

        let mut scratch = PageState {
            source,
            mod_time,
            ..PageState::default()
        };
        scratch.apply(parsed);
        *self.state.write() = scratch;

        tracing::info!(page = %self.request_path, "refreshed page");
        Ok(true)
    }

    fn parse_source(&self, source: &[u8], registry: &ParserRegistry) -> Result<Parsed, PageError> {
        registry
            .parser_for(&self.extension)
            .parse(source)
            .map_err(|source| PageError::Parse {
                path: self.request_path.clone(),
                source,
            })
    }

    /// Title from the meta block, or empty.
    pub fn title(&self) -> String {
        self.meta_str("Title").unwrap_or_default()
    }

    pub fn tags(&self) -> Vec<String> {
        self.meta_strings("Tags")
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        accessors::timestamp(&self.state.read().meta, "Created")
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        accessors::timestamp(&self.state.read().meta, "Updated")
    }

    /// The page's effective time: the newer of Created and Updated when both
    /// are set, whichever one is set otherwise, and the file's modification
    /// time when neither is.
    pub fn time(&self) -> DateTime<Utc> {
        match (self.created(), self.updated()) {
            (Some(created), Some(updated)) => created.max(updated),
            (Some(created), None) => created,
            (None, Some(updated)) => updated,
            (None, None) => self.mod_time(),
        }
    }

    pub fn meta_str(&self, key: &str) -> Option<String> {
        accessors::string(&self.state.read().meta, key)
    }

    pub fn meta_bool(&self, key: &str) -> Option<bool> {
        accessors::boolean(&self.state.read().meta, key)
    }

    pub fn meta_strings(&self, key: &str) -> Vec<String> {
        accessors::string_list(&self.state.read().meta, key)
    }

    /// A serializable summary of the page.
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            key: self.key.clone(),
            path: self.request_path.clone(),
            title: self.title(),
            tags: self.tags(),
            time: self.time(),
            unlisted: self.is_unlisted(),
        }
    }
}

/// Listing-friendly projection of a [`Page`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub key: String,
    pub path: String,
    pub title: String,
    pub tags: Vec<String>,
    pub time: DateTime<Utc>,
    pub unlisted: bool,
}

/// Request path for `file` under `root`, e.g. `/blog/hello.md`.
pub fn request_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut path = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                path.push('/');
                path.push_str(part.to_str()?);
            }
            _ => return None,
        }
    }
    (!path.is_empty()).then_some(path)
}

fn normalize_request_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

fn stat(path: &Path) -> Result<SystemTime, PageError> {
    let metadata = fs::metadata(path).map_err(|e| PageError::io(path, e))?;
    if metadata.is_dir() {
        return Err(PageError::NotFound(path.to_path_buf()));
    }
    metadata.modified().map_err(|e| PageError::io(path, e))
}

fn read(path: &Path) -> Result<(Vec<u8>, SystemTime), PageError> {
    let mod_time = stat(path)?;
    let source = fs::read(path).map_err(|e| PageError::io(path, e))?;
    Ok((source, mod_time))
}

/// Errors that can occur when loading or parsing a page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("page path has no file extension: {0}")]
    MissingExtension(String),

    /// The path has `.` or `..` segments and could resolve outside the root.
    #[error("page path is not inside the content root: {0}")]
    InvalidPath(String),

    #[error("page not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

impl PageError {
    fn io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    /// Whether the page does not exist under the root, as opposed to a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidPath(_))
    }
}
