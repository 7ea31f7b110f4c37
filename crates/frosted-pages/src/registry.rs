//! Parser registry for looking up a content parser by file extension.
//!
//! The registry is an explicit value handed to pages and page sets; there is
//! no process-wide table. A site loader restricts or reorders it with
//! [`ParserRegistry::limit`].

use std::fmt;
use std::sync::Arc;

use frosted_md::{ContentParser, FrostedMarkdownParser, MarkdownOptions, PassThrough};

/// An ordered list of extension → parser pairs.
#[derive(Clone)]
pub struct ParserRegistry {
    /// Extensions are stored lowercase, without the leading dot
    entries: Vec<(String, Arc<dyn ContentParser>)>,

    /// Used for extensions with no entry
    fallback: Arc<dyn ContentParser>,
}

impl ParserRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fallback: Arc::new(PassThrough),
        }
    }

    /// The standard table with custom Markdown options: `md` and `markdown`
    /// are Markdown, `txt` and `html` pass through unchanged.
    pub fn with_markdown(options: MarkdownOptions) -> Self {
        let markdown: Arc<dyn ContentParser> = Arc::new(FrostedMarkdownParser::new(options));
        let plain: Arc<dyn ContentParser> = Arc::new(PassThrough);

        let mut registry = Self::new();
        registry.register("md", Arc::clone(&markdown));
        registry.register("markdown", markdown);
        registry.register("txt", Arc::clone(&plain));
        registry.register("html", plain);
        registry
    }

    /// Register a parser, replacing any existing entry for the extension.
    pub fn register(&mut self, extension: &str, parser: Arc<dyn ContentParser>) {
        let extension = normalize(extension);
        match self.entries.iter_mut().find(|(ext, _)| *ext == extension) {
            Some(entry) => entry.1 = parser,
            None => self.entries.push((extension, parser)),
        }
    }

    /// Look up a parser by extension (case-insensitive).
    pub fn get(&self, extension: &str) -> Option<&Arc<dyn ContentParser>> {
        let extension = normalize(extension);
        self.entries
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, parser)| parser)
    }

    /// Parser for an extension, falling back to pass-through.
    pub fn parser_for(&self, extension: &str) -> &dyn ContentParser {
        &**self.get(extension).unwrap_or(&self.fallback)
    }

    /// Check if an extension is registered.
    pub fn contains(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    /// Registered extensions, in lookup order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(ext, _)| ext.as_str())
    }

    /// A registry holding only the given extensions, in the given order.
    /// Extensions with no entry here are skipped.
    pub fn limit<S: AsRef<str>>(&self, extensions: &[S]) -> Self {
        let mut limited = Self {
            entries: Vec::new(),
            fallback: Arc::clone(&self.fallback),
        };
        for extension in extensions {
            match self.get(extension.as_ref()) {
                Some(parser) => limited.register(extension.as_ref(), Arc::clone(parser)),
                None => tracing::warn!("No parser registered for extension '{}'", extension.as_ref()),
            }
        }
        limited
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_markdown(MarkdownOptions::default())
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(ext, parser)| (ext, parser.name())))
            .finish()
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}
