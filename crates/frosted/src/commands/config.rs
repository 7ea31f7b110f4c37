//! Configuration file (frosted.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use frosted_md::MarkdownOptions;
use frosted_pages::ParserRegistry;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub markdown: MarkdownOptions,
}

#[derive(Debug, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_dir")]
    pub dir: PathBuf,
    /// Registered extensions to use, in lookup order
    pub extensions: Option<Vec<String>>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: default_content_dir(),
            extensions: None,
        }
    }
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

impl ConfigFile {
    /// Parser registry for these settings.
    pub fn registry(&self) -> ParserRegistry {
        let registry = ParserRegistry::with_markdown(self.markdown);
        match &self.content.extensions {
            Some(extensions) => registry.limit(extensions),
            None => registry,
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        tracing::debug!("Loaded config from {}", path.display());
        return Ok(config);
    }
    Ok(ConfigFile::default())
}
