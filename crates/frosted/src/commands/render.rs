//! Render a single file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use frosted_md::{ParseError, Parsed};
use serde_json::json;

use super::config::ConfigFile;

/// Run the render command.
pub async fn run(config: &ConfigFile, file: &Path) -> Result<()> {
    let source = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let parsed = render(config, file, &source)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let output = json!({
        "meta": parsed.meta,
        "content": parsed.content,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn render(config: &ConfigFile, file: &Path, source: &[u8]) -> Result<Parsed, ParseError> {
    let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("");
    let registry = config.registry();
    let parser = registry.parser_for(extension);

    tracing::debug!("Rendering {} with the {} parser", file.display(), parser.name());
    parser.parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn renders_markdown_by_extension() {
        let config = ConfigFile::default();

        let parsed = render(
            &config,
            Path::new("post.md"),
            b"# Hello\n\n```yaml\nTags: [a]\n```\n\nBody\n",
        )
        .unwrap();

        assert_eq!(parsed.meta.get("Title"), Some(&Value::from("Hello")));
        assert_eq!(parsed.content, "<h1>Hello</h1>\n\n<p>Body</p>\n");
    }

    #[test]
    fn unknown_extension_passes_through() {
        let config = ConfigFile::default();

        let parsed = render(&config, Path::new("notes.rst"), b"*raw*").unwrap();

        assert_eq!(parsed.content, "*raw*");
        assert!(parsed.meta.is_empty());
    }
}
