//! Frosted Markdown parser.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::Deserialize;
use serde_json::Value;

use crate::interceptor::{Blocks, MetaPosition, RenderInterceptor};
use crate::meta::{self, Meta, MetaError};

/// Keys that count as a declared title, checked in this order.
const TITLE_KEYS: [&str; 3] = ["Title", "TITLE", "title"];

/// The result of parsing one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    /// Decoded metadata
    pub meta: Meta,

    /// Rendered HTML, meta block excluded
    pub content: String,
}

/// Errors that can occur when parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The body rendered fine but the meta block did not decode. The rendered
    /// body is kept so callers can choose to ignore metadata errors.
    #[error("invalid meta block: {source}")]
    InvalidMeta {
        content: String,
        #[source]
        source: MetaError,
    },
}

impl ParseError {
    /// Rendered content salvaged from a failed parse.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::InvalidMeta { content, .. } => Some(content),
        }
    }
}

/// Anything that can turn source bytes into metadata and HTML.
pub trait ContentParser: Send + Sync {
    /// Parser identifier (e.g., "markdown", "plain")
    fn name(&self) -> &'static str;

    /// Parse a document.
    fn parse(&self, source: &[u8]) -> Result<Parsed, ParseError>;
}

/// Markdown extension sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Tables, footnotes, strikethrough, task lists and smart punctuation
    #[default]
    Common,
    /// Plain CommonMark
    Basic,
}

impl Preset {
    pub fn options(self) -> Options {
        match self {
            Self::Common => {
                Options::ENABLE_TABLES
                    | Options::ENABLE_FOOTNOTES
                    | Options::ENABLE_STRIKETHROUGH
                    | Options::ENABLE_TASKLISTS
                    | Options::ENABLE_SMART_PUNCTUATION
            }
            Self::Basic => Options::empty(),
        }
    }
}

/// Options for [`FrostedMarkdownParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct MarkdownOptions {
    #[serde(default)]
    pub preset: Preset,

    #[serde(default, rename = "meta")]
    pub position: MetaPosition,
}

/// Markdown parser that pulls one code block out as metadata.
#[derive(Debug, Clone, Default)]
pub struct FrostedMarkdownParser {
    options: MarkdownOptions,
}

impl FrostedMarkdownParser {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MarkdownOptions {
        self.options
    }

    /// Parse a Markdown string.
    pub fn parse_str(&self, source: &str) -> Result<Parsed, ParseError> {
        let events = Parser::new_ext(source, self.options.preset.options());
        let intercepted = RenderInterceptor::new(self.options.position).run(Blocks::new(events));

        let mut content = String::new();
        html::push_html(&mut content, escape_quotes(intercepted.events).into_iter());

        let decoded = match &intercepted.meta {
            Some(block) => meta::decode(&block.source, &block.language),
            None => Ok(Meta::new()),
        };
        let mut meta = match decoded {
            Ok(meta) => meta,
            Err(source) => return Err(ParseError::InvalidMeta { content, source }),
        };

        if let Some(title) = intercepted.header_title {
            if !TITLE_KEYS.iter().any(|key| meta.contains_key(*key)) {
                meta.insert("Title".to_string(), Value::String(title));
            }
        }

        Ok(Parsed { meta, content })
    }
}

impl ContentParser for FrostedMarkdownParser {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn parse(&self, source: &[u8]) -> Result<Parsed, ParseError> {
        self.parse_str(&String::from_utf8_lossy(source))
    }
}

/// Render straight double quotes in text as `&quot;`.
///
/// The HTML writer leaves `"` alone in body text. Image text is skipped
/// because the writer escapes it itself for the `alt` attribute.
fn escape_quotes(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut images = 0usize;
    events
        .into_iter()
        .flat_map(|event| match event {
            Event::Start(Tag::Image { .. }) => {
                images += 1;
                vec![event]
            }
            Event::End(TagEnd::Image) => {
                images = images.saturating_sub(1);
                vec![event]
            }
            Event::Text(text) if images == 0 && text.contains('"') => {
                let mut split = Vec::new();
                for (i, segment) in text.split('"').enumerate() {
                    if i > 0 {
                        split.push(Event::InlineHtml(CowStr::Borrowed("&quot;")));
                    }
                    if !segment.is_empty() {
                        split.push(Event::Text(CowStr::from(segment.to_string())));
                    }
                }
                split
            }
            other => vec![other],
        })
        .collect()
}

/// Returns the source unchanged as content, with no metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ContentParser for PassThrough {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn parse(&self, source: &[u8]) -> Result<Parsed, ParseError> {
        Ok(Parsed {
            meta: Meta::new(),
            content: String::from_utf8_lossy(source).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse_with(source: &str, preset: Preset, position: MetaPosition) -> Result<Parsed, ParseError> {
        FrostedMarkdownParser::new(MarkdownOptions { preset, position }).parse(source.as_bytes())
    }

    fn parse(source: &str) -> Parsed {
        parse_with(source, Preset::Common, MetaPosition::Start).unwrap()
    }

    #[test]
    fn extracts_title_from_leading_heading() {
        let doc = parse("# Ima Title\n\n    OldSchool: \"YAML\"\n\nPlus \"this.\"");

        assert_eq!(
            Value::Object(doc.meta),
            json!({"Title": "Ima Title", "OldSchool": "YAML"})
        );
        assert_eq!(doc.content, "<h1>Ima Title</h1>\n\n<p>Plus “this.”</p>\n");
    }

    #[test]
    fn basic_preset_escapes_straight_quotes() {
        let doc = parse_with(
            "# Ima Title\n\n    OldSchool: \"YAML\"\n\nPlus \"this.\"",
            Preset::Basic,
            MetaPosition::Start,
        )
        .unwrap();

        assert_eq!(
            Value::Object(doc.meta),
            json!({"Title": "Ima Title", "OldSchool": "YAML"})
        );
        assert_eq!(doc.content, "<h1>Ima Title</h1>\n\n<p>Plus &quot;this.&quot;</p>\n");
    }

    #[test]
    fn escapes_quotes_in_code_and_alt_text() {
        let doc = parse_with(
            "Intro ![say \"hi\"](a.png)\n\n```text\nlet s = \"x\";\n```\n",
            Preset::Basic,
            MetaPosition::Start,
        )
        .unwrap();

        assert_eq!(
            doc.content,
            "<p>Intro <img src=\"a.png\" alt=\"say &quot;hi&quot;\" /></p>\n\n\
             <pre><code class=\"language-text\">let s = &quot;x&quot;;\n</code></pre>\n"
        );
    }

    #[test]
    fn declared_title_wins_over_heading() {
        let doc = parse("# Heading\n\n```yaml\ntitle: Declared\n```\n\nBody\n");

        assert_eq!(Value::Object(doc.meta), json!({"title": "Declared"}));
        assert_eq!(doc.content, "<h1>Heading</h1>\n\n<p>Body</p>\n");
    }

    #[test]
    fn meta_block_without_heading() {
        let doc = parse("```json\n{\"Title\": \"Json\", \"Tags\": [\"a\"]}\n```\n\nBody\n");

        assert_eq!(
            Value::Object(doc.meta),
            json!({"Title": "Json", "Tags": ["a"]})
        );
        assert_eq!(doc.content, "<p>Body</p>\n");
    }

    #[test]
    fn late_code_block_is_content() {
        let doc = parse("Intro.\n\n```yaml\nkey: <value>\n```\n");

        assert!(doc.meta.is_empty());
        assert_eq!(
            doc.content,
            "<p>Intro.</p>\n\n<pre><code class=\"language-yaml\">key: &lt;value&gt;\n</code></pre>\n"
        );
    }

    #[test]
    fn heading_title_is_plain_text() {
        let doc = parse("# The `frost` *tool*\n\nBody\n");

        assert_eq!(doc.meta.get("Title"), Some(&json!("The frost tool")));
    }

    #[test]
    fn only_last_code_block_is_meta_at_end() {
        let source = "Intro\n\n```\nfirst\n```\n\n```\nsecond\n```\n\n```yaml\nTitle: End\n```\n";
        let doc = parse_with(source, Preset::Common, MetaPosition::End).unwrap();

        assert_eq!(Value::Object(doc.meta), json!({"Title": "End"}));
        assert_eq!(
            doc.content,
            "<p>Intro</p>\n\n<pre><code>first\n</code></pre>\n\n<pre><code>second\n</code></pre>\n"
        );
    }

    #[test]
    fn meta_at_end_requires_code_block_last() {
        let doc = parse_with("```\ncode\n```\n\nOutro\n", Preset::Common, MetaPosition::End).unwrap();

        assert!(doc.meta.is_empty());
        assert_eq!(doc.content, "<pre><code>code\n</code></pre>\n\n<p>Outro</p>\n");
    }

    #[test]
    fn invalid_meta_keeps_content() {
        let err = parse_with("```yaml\nTitle: [oops\n```\n\nBody\n", Preset::Common, MetaPosition::Start)
            .unwrap_err();

        assert!(matches!(
            err,
            ParseError::InvalidMeta {
                source: MetaError::Yaml(_),
                ..
            }
        ));
        assert_eq!(err.content(), Some("<p>Body</p>\n"));
    }

    #[test]
    fn unsupported_meta_language_is_an_error() {
        let err = parse_with("```rust\nfn main() {}\n```\n", Preset::Common, MetaPosition::Start)
            .unwrap_err();

        assert!(matches!(
            err,
            ParseError::InvalidMeta {
                source: MetaError::UnsupportedLanguage(_),
                ..
            }
        ));
    }

    #[test]
    fn pass_through_returns_source() {
        let doc = PassThrough.parse(b"<b>raw</b>").unwrap();

        assert!(doc.meta.is_empty());
        assert_eq!(doc.content, "<b>raw</b>");
    }

    #[test]
    fn deserializes_options() {
        let options: MarkdownOptions =
            serde_json::from_value(json!({"preset": "basic", "meta": "end"})).unwrap();

        assert_eq!(options.preset, Preset::Basic);
        assert_eq!(options.position, MetaPosition::End);
    }
}
