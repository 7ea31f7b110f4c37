//! Code block info strings and meta block candidates.

use pulldown_cmark::CodeBlockKind;

/// Declared language of a code block that may hold metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Language {
    /// Indented block, or a fence without an info string
    #[default]
    Unspecified,
    Json,
    Yaml,
    /// Any other language, lowercased
    Other(String),
}

impl Language {
    /// Parse language from code fence info string.
    pub fn from_info(info: &str) -> Self {
        let lang = info.split_whitespace().next().unwrap_or("");
        match lang.to_lowercase().as_str() {
            "" => Self::Unspecified,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            other => Self::Other(other.to_string()),
        }
    }

    /// Language of a block as reported by the Markdown parser.
    pub fn from_kind(kind: &CodeBlockKind<'_>) -> Self {
        match kind {
            CodeBlockKind::Fenced(info) => Self::from_info(info),
            CodeBlockKind::Indented => Self::Unspecified,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unspecified => "",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Other(lang) => lang,
        }
    }
}

/// The raw text of a code block chosen as the meta block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaBlock {
    /// Unrendered block contents
    pub source: Vec<u8>,

    /// Declared language
    pub language: Language,
}

impl MetaBlock {
    pub fn new(source: impl Into<Vec<u8>>, language: Language) -> Self {
        Self {
            source: source.into(),
            language,
        }
    }
}
