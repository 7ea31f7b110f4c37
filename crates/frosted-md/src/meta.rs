//! Meta block decoding.

use serde_json::{Map, Number, Value};

use crate::codeblock::Language;

/// Metadata extracted from a document, keyed by field name.
pub type Meta = Map<String, Value>;

/// Decode a meta block into a mapping.
///
/// With no declared language the block is tried as JSON first and falls back
/// to YAML. An empty block decodes to an empty mapping.
pub fn decode(source: &[u8], language: &Language) -> Result<Meta, MetaError> {
    if source.iter().all(u8::is_ascii_whitespace) {
        return Ok(Meta::new());
    }

    match language {
        Language::Unspecified => decode_json(source).or_else(|_| decode_yaml(source)),
        Language::Json => decode_json(source),
        Language::Yaml => decode_yaml(source),
        Language::Other(lang) => Err(MetaError::UnsupportedLanguage(lang.clone())),
    }
}

fn decode_json(source: &[u8]) -> Result<Meta, MetaError> {
    match serde_json::from_slice(source)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Meta::new()),
        _ => Err(MetaError::NotAMapping),
    }
}

fn decode_yaml(source: &[u8]) -> Result<Meta, MetaError> {
    match serde_yaml::from_slice(source)? {
        serde_yaml::Value::Mapping(mapping) => Ok(mapping
            .into_iter()
            .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
            .collect()),
        serde_yaml::Value::Null => Ok(Meta::new()),
        _ => Err(MetaError::NotAMapping),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::from("null"),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Errors that can occur when decoding a meta block.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("invalid JSON in meta block: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML in meta block: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported language for meta block: {0}")]
    UnsupportedLanguage(String),

    #[error("meta block is not a mapping")]
    NotAMapping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn as_value(meta: Meta) -> Value {
        Value::Object(meta)
    }

    #[test]
    fn empty_block_is_empty_mapping() {
        assert!(decode(b"", &Language::Unspecified).unwrap().is_empty());
        assert!(decode(b"  \n", &Language::Json).unwrap().is_empty());
    }

    #[test]
    fn decodes_declared_json() {
        let meta = decode(br#"{"Title": "Hello", "Tags": ["a", "b"]}"#, &Language::Json).unwrap();

        assert_eq!(as_value(meta), json!({"Title": "Hello", "Tags": ["a", "b"]}));
    }

    #[test]
    fn decodes_declared_yaml() {
        let meta = decode(b"Title: Hello\nDraft: true\nOrder: 3\n", &Language::Yaml).unwrap();

        assert_eq!(
            as_value(meta),
            json!({"Title": "Hello", "Draft": true, "Order": 3})
        );
    }

    #[test]
    fn undeclared_json_short_circuits() {
        let meta = decode(br#"{"Title": "Braces"}"#, &Language::Unspecified).unwrap();

        assert_eq!(as_value(meta), json!({"Title": "Braces"}));
    }

    #[test]
    fn undeclared_falls_back_to_yaml() {
        let meta = decode(b"OldSchool: \"YAML\"\n", &Language::Unspecified).unwrap();

        assert_eq!(as_value(meta), json!({"OldSchool": "YAML"}));
    }

    #[test]
    fn declared_json_errors_are_returned() {
        let result = decode(b"Title: not json", &Language::Json);

        assert!(matches!(result, Err(MetaError::Json(_))));
    }

    #[test]
    fn invalid_yaml_errors_are_returned() {
        let result = decode(b"Title: [unclosed\n", &Language::Unspecified);

        assert!(matches!(result, Err(MetaError::Yaml(_))));
    }

    #[test]
    fn rejects_unsupported_language() {
        let result = decode(b"title = \"toml\"", &Language::Other("toml".to_string()));

        match result {
            Err(MetaError::UnsupportedLanguage(lang)) => assert_eq!(lang, "toml"),
            other => panic!("expected unsupported language, got {:?}", other),
        }
    }

    #[test]
    fn rejects_scalar_documents() {
        let result = decode(b"just a sentence", &Language::Yaml);

        assert!(matches!(result, Err(MetaError::NotAMapping)));
    }

    #[test]
    fn stringifies_non_string_yaml_keys() {
        let meta = decode(b"1: one\ntrue: yes\nnested:\n  2: two\n", &Language::Yaml).unwrap();

        assert_eq!(
            as_value(meta),
            json!({"1": "one", "true": "yes", "nested": {"2": "two"}})
        );
    }
}
