//! The unit of work the pipeline enhances.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_doc_type() -> String {
    "markdown".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

/// Content plus the metadata the pipeline needs to track it across passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            doc_type: default_doc_type(),
            language: default_language(),
            version: 0,
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_markdown_and_english() {
        let doc = Document::new("hello");
        assert_eq!(doc.doc_type, "markdown");
        assert_eq!(doc.language, "en");
        assert_eq!(doc.version, 0);
    }

    #[test]
    fn with_metadata_inserts_key() {
        let doc = Document::new("x").with_metadata("source", Value::String("import".into()));
        assert_eq!(doc.metadata.get("source").unwrap(), "import");
    }
}
