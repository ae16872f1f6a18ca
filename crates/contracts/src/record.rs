//! Record: the unit of data moved through a pipeline

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record header
///
/// `source_id` is a deterministic identity derived from where the record
/// came from (e.g. `"<file>::<offset>"` for the spooler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub source_id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Header {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One logical unit of data
///
/// Immutable once built: the only way to set header attributes is through
/// the builder methods consumed before the record is handed to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    header: Header,
    value: Value,
}

impl Record {
    pub fn new(source_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            header: Header::new(source_id),
            value: value.into(),
        }
    }

    /// Attach a header attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.attributes.insert(name.into(), value.into());
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn source_id(&self) -> &str {
        &self.header.source_id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Value as text: strings verbatim, everything else JSON-encoded
    pub fn value_as_text(&self) -> Result<String, serde_json::Error> {
        match &self.value {
            Value::String(s) => Ok(s.clone()),
            other => serde_json::to_string(other),
        }
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_attributes() {
        let record = Record::new("/tmp/a.txt::4", "456")
            .with_attribute("file", "/tmp/a.txt")
            .with_attribute("offset", "4");

        assert_eq!(record.source_id(), "/tmp/a.txt::4");
        assert_eq!(record.header().attribute("offset"), Some("4"));
        assert_eq!(record.header().attribute("missing"), None);
        assert_eq!(record.value(), &json!("456"));
    }

    #[test]
    fn test_value_as_text() {
        let text = Record::new("s", "raw line");
        assert_eq!(text.value_as_text().unwrap(), "raw line");

        let map = Record::new("m", json!({"a": 1}));
        assert_eq!(map.value_as_text().unwrap(), r#"{"a":1}"#);
    }
}
