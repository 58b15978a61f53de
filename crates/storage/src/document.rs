#![forbid(unsafe_code)]

use serde::Deserialize;
use serde_json::Value;

/// Decodes a single JSON or YAML document. JSON is tried first.
pub fn parse_document(bytes: &[u8]) -> Result<Value, String> {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return Ok(value);
    }
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(bytes) {
        let value = Value::deserialize(document).map_err(|err| err.to_string())?;
        documents.push(value);
    }
    match documents.len() {
        1 => Ok(documents.remove(0)),
        n => Err(format!("expected exactly one document, found {n}")),
    }
}

pub fn render_document(value: &Value) -> Result<String, String> {
    serde_yaml::to_string(value).map_err(|err| err.to_string())
}
