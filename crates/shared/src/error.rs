use thiserror::Error;

/// Why an inbound JSON payload could not be turned into typed records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("{entity}: expected a JSON array, got {found}")]
    NotArray {
        entity: &'static str,
        found: &'static str,
    },
    #[error("{entity}: expected a JSON object, got {found}")]
    NotObject {
        entity: &'static str,
        found: &'static str,
    },
    #[error("{entity}: missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    #[error("{entity}: field `{field}` has an invalid value: {detail}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        detail: String,
    },
    #[error("{entity}: invalid element at index {index}: {source}")]
    InvalidElement {
        entity: &'static str,
        index: usize,
        #[source]
        source: Box<PayloadError>,
    },
}

pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
