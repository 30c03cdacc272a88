use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Public error contract returned to clients
///
/// Derived fresh for every wrapped exception. Only the converter builds it, so whatever
/// ends up in here is considered safe to show.
///
/// # Example
/// ```
/// use meshestra_exception_handling::common::{ErrorEnvelope, ErrorRecord};
///
/// let record = ErrorRecord::new("Blog not found").with_code("Blog:00001");
/// let json = serde_json::to_value(ErrorEnvelope::new(record)).unwrap();
///
/// assert_eq!(json["error"]["code"], "Blog:00001");
/// assert_eq!(json["error"]["details"], serde_json::Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub code: Option<String>,

    pub message: String,

    pub details: Option<String>,

    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
}

/// A single field-level violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,

    #[serde(default)]
    pub members: Vec<String>,
}

impl ValidationError {
    pub fn new<I, S>(message: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            details: None,
            data: Map::new(),
            validation_errors: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Wire payload: `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorRecord,
}

impl ErrorEnvelope {
    pub fn new(error: ErrorRecord) -> Self {
        Self { error }
    }
}

impl From<ErrorRecord> for ErrorEnvelope {
    fn from(error: ErrorRecord) -> Self {
        Self::new(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_wire_shape() {
        let mut record = ErrorRecord::new("One or more validation errors occurred.");
        record
            .validation_errors
            .push(ValidationError::new("required", ["name"]));

        let value = serde_json::to_value(ErrorEnvelope::new(record)).unwrap();

        assert_eq!(
            value,
            json!({
                "error": {
                    "code": null,
                    "message": "One or more validation errors occurred.",
                    "details": null,
                    "data": {},
                    "validationErrors": [{"message": "required", "members": ["name"]}]
                }
            })
        );
    }
}
