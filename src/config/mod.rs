use crate::error::ConfigError;
use crate::response::finalizer::ERROR_FORMAT_HEADER;
use axum::http::{HeaderName, StatusCode};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

pub const SEND_DETAILS_KEY: &str = "EXCEPTION_HANDLING_SEND_DETAILS";
pub const ERROR_HEADER_KEY: &str = "EXCEPTION_HANDLING_ERROR_HEADER";
pub const STATUS_MAP_KEY: &str = "EXCEPTION_HANDLING_STATUS_MAP";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Seeded from the process environment.
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Policy knobs of the exception handling layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionHandlingOptions {
    /// Put the raw message and cause summary of internal exceptions in `details`.
    pub send_exception_details: bool,

    /// Marker header set on wrapped error responses.
    pub error_header: String,

    /// Error code to HTTP status, consulted before classification.
    pub status_code_map: HashMap<String, u16>,
}

impl Default for ExceptionHandlingOptions {
    fn default() -> Self {
        Self {
            send_exception_details: false,
            error_header: ERROR_FORMAT_HEADER.to_string(),
            status_code_map: HashMap::new(),
        }
    }
}

impl ExceptionHandlingOptions {
    /// Read options from `config`, falling back to defaults for missing keys.
    ///
    /// The status map is written as `Code=Status` pairs separated by commas, e.g.
    /// `Blog:00001=404,Blog:00002=409`.
    pub fn from_config(config: &ConfigService) -> Result<Self, ConfigError> {
        let mut options = Self::default();

        if let Some(raw) = config.get(SEND_DETAILS_KEY) {
            options.send_exception_details = parse_bool(SEND_DETAILS_KEY, &raw)?;
        }

        if let Some(raw) = config.get(ERROR_HEADER_KEY) {
            options.error_header = raw.trim().to_string();
        }

        if let Some(raw) = config.get(STATUS_MAP_KEY) {
            options.status_code_map = parse_status_map(&raw)?;
        }

        options.error_header()?;
        options.status_codes()?;
        Ok(options)
    }

    pub fn error_header(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::try_from(self.error_header.as_str())
            .map_err(|e| ConfigError::invalid(ERROR_HEADER_KEY, e.to_string()))
    }

    pub fn status_codes(&self) -> Result<HashMap<String, StatusCode>, ConfigError> {
        self.status_code_map
            .iter()
            .map(|(code, status)| {
                StatusCode::from_u16(*status)
                    .map(|status| (code.clone(), status))
                    .map_err(|e| ConfigError::invalid(STATUS_MAP_KEY, format!("{code}: {e}")))
            })
            .collect()
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("not a boolean: {other}"))),
    }
}

fn parse_status_map(raw: &str) -> Result<HashMap<String, u16>, ConfigError> {
    let mut map = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((code, status)) = pair.rsplit_once('=') else {
            return Err(ConfigError::invalid(
                STATUS_MAP_KEY,
                format!("expected Code=Status, got {pair:?}"),
            ));
        };
        let status = status
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::invalid(STATUS_MAP_KEY, format!("{pair}: {e}")))?;
        map.insert(code.trim().to_string(), status);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_keys_missing() {
        let options = ExceptionHandlingOptions::from_config(&ConfigService::default()).unwrap();
        assert_eq!(options, ExceptionHandlingOptions::default());
        assert!(!options.send_exception_details);
    }

    #[test]
    fn test_from_config() {
        let config = ConfigService::default();
        config.set(SEND_DETAILS_KEY, "true");
        config.set(ERROR_HEADER_KEY, "x-error-format");
        config.set(STATUS_MAP_KEY, "Blog:00001=404, Blog:00002=409");

        let options = ExceptionHandlingOptions::from_config(&config).unwrap();

        assert!(options.send_exception_details);
        assert_eq!(options.error_header().unwrap(), "x-error-format");
        let codes = options.status_codes().unwrap();
        assert_eq!(codes["Blog:00001"], StatusCode::NOT_FOUND);
        assert_eq!(codes["Blog:00002"], StatusCode::CONFLICT);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = ConfigService::default();
        config.set(SEND_DETAILS_KEY, "maybe");
        assert!(ExceptionHandlingOptions::from_config(&config).is_err());

        let config = ConfigService::default();
        config.set(STATUS_MAP_KEY, "Blog:00001");
        assert!(ExceptionHandlingOptions::from_config(&config).is_err());

        let config = ConfigService::default();
        config.set(STATUS_MAP_KEY, "Blog:00001=42");
        assert!(ExceptionHandlingOptions::from_config(&config).is_err());

        let config = ConfigService::default();
        config.set(ERROR_HEADER_KEY, "not a header");
        assert!(ExceptionHandlingOptions::from_config(&config).is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let options: ExceptionHandlingOptions =
            serde_json::from_str(r#"{"send_exception_details": true}"#).unwrap();
        assert!(options.send_exception_details);
        assert_eq!(options.error_header, ERROR_FORMAT_HEADER);
    }
}
