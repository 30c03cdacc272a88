use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the exception handling layer itself.
///
/// These never reach the client: a failure here either falls back to the generic
/// error record or leaves the original exception to be re-raised. They are reported
/// on the log record of the exception being handled.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures of the in-flight response channel.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("Response has already started; headers and status are frozen")]
    AlreadyStarted,

    #[error("Response was aborted by the transport: {reason}")]
    Aborted { reason: String },
}

impl ResponseError {
    /// Whether the failure means bytes may already be on the wire.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::AlreadyStarted | Self::Aborted { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Public exception has an empty message (code: {code:?})")]
    EmptyMessage { code: Option<String> },

    #[error("Conversion failed: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("Failed to serialize error envelope: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
