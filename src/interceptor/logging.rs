use crate::error::Error;
use crate::exception::Exception;
use axum::http::{Method, StatusCode, Uri};
use std::time::Duration;
use tracing::Level;

/// What the exception interceptor did with a caught exception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    ResponseStarted,
    Unclassified,
    Wrapped(StatusCode),
    /// The channel started or aborted while the wrapped error was being written.
    WriteFailed,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::ResponseStarted => "rethrown_response_started",
            Outcome::Unclassified => "rethrown_unclassified",
            Outcome::Wrapped(_) => "wrapped",
            Outcome::WriteFailed => "rethrown_write_failed",
        }
    }
}

pub(crate) struct RequestLine {
    pub method: Method,
    pub uri: Uri,
    pub elapsed: Duration,
}

macro_rules! event_at {
    ($level:expr, $($args:tt)+) => {{
        let level: Level = $level;
        if level == Level::ERROR {
            tracing::error!($($args)+)
        } else if level == Level::WARN {
            tracing::warn!($($args)+)
        } else if level == Level::INFO {
            tracing::info!($($args)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($args)+)
        } else {
            tracing::trace!($($args)+)
        }
    }};
}

/// Emit the single record for a caught exception, with everything needed to diagnose it.
pub(crate) fn log_exception(
    exception: &Exception,
    outcome: Outcome,
    request: &RequestLine,
    failures: &[Error],
) {
    let chain = exception
        .chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(" <- ");
    let status = match outcome {
        Outcome::Wrapped(status) => Some(status.as_u16()),
        _ => None,
    };
    let failures = failures
        .iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    // Bytes may be on the wire, so these are never quieter than a warning.
    let loud = if exception.log_level() == Level::ERROR {
        Level::ERROR
    } else {
        Level::WARN
    };

    match outcome {
        Outcome::ResponseStarted => {
            event_at!(
                loud,
                method = %request.method,
                uri = %request.uri,
                elapsed_ms = request.elapsed.as_millis() as u64,
                outcome = outcome.as_str(),
                exception.kind = %exception.kind(),
                exception.code = ?exception.code(),
                exception.message = exception.message(),
                exception.chain = %chain,
                exception.backtrace = %exception.backtrace(),
                "Response already started; cannot wrap exception"
            );
        }
        Outcome::WriteFailed => {
            event_at!(
                loud,
                method = %request.method,
                uri = %request.uri,
                elapsed_ms = request.elapsed.as_millis() as u64,
                outcome = outcome.as_str(),
                exception.kind = %exception.kind(),
                exception.code = ?exception.code(),
                exception.message = exception.message(),
                exception.chain = %chain,
                exception.backtrace = %exception.backtrace(),
                failures = %failures,
                "Could not write wrapped error; re-raising exception"
            );
        }
        Outcome::Unclassified | Outcome::Wrapped(_) => {
            event_at!(
                exception.log_level(),
                method = %request.method,
                uri = %request.uri,
                elapsed_ms = request.elapsed.as_millis() as u64,
                outcome = outcome.as_str(),
                http.status = ?status,
                exception.kind = %exception.kind(),
                exception.code = ?exception.code(),
                exception.message = exception.message(),
                exception.chain = %chain,
                exception.backtrace = %exception.backtrace(),
                failures = %failures,
                "Unhandled exception: {}",
                exception
            );
        }
    }
}
