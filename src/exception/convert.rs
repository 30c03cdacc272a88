use crate::common::{ErrorRecord, ValidationError};
use crate::error::ConversionError;
use crate::exception::{ErrorKind, Exception};
use std::fmt::Write as _;

/// Public message of every exception that was not authored for the client
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred.";

/// Public message of validation failures; the violations carry the specifics
pub const VALIDATION_ERROR_MESSAGE: &str = "One or more validation errors occurred.";

const VALIDATION_DETAILS_HEADER: &str = "The following errors were detected during validation.";

/// Converts an exception into the public error contract
pub trait ErrorInfoConverter: Send + Sync + 'static {
    fn try_convert(&self, exception: &Exception) -> Result<ErrorRecord, ConversionError>;

    /// Infallible conversion: any failure yields the generic internal error record.
    fn convert(&self, exception: &Exception) -> ErrorRecord {
        self.try_convert(exception)
            .unwrap_or_else(|_| ErrorRecord::new(INTERNAL_ERROR_MESSAGE))
    }
}

/// Default conversion policy
///
/// Validation failures list their violations, business exceptions surface what they
/// were built with, and everything else collapses to [`INTERNAL_ERROR_MESSAGE`].
/// With `send_details` the raw message of an internal exception and a one-line summary
/// of each cause are put in `details`. Backtraces are never included.
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorInfoConverter {
    send_details: bool,
}

impl DefaultErrorInfoConverter {
    pub fn new(send_details: bool) -> Self {
        Self { send_details }
    }

    fn convert_validation(&self, violations: &[ValidationError]) -> ErrorRecord {
        let mut record = ErrorRecord::new(VALIDATION_ERROR_MESSAGE);
        if !violations.is_empty() {
            let mut details = String::from(VALIDATION_DETAILS_HEADER);
            for violation in violations {
                let _ = write!(details, "\n - {}", violation.message);
            }
            record.details = Some(details);
        }
        record.validation_errors = violations.to_vec();
        record
    }

    fn convert_public(&self, exception: &Exception) -> Result<ErrorRecord, ConversionError> {
        if exception.message().trim().is_empty() {
            return Err(ConversionError::EmptyMessage {
                code: exception.code().map(str::to_string),
            });
        }

        let mut record = ErrorRecord::new(exception.message());
        record.code = exception.code().map(str::to_string);
        record.details = exception.details().map(str::to_string);
        record.data = exception.data().clone();
        Ok(record)
    }

    fn convert_internal(&self, exception: &Exception) -> ErrorRecord {
        let mut record = ErrorRecord::new(INTERNAL_ERROR_MESSAGE);
        if self.send_details {
            record.details = Some(summarize(exception));
        }
        record
    }
}

impl ErrorInfoConverter for DefaultErrorInfoConverter {
    fn try_convert(&self, exception: &Exception) -> Result<ErrorRecord, ConversionError> {
        if exception.kind() == ErrorKind::Validation {
            return Ok(self.convert_validation(exception.violations()));
        }

        if exception.is_public() {
            return self.convert_public(exception);
        }

        Ok(self.convert_internal(exception))
    }
}

/// Raw message of the outermost exception followed by one line per cause.
fn summarize(exception: &Exception) -> String {
    let mut summary = exception.message().to_string();
    for cause in exception.chain() {
        let _ = write!(summary, "\nCaused by: {}", cause);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_violations_in_order() {
        let ex = Exception::validation([
            ValidationError::new("required", ["name"]),
            ValidationError::new("too long", ["title", "slug"]),
        ]);

        let record = DefaultErrorInfoConverter::default().convert(&ex);

        assert_eq!(record.message, VALIDATION_ERROR_MESSAGE);
        assert_eq!(record.code, None);
        assert_eq!(
            record.validation_errors,
            vec![
                ValidationError::new("required", ["name"]),
                ValidationError::new("too long", ["title", "slug"]),
            ]
        );
        assert_eq!(
            record.details.as_deref(),
            Some("The following errors were detected during validation.\n - required\n - too long")
        );
    }

    #[test]
    fn test_business_surfaces_code_message_data() {
        let ex = Exception::business("Blog:00001", "Blog not found")
            .with_kind(ErrorKind::NotFound)
            .with_data("blogId", 42)
            .with_details("The blog may have been deleted by its author.")
            .with_source(Exception::internal("select * from blogs returned 0 rows"));

        let record = DefaultErrorInfoConverter::default().convert(&ex);

        assert_eq!(record.code.as_deref(), Some("Blog:00001"));
        assert_eq!(record.message, "Blog not found");
        assert_eq!(
            record.details.as_deref(),
            Some("The blog may have been deleted by its author.")
        );
        assert_eq!(record.data.get("blogId"), Some(&json!(42)));
    }

    #[test]
    fn test_internal_hides_message() {
        let ex = Exception::internal("connection string leaked: postgres://admin:hunter2@db");

        let record = DefaultErrorInfoConverter::default().convert(&ex);

        assert_eq!(record.message, INTERNAL_ERROR_MESSAGE);
        assert_eq!(record.code, None);
        assert_eq!(record.details, None);
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_internal_hides_code_and_data() {
        let ex = Exception::conflict("row version mismatch")
            .with_code("Db:Concurrency")
            .with_data("table", "blogs");

        let record = DefaultErrorInfoConverter::default().convert(&ex);

        assert_eq!(record.code, None);
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_send_details_summarizes_chain() {
        let query = Exception::internal("query failed").with_source(Exception::internal("timeout"));
        let ex = Exception::internal("failed to load blog").with_source(query);

        let record = DefaultErrorInfoConverter::new(true).convert(&ex);

        assert_eq!(record.message, INTERNAL_ERROR_MESSAGE);
        assert_eq!(
            record.details.as_deref(),
            Some("failed to load blog\nCaused by: query failed\nCaused by: timeout")
        );
    }

    #[test]
    fn test_empty_public_message_falls_back() {
        let converter = DefaultErrorInfoConverter::default();
        let ex = Exception::business("Blog:00003", "   ");

        assert!(matches!(
            converter.try_convert(&ex),
            Err(ConversionError::EmptyMessage { .. })
        ));

        let record = converter.convert(&ex);
        assert_eq!(record, ErrorRecord::new(INTERNAL_ERROR_MESSAGE));
    }
}
