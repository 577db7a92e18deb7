use std::time::Duration;

use http::StatusCode;

/// Trait for domain errors that a transport layer turns into HTTP responses
///
/// Implemented by the error types of the feature crates so the mapping to
/// status codes lives next to the errors themselves, while the crates stay
/// independent of any particular web framework.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `overloaded_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Value for a `Retry-After` header, when the caller should back off
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
