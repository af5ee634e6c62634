//! Error types for the FHIR client SDK.
//!
//! The SDK maps failures to semantic variants of a single [`Error`] enum:
//!
//! - [`Error::NotFound`]: the server reported a 404, or a resource/reference
//!   could not be resolved locally
//! - [`Error::OperationOutcome`]: any other non-2xx response, carrying the
//!   raw body for diagnostics
//! - [`Error::InvalidResponse`]: the response document's declared type does
//!   not match what the caller expected
//! - [`Error::InvalidField`]: a schema violation on field access
//! - [`Error::Argument`]: a malformed call detected before any request
//! - [`Error::NotSupported`]: a deliberately unimplemented operation
//! - [`Error::Network`]: transport-level failures, passed through unchanged
//!
//! No variant is ever recovered from internally: the SDK performs no retries
//! and no silent degradation, so every failure surfaces to the caller with
//! enough context to diagnose it.
//!
//! # Example
//!
//! ```rust,ignore
//! use fhir_client::Error;
//!
//! match client.resources("Patient").get("unknown-id").await {
//!     Ok(patient) => println!("found {patient}"),
//!     Err(Error::NotFound(body)) => println!("no such patient: {body}"),
//!     Err(Error::OperationOutcome { status, body }) => {
//!         println!("server rejected the request ({status}): {body}");
//!     }
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```

use thiserror::Error;

/// Unified error type for all SDK operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server reported a not-found status (HTTP 404), or a local
    /// resolution failed (unsaved resource, non-local reference).
    ///
    /// Carries the raw response body, or a description of the failed
    /// resolution.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The server returned a non-2xx status other than 404.
    ///
    /// Carries the raw response body so the outcome can be diagnosed
    /// without re-running the request with added instrumentation.
    #[error("operation outcome (status {status}): {body}")]
    OperationOutcome {
        /// The HTTP status code of the response.
        status: u16,
        /// The raw response body.
        body: String,
    },

    /// The response document's declared type does not match what the caller
    /// expected (wrong bundle type, or a `get()` returning a mismatched
    /// resource type).
    #[error("invalid response: expected {expected} but received {actual}")]
    InvalidResponse {
        /// What the caller expected to receive.
        expected: String,
        /// What was actually received.
        actual: String,
    },

    /// A field access violated the client's schema for this resource type.
    ///
    /// Names the offending key and the full permitted key set.
    #[error("invalid key `{key}`, possible keys are `{allowed}`")]
    InvalidField {
        /// The key that is not permitted.
        key: String,
        /// The sorted, comma-separated permitted key set.
        allowed: String,
    },

    /// A malformed call was detected before any request was issued.
    #[error("{0}")]
    Argument(String),

    /// The operation is deliberately unimplemented.
    #[error("`{0}` is not supported")]
    NotSupported(&'static str),

    /// A transport-level failure (connection, timeout, TLS).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Builds an [`Error::InvalidResponse`] from expected/actual descriptions.
    pub(crate) fn invalid_response(
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidResponse {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Builds an [`Error::InvalidField`] naming the offending key and the
    /// permitted set, sorted for stable messages.
    pub(crate) fn invalid_field(key: &str, allowed: impl IntoIterator<Item = String>) -> Self {
        let mut keys: Vec<String> = allowed.into_iter().collect();
        keys.sort();
        Self::InvalidField {
            key: key.to_string(),
            allowed: keys.join(", "),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_carries_body() {
        let error = Error::NotFound("Patient with id 1 does not exist".to_string());
        assert!(error.to_string().contains("Patient with id 1"));
    }

    #[test]
    fn test_operation_outcome_message_includes_status_and_body() {
        let error = Error::OperationOutcome {
            status: 422,
            body: r#"{"issue":[{"severity":"error"}]}"#.to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("422"));
        assert!(message.contains("severity"));
    }

    #[test]
    fn test_invalid_response_names_both_types() {
        let error = Error::invalid_response("Bundle", "OperationOutcome");
        assert_eq!(
            error.to_string(),
            "invalid response: expected Bundle but received OperationOutcome"
        );
    }

    #[test]
    fn test_invalid_field_lists_sorted_keys() {
        let error = Error::invalid_field("zzz", ["name", "birthDate", "id"].map(String::from));
        assert_eq!(
            error.to_string(),
            "invalid key `zzz`, possible keys are `birthDate, id, name`"
        );
    }

    #[test]
    fn test_not_supported_names_operation() {
        let error = Error::NotSupported("revinclude");
        assert_eq!(error.to_string(), "`revinclude` is not supported");
    }

    #[test]
    fn test_error_implements_std_error() {
        let error: &dyn std::error::Error = &Error::NotSupported("revinclude");
        let _ = error;
    }
}
