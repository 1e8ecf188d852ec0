// ── Core error types ──
//
// Failures are contained at the device-poll or single-leaf level; these
// types exist so each level can log a precise reason. Only building the
// device registry can fail as a whole.

use thiserror::Error;

use crate::model::ValueType;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Registry errors ──────────────────────────────────────────────
    /// The HTTP client of a device could not be set up (bad URL, CA file).
    #[error("Cannot set up agent client for '{device}': {source}")]
    Client {
        device: String,
        #[source]
        source: nscpoll_api::Error,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// A response body that does not match its check's schema.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed {shape} payload: {message}")]
    Schema {
        shape: &'static str,
        message: String,
    },

    #[error("{command} returned no result lines")]
    NoResultLines { command: String },

    #[error("{command} returned unknown severity {value}")]
    UnknownSeverity { command: String, value: i64 },
}

/// The state store rejected a declaration or a write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object '{id}' has not been declared")]
    UnknownObject { id: String },

    #[error("object '{id}' is not a state")]
    NotAState { id: String },

    #[error("state '{id}' is declared {declared} but received a {actual} value")]
    TypeMismatch {
        id: String,
        declared: ValueType,
        actual: ValueType,
    },

    #[error("invalid object id '{id}'")]
    InvalidId { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_name_the_device() {
        let err = CoreError::Client {
            device: "Srv1".into(),
            source: nscpoll_api::Error::Tls("bad pem".into()),
        };
        assert_eq!(
            err.to_string(),
            "Cannot set up agent client for 'Srv1': TLS error: bad pem"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn store_errors_describe_type_mismatch() {
        let err = StoreError::TypeMismatch {
            id: "Srv1.online".into(),
            declared: ValueType::Boolean,
            actual: ValueType::Number,
        };
        assert_eq!(
            err.to_string(),
            "state 'Srv1.online' is declared boolean but received a number value"
        );
    }
}
