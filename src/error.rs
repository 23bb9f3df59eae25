//! Error types for the convergence engine.
//!
//! This module provides the error hierarchy for every stage of a
//! reconciliation pass: manifest loading, transport, lookup, long-running
//! operations and the reconciler itself.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the convergence engine.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Manifest and credential errors, raised before the core runs.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport-level errors from the retrying client.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Errors while locating a resource by name.
    #[error("Locate error: {0}")]
    Locate(#[from] LocateError),

    /// A long-running operation finished badly.
    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Manifest, validation and credential errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Manifest not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Manifest validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Duplicate resource definition.
    #[error("Duplicate {kind} name '{name}' in folder {folder_id}")]
    DuplicateName {
        /// Resource kind (disk, instance).
        kind: String,
        /// Folder the name is declared in.
        folder_id: String,
        /// The duplicated name.
        name: String,
    },

    /// Zero or more than one credential was supplied.
    #[error("Invalid credentials: {message}")]
    Credentials {
        /// Description of the credential problem.
        message: String,
    },
}

/// Errors surfaced by the retrying client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The API answered with a non-retriable status.
    #[error("{target} failed with status {status}: {message}")]
    Status {
        /// Method and path of the failed call.
        target: String,
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Every attempt failed with a retriable status.
    #[error("{target} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Method and path of the failed call.
        target: String,
        /// Number of attempts made.
        attempts: u32,
        /// Description of the last failure.
        last_error: String,
    },

    /// The request never reached the API.
    #[error("Network error on {target}: {message}")]
    Network {
        /// Method and path of the failed call.
        target: String,
        /// Description of the network error.
        message: String,
    },

    /// A single attempt exceeded the per-call timeout.
    #[error("{target} timed out after {timeout_ms}ms")]
    Timeout {
        /// Method and path of the failed call.
        target: String,
        /// Per-call timeout in milliseconds.
        timeout_ms: u128,
    },

    /// The API answered with something we could not decode.
    #[error("Invalid response from {target}: {message}")]
    InvalidResponse {
        /// Method and path of the failed call.
        target: String,
        /// Description of the response issue.
        message: String,
    },

    /// A bearer token could not be obtained or was rejected.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Description of the auth failure.
        message: String,
    },
}

/// Errors raised by the name-based resource lookup.
#[derive(Debug, Error)]
pub enum LocateError {
    /// The list call failed.
    #[error("Failed to find {kind} '{name}' in folder {folder_id}: {source}")]
    Failed {
        /// Resource kind.
        kind: String,
        /// Folder searched.
        folder_id: String,
        /// Name searched for.
        name: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A name that must be unique matched several resources.
    #[error("{count} {kind}s named '{name}' found in folder {folder_id}, expected at most one")]
    Ambiguous {
        /// Resource kind.
        kind: String,
        /// Folder searched.
        folder_id: String,
        /// Name searched for.
        name: String,
        /// Number of matches returned.
        count: usize,
    },
}

/// Terminal failures of long-running operations.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The operation finished with an error payload.
    #[error("Operation {operation_id} failed with code {code}: {message}")]
    Failed {
        /// Operation identifier.
        operation_id: String,
        /// Remote error code.
        code: i32,
        /// Remote error message.
        message: String,
    },

    /// The operation did not finish within the wait timeout.
    #[error("Operation {operation_id} did not finish within {waited_secs}s")]
    TimedOut {
        /// Operation identifier.
        operation_id: String,
        /// Seconds spent waiting.
        waited_secs: u64,
    },

    /// The wait was cancelled by the caller.
    #[error("Wait for operation {operation_id} was cancelled")]
    Cancelled {
        /// Operation identifier.
        operation_id: String,
    },

    /// The finished operation does not name the resource it produced.
    #[error("Operation {operation_id} finished without '{key}' in its metadata")]
    MissingResourceId {
        /// Operation identifier.
        operation_id: String,
        /// Metadata key that was expected.
        key: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The target lifecycle needs an existing resource and there is none.
    #[error("not found {kind} with name '{name}'")]
    NotFound {
        /// Resource kind.
        kind: String,
        /// Name searched for.
        name: String,
    },

    /// The resource kind has no such capability.
    #[error("{kind} does not support {action}")]
    Unsupported {
        /// Resource kind.
        kind: String,
        /// Action that was requested.
        action: String,
    },

    /// A step of the reconciliation sequence failed.
    #[error("failed to {step} {kind} '{name}': {source}")]
    Step {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
        /// Step that failed (create, wait, fetch, ...).
        step: String,
        /// Underlying error.
        #[source]
        source: Box<ConvergeError>,
    },
}

/// Result type alias for convergence operations.
pub type Result<T> = std::result::Result<T, ConvergeError>;

impl ConvergeError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is worth retrying at the transport layer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Network { .. }))
    }

    /// Returns the innermost error, looking through reconciliation step wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Reconcile(ReconcileError::Step { source, .. }) => source.root_cause(),
            other => other,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a credentials error.
    #[must_use]
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }
}

impl TransportError {
    /// Creates a status error.
    #[must_use]
    pub fn status(target: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            target: target.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            target: target.into(),
            message: message.into(),
        }
    }
}

impl ReconcileError {
    /// Wraps an error with the step and resource it happened on.
    #[must_use]
    pub fn step(kind: &str, name: &str, step: &str, source: ConvergeError) -> Self {
        Self::Step {
            kind: kind.to_string(),
            name: name.to_string(),
            step: step.to_string(),
            source: Box::new(source),
        }
    }

    /// Creates an unsupported-capability error.
    #[must_use]
    pub fn unsupported(kind: &str, action: &str) -> Self {
        Self::Unsupported {
            kind: kind.to_string(),
            action: action.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_steps() {
        let inner = ConvergeError::Operation(OperationError::Failed {
            operation_id: String::from("op-1"),
            code: 9,
            message: String::from("quota exceeded"),
        });
        let err: ConvergeError = ReconcileError::step("disk", "data-1", "wait for", inner).into();

        assert!(matches!(
            err.root_cause(),
            ConvergeError::Operation(OperationError::Failed { code: 9, .. })
        ));
        assert_eq!(
            err.to_string(),
            "Reconciliation error: failed to wait for disk 'data-1': \
             Operation error: Operation op-1 failed with code 9: quota exceeded"
        );
    }

    #[test]
    fn test_only_network_errors_are_retryable() {
        let network = ConvergeError::Transport(TransportError::network("GET /x", "refused"));
        let status = ConvergeError::Transport(TransportError::status("GET /x", 400, "bad"));

        assert!(network.is_retryable());
        assert!(!status.is_retryable());
    }
}
