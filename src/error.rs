//! Error types for the bridge.

use safejni_core::AttachError;
use thiserror::Error;

/// Errors that can occur when calling into the JVM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The calling thread could not obtain an environment.
    #[error("failed to attach thread to the Java VM: {source}")]
    AttachFailure {
        #[from]
        source: AttachError,
    },

    /// Class lookup failed.
    #[error("class not found: {class}")]
    ClassNotFound { class: String },

    /// Method lookup failed for the derived signature.
    #[error("{kind} method not found: {class}.{method}{signature}", kind = method_kind(.is_static))]
    MethodNotFound {
        class: String,
        method: String,
        signature: String,
        is_static: bool,
    },

    /// Managed code threw; the exception has been cleared.
    #[error("Java exception: {message}")]
    ForeignException { message: String },

    /// A constructor or allocation returned null without raising.
    #[error("unexpected null result from {what}")]
    NullResult { what: &'static str },

    /// A native sequence does not fit in a Java array.
    #[error("sequence of {len} elements exceeds the maximum Java array length")]
    ArrayTooLarge { len: usize },
}

impl Error {
    /// Create a "class not found" error.
    pub fn class_not_found(class: impl Into<String>) -> Self {
        Error::ClassNotFound { class: class.into() }
    }

    /// Create a "method not found" error.
    pub fn method_not_found(class: impl Into<String>, method: impl Into<String>, signature: impl Into<String>, is_static: bool) -> Self {
        Error::MethodNotFound {
            class: class.into(),
            method: method.into(),
            signature: signature.into(),
            is_static,
        }
    }

    /// Create a foreign exception error.
    pub fn foreign(message: impl Into<String>) -> Self {
        Error::ForeignException {
            message: message.into(),
        }
    }

    /// Whether this error came from managed code.
    pub fn is_foreign_exception(&self) -> bool {
        matches!(self, Error::ForeignException { .. })
    }
}

fn method_kind(is_static: &bool) -> &'static str {
    if *is_static { "static" } else { "instance" }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
