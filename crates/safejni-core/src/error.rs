//! Backend-level errors.

use thiserror::Error;

/// Failure to obtain an environment for the calling thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// No VM has been registered with the bridge.
    #[error("no Java VM has been registered; initialise the bridge first")]
    NotInitialized,

    /// The VM refused to attach the thread.
    #[error("the Java VM rejected thread attachment (status {status})")]
    Rejected { status: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            AttachError::Rejected { status: -1 }.to_string(),
            "the Java VM rejected thread attachment (status -1)"
        );
        assert!(AttachError::NotInitialized.to_string().contains("initialise"));
    }
}
