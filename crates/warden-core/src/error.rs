//! Error types shared across the Warden workspace.
//!
//! Capacity outcomes (ceiling reached, latency projection exceeded) are
//! *not* errors; they are ordinary admission decisions. The types here
//! cover the two places where a collaborator can genuinely fail: the
//! inference backend and the cross-thread ingress channel.

use std::error::Error;
use std::fmt;

/// Errors reported by an [`InferenceBackend`](crate::InferenceBackend).
///
/// A failed batch is dropped in full; the scheduler never retries
/// within the same cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// The backend ran but could not produce actions.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The backend returned a different number of actions than inputs.
    ShapeMismatch {
        /// Number of inputs dispatched.
        expected: usize,
        /// Number of actions returned.
        actual: usize,
    },
    /// The backend is not ready to serve (e.g. model still loading).
    Unavailable,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "inference failed: {reason}"),
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "backend returned {actual} actions for {expected} inputs")
            }
            Self::Unavailable => write!(f, "inference backend unavailable"),
        }
    }
}

impl Error for BackendError {}

/// Errors from submitting work through the cross-thread ingress channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngressError {
    /// The channel is at capacity; the message was not queued.
    Full,
    /// The orchestrator has been dropped.
    Disconnected,
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "ingress channel full"),
            Self::Disconnected => write!(f, "orchestrator disconnected"),
        }
    }
}

impl Error for IngressError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_display_mentions_counts() {
        let msg = BackendError::ShapeMismatch {
            expected: 4,
            actual: 3,
        }
        .to_string();
        assert!(msg.contains('4') && msg.contains('3'), "got: {msg}");
    }

    #[test]
    fn ingress_error_display() {
        assert_eq!(IngressError::Full.to_string(), "ingress channel full");
    }
}
