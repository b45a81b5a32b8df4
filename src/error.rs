//! Error types for the Exposer Kubernetes Operator

use std::fmt;

/// Result type alias for operator operations
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Errors that can occur during operator operations
///
/// Absence is not an error here: lookups report a missing resource as
/// `Option::None` and creates report an existing one as a benign outcome,
/// so the variants below all describe reconciles that genuinely failed.
#[derive(Debug)]
pub enum OperatorError {
    /// Kubernetes API error
    KubeApi(String),
    /// A generated resource already exists but is controlled by someone else
    OwnershipConflict(String),
    /// Reconciliation error
    Reconciliation(String),
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorError::KubeApi(msg) => write!(f, "Kubernetes API error: {}", msg),
            OperatorError::OwnershipConflict(msg) => write!(f, "Ownership conflict: {}", msg),
            OperatorError::Reconciliation(msg) => write!(f, "Reconciliation error: {}", msg),
        }
    }
}

impl std::error::Error for OperatorError {}

impl From<kube::Error> for OperatorError {
    fn from(err: kube::Error) -> Self {
        OperatorError::KubeApi(err.to_string())
    }
}
