//! Controllers for the Exposer Kubernetes Operator
//!
//! Each controller watches a resource kind and reconciles the actual cluster
//! state with the state derived from it.

mod exposure;

pub use exposure::{error_policy, Context, ExposureController, Outcome};
