//! Exposer Kubernetes Operator
//!
//! A Kubernetes operator that exposes Deployments through generated Services
//! and Ingresses, driven by annotations on the Deployment itself.
//!
//! ## Annotations
//!
//! - `expose: "true"`: generate a Service named `<name>-svc` targeting the
//!   Deployment's pod template labels on port 80
//! - `expose/type: "ingress"`: additionally generate an Ingress `<name>-ing`
//!   routing the host `<name>.local` to that Service
//!
//! Generated resources are created once and owned by the Deployment, so they
//! are garbage collected with it and never updated or adopted afterwards.
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: apps/v1
//! kind: Deployment
//! metadata:
//!   name: web
//!   annotations:
//!     expose: "true"
//!     expose/type: "ingress"
//! spec:
//!   template:
//!     metadata:
//!       labels:
//!         app: web
//! ```

pub mod cluster;
pub mod controllers;
pub mod desired;
pub mod error;
pub mod ownership;

pub use cluster::{ClusterClient, CreateOutcome, KubeClusterClient};
pub use controllers::{Context, ExposureController};
pub use desired::DesiredResource;
pub use error::{OperatorError, Result};
