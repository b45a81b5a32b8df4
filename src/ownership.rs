//! Owner references linking generated resources to their Deployment.
//!
//! A generated resource carries exactly one controller reference, pointing at
//! the Deployment it was derived from. Kubernetes garbage collection uses it
//! to cascade-delete the resource with its parent, and the controller uses it
//! to refuse same-named resources that belong to someone else.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

/// Build the controller reference stamped on every generated resource
pub fn controller_reference(deployment: &Deployment) -> OwnerReference {
    OwnerReference {
        api_version: Deployment::api_version(&()).to_string(),
        kind: Deployment::kind(&()).to_string(),
        name: deployment.name_any(),
        uid: deployment.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// The controller owner of a resource, if it has one
pub fn controller_of(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|reference| reference.controller == Some(true))
}

/// Whether the resource is controller-owned by this Deployment.
///
/// Comparison is by uid; a uid-less parent (never served by a real API
/// server) falls back to kind and name.
pub fn controlled_by(meta: &ObjectMeta, deployment: &Deployment) -> bool {
    let Some(controller) = controller_of(meta) else {
        return false;
    };
    match deployment.metadata.uid.as_deref() {
        Some(uid) => controller.uid == uid,
        None => {
            controller.kind == Deployment::kind(&()) && controller.name == deployment.name_any()
        }
    }
}
