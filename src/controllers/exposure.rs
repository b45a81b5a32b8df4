//! Exposure Controller
//!
//! Watches Deployments and creates the Service (and optionally Ingress)
//! exposing the ones that opt in through annotations. Generated resources
//! are created once, never updated, and owned by their Deployment so that
//! cluster garbage collection removes them when the Deployment goes away.

use crate::cluster::{ClusterClient, CreateOutcome, KubeClusterClient};
use crate::desired::{self, DesiredResource};
use crate::error::{OperatorError, Result};
use crate::ownership;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Requeue delay after a transient reconciliation error
const ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Outcome of reconciling a single desired resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The resource was created by this reconcile
    Created,
    /// A resource owned by the same Deployment already exists
    AlreadyPresent,
}

/// Reconciliation context shared across triggers.
///
/// Holds the capability object through which all cluster access happens; the
/// watch machinery in [`ExposureController`] is just the trigger source.
pub struct Context {
    cluster: Arc<dyn ClusterClient>,
}

impl Context {
    /// Create a reconciliation context over the given cluster access
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    /// Reconcile one Deployment.
    ///
    /// The trigger is resolved to current state through the capability
    /// object; a Deployment that is gone or not opted in is a terminal
    /// no-op. Desired resources are applied in derivation order and a
    /// failure aborts the remainder for this trigger.
    pub async fn reconcile(&self, deployment: Arc<Deployment>) -> Result<Action> {
        let name = deployment.name_any();
        let namespace = deployment
            .namespace()
            .unwrap_or_else(|| "default".to_string());

        debug!("Reconciling Deployment {}/{}", namespace, name);

        let parent = match self.cluster.get_deployment(&namespace, &name).await? {
            Some(parent) => parent,
            None => {
                // Children cascade away with the parent, nothing to do.
                debug!("Deployment {}/{} no longer exists", namespace, name);
                return Ok(Action::await_change());
            }
        };

        let desired = desired::derive(&parent);
        if desired.is_empty() {
            debug!("Deployment {}/{} is not exposed, skipping", namespace, name);
            return Ok(Action::await_change());
        }

        for resource in desired {
            let kind = resource.kind();
            let resource_name = resource.name();
            match self.apply(&parent, &namespace, resource).await? {
                Outcome::Created => {
                    info!(
                        "Created {} {}/{} for Deployment {}",
                        kind, namespace, resource_name, name
                    );
                }
                Outcome::AlreadyPresent => {
                    debug!(
                        "{} {}/{} already present, leaving it untouched",
                        kind, namespace, resource_name
                    );
                }
            }
        }

        Ok(Action::await_change())
    }

    async fn apply(
        &self,
        parent: &Deployment,
        namespace: &str,
        resource: DesiredResource,
    ) -> Result<Outcome> {
        match resource {
            DesiredResource::Service(service) => {
                self.apply_service(parent, namespace, service).await
            }
            DesiredResource::Ingress(ingress) => {
                self.apply_ingress(parent, namespace, ingress).await
            }
        }
    }

    async fn apply_service(
        &self,
        parent: &Deployment,
        namespace: &str,
        mut service: Service,
    ) -> Result<Outcome> {
        let name = service.name_any();

        if let Some(existing) = self.cluster.get_service(namespace, &name).await? {
            return claim_existing(parent, &existing.metadata, "Service", namespace, &name);
        }

        service.metadata.owner_references = Some(vec![ownership::controller_reference(parent)]);
        match self.cluster.create_service(namespace, &service).await? {
            CreateOutcome::Created => Ok(Outcome::Created),
            CreateOutcome::AlreadyExists => {
                // Lost a create race against a concurrent reconcile; confirm
                // the winner belongs to the same Deployment.
                match self.cluster.get_service(namespace, &name).await? {
                    Some(existing) => {
                        claim_existing(parent, &existing.metadata, "Service", namespace, &name)
                    }
                    None => Err(OperatorError::Reconciliation(format!(
                        "Service {}/{} vanished while handling a create conflict",
                        namespace, name
                    ))),
                }
            }
        }
    }

    async fn apply_ingress(
        &self,
        parent: &Deployment,
        namespace: &str,
        mut ingress: Ingress,
    ) -> Result<Outcome> {
        let name = ingress.name_any();

        if let Some(existing) = self.cluster.get_ingress(namespace, &name).await? {
            return claim_existing(parent, &existing.metadata, "Ingress", namespace, &name);
        }

        ingress.metadata.owner_references = Some(vec![ownership::controller_reference(parent)]);
        match self.cluster.create_ingress(namespace, &ingress).await? {
            CreateOutcome::Created => Ok(Outcome::Created),
            CreateOutcome::AlreadyExists => {
                match self.cluster.get_ingress(namespace, &name).await? {
                    Some(existing) => {
                        claim_existing(parent, &existing.metadata, "Ingress", namespace, &name)
                    }
                    None => Err(OperatorError::Reconciliation(format!(
                        "Ingress {}/{} vanished while handling a create conflict",
                        namespace, name
                    ))),
                }
            }
        }
    }
}

/// Classify a same-named resource that already exists.
///
/// Owned by this Deployment means an earlier or concurrent reconcile created
/// it and there is nothing left to do. Any other owner is a hard conflict:
/// the resource is never adopted or overwritten.
fn claim_existing(
    parent: &Deployment,
    existing: &ObjectMeta,
    kind: &str,
    namespace: &str,
    name: &str,
) -> Result<Outcome> {
    if ownership::controlled_by(existing, parent) {
        Ok(Outcome::AlreadyPresent)
    } else {
        Err(OperatorError::OwnershipConflict(format!(
            "{} {}/{} exists but is not controlled by Deployment {}",
            kind,
            namespace,
            name,
            parent.name_any()
        )))
    }
}

/// Decide the follow-up for a failed reconcile.
///
/// An ownership conflict cannot be fixed by retrying; the Deployment is left
/// alone until it changes. Everything else is retried with a delay.
pub fn error_policy(
    deployment: Arc<Deployment>,
    error: &OperatorError,
    _ctx: Arc<Context>,
) -> Action {
    match error {
        OperatorError::OwnershipConflict(_) => {
            error!(
                "Ownership conflict for Deployment {}: {}",
                deployment.name_any(),
                error
            );
            Action::await_change()
        }
        _ => {
            error!(
                "Reconciliation error for Deployment {}: {}",
                deployment.name_any(),
                error
            );
            Action::requeue(ERROR_REQUEUE)
        }
    }
}

/// Watch bootstrap for the exposure controller
pub struct ExposureController {
    client: Client,
    namespace: Option<String>,
}

impl ExposureController {
    /// Create a controller watching all namespaces, or a single one
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    /// Run the exposure controller until shutdown
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let deployments: Api<Deployment> = match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let context = Arc::new(Context::new(Arc::new(KubeClusterClient::new(
            self.client.clone(),
        ))));

        info!("Starting exposure controller for Deployments");

        Controller::new(deployments, Config::default())
            .shutdown_on_signal()
            .run(
                |deployment, ctx| async move { ctx.reconcile(deployment).await },
                error_policy,
                context,
            )
            .for_each(|result| async move {
                match result {
                    Ok((obj, _action)) => {
                        debug!("Reconciled Deployment: {}", obj.name);
                    }
                    Err(e) => {
                        error!("Reconciliation failed: {:?}", e);
                    }
                }
            })
            .await;

        Ok(())
    }
}
