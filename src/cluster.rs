//! Cluster state access for the exposure controller.
//!
//! Every read and write the controller performs goes through the
//! [`ClusterClient`] trait, which spells out the exact resource kinds it may
//! touch: Deployments are read, Services and Ingresses are read and created.
//! No other kind or verb is reachable from the reconciliation core, and no
//! process-wide type registration is involved.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, PostParams};
use kube::Client;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Outcome of a create call against the cluster.
///
/// An existing same-named resource is not an error at this layer; whether it
/// is benign or a conflict depends on ownership, which the caller decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The resource was created by this call
    Created,
    /// A resource with this name already existed
    AlreadyExists,
}

/// Capability object for cluster access
///
/// Lookups resolve a missing resource to `None` instead of an error, and
/// creates resolve a name collision to [`CreateOutcome::AlreadyExists`].
/// Anything else the API server reports is surfaced as an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Get a Deployment by namespace and name
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>>;

    /// Get a Service by namespace and name
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>>;

    /// Create a Service in the given namespace
    async fn create_service(&self, namespace: &str, service: &Service) -> Result<CreateOutcome>;

    /// Get an Ingress by namespace and name
    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>>;

    /// Create an Ingress in the given namespace
    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<CreateOutcome>;
}

/// Real cluster access backed by a Kubernetes client
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Create a new cluster client wrapping the given Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(deployment) => Ok(Some(deployment)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(service) => Ok(Some(service)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<CreateOutcome> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        match api.create(&PostParams::default(), service).await {
            Ok(_created) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(ingress) => Ok(Some(ingress)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<CreateOutcome> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
        match api.create(&PostParams::default(), ingress).await {
            Ok(_created) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }
}
