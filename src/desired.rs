//! Desired-state derivation for annotated Deployments.
//!
//! [`derive`] maps a Deployment to the resources that should exist for it,
//! as pure data. Nothing here talks to the cluster; deciding what to do with
//! the derived resources is the controller's job.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Annotation that opts a Deployment in to exposure; must be exactly "true"
pub const EXPOSE_ANNOTATION: &str = "expose";
/// Annotation selecting the exposure flavor
pub const EXPOSE_TYPE_ANNOTATION: &str = "expose/type";
/// Value of the type annotation that requests an Ingress on top of the Service
pub const EXPOSE_TYPE_INGRESS: &str = "ingress";

/// Port the generated Service listens on and forwards to
pub const EXPOSED_PORT: i32 = 80;

/// Name of the Service generated for a Deployment
pub fn service_name(parent: &str) -> String {
    format!("{}-svc", parent)
}

/// Name of the Ingress generated for a Deployment
pub fn ingress_name(parent: &str) -> String {
    format!("{}-ing", parent)
}

/// Host the generated Ingress routes to the Service
pub fn ingress_host(parent: &str) -> String {
    format!("{}.local", parent)
}

/// A resource that should exist for a Deployment, not yet persisted.
///
/// Ownership is attached by the controller at create time; the derivation
/// itself stays a pure computation over the parent's state.
#[derive(Debug, Clone)]
pub enum DesiredResource {
    Service(Service),
    Ingress(Ingress),
}

impl DesiredResource {
    /// Kind of the underlying resource, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            DesiredResource::Service(_) => "Service",
            DesiredResource::Ingress(_) => "Ingress",
        }
    }

    /// Name of the underlying resource
    pub fn name(&self) -> String {
        match self {
            DesiredResource::Service(service) => service.name_any(),
            DesiredResource::Ingress(ingress) => ingress.name_any(),
        }
    }
}

/// Derive the resources that should exist for a Deployment, in apply order.
///
/// A Deployment that has not opted in via the `expose` annotation derives
/// nothing. An exposed Deployment always derives its Service first; the
/// Ingress follows only when `expose/type` is exactly `ingress`, and routes
/// to the Service by its deterministic name.
pub fn derive(deployment: &Deployment) -> Vec<DesiredResource> {
    if !is_exposed(deployment) {
        return Vec::new();
    }

    let namespace = deployment
        .namespace()
        .unwrap_or_else(|| "default".to_string());

    let mut desired = vec![DesiredResource::Service(build_service(
        deployment, &namespace,
    ))];
    if wants_ingress(deployment) {
        desired.push(DesiredResource::Ingress(build_ingress(
            deployment, &namespace,
        )));
    }
    desired
}

/// Whether the Deployment has opted in to exposure
pub fn is_exposed(deployment: &Deployment) -> bool {
    annotation(deployment, EXPOSE_ANNOTATION) == Some("true")
}

fn wants_ingress(deployment: &Deployment) -> bool {
    annotation(deployment, EXPOSE_TYPE_ANNOTATION) == Some(EXPOSE_TYPE_INGRESS)
}

fn annotation<'a>(deployment: &'a Deployment, key: &str) -> Option<&'a str> {
    deployment
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(key))
        .map(String::as_str)
}

/// Pod template labels, cloned verbatim.
///
/// A template without labels yields `None`, which flows through to a Service
/// without a selector. That matches no pods, and is deliberately left for the
/// user to notice rather than rejected here.
fn template_labels(deployment: &Deployment) -> Option<BTreeMap<String, String>> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.metadata.as_ref())
        .and_then(|metadata| metadata.labels.clone())
}

fn build_service(deployment: &Deployment, namespace: &str) -> Service {
    let name = service_name(&deployment.name_any());
    let selector = template_labels(deployment);

    Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector,
            ports: Some(vec![ServicePort {
                port: EXPOSED_PORT,
                target_port: Some(IntOrString::Int(EXPOSED_PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_ingress(deployment: &Deployment, namespace: &str) -> Ingress {
    let parent = deployment.name_any();

    Ingress {
        metadata: ObjectMeta {
            name: Some(ingress_name(&parent)),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(ingress_host(&parent)),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name(&parent),
                                port: Some(ServiceBackendPort {
                                    number: Some(EXPOSED_PORT),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
