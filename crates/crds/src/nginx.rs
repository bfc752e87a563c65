//! Nginx Custom Resource Definition
//!
//! Declares how an NGINX workload is deployed, configured and exposed.
//! A reconciler materializes Deployments, Services, ConfigMaps and Secrets
//! from this spec and writes back an [`NginxStatus`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::core::v1::{
    Affinity, Container, ContainerPort, ExecAction, ResourceRequirements, SecurityContext, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::ObjectList;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::status::{LabelSelector, NginxStatus};

/// API group of the Nginx resource
pub const API_GROUP: &str = "nginx.tsuru.io";

/// API version of the Nginx resource
pub const API_VERSION: &str = "v1alpha1";

/// Image used when the spec does not name one
pub const DEFAULT_IMAGE: &str = "nginx:latest";

/// Where the configuration file is mounted in the nginx container
pub const CONFIG_MOUNT_PATH: &str = "/etc/nginx/nginx.conf";

/// Root under which certificate and key files are mounted
pub const CERTIFICATES_MOUNT_PATH: &str = "/etc/nginx/certs";

/// Root under which extra files are mounted
pub const EXTRA_FILES_MOUNT_PATH: &str = "/etc/nginx/extra_files";

/// Label carried by every pod managed by any Nginx resource
pub const APP_LABEL: &str = "nginx.tsuru.io/app";

/// Label naming the Nginx resource owning a pod
pub const RESOURCE_NAME_LABEL: &str = "nginx.tsuru.io/resource-name";

/// Pod annotation carrying inline configuration, projected via the Downward API
pub const INLINE_CONFIG_ANNOTATION: &str = "nginx.tsuru.io/custom-nginx-config";

/// NginxSpec defines the desired state of an NGINX workload
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "nginx.tsuru.io",
    version = "v1alpha1",
    kind = "Nginx",
    plural = "nginxes",
    namespaced,
    status = "NginxStatus",
    derive = "PartialEq",
    scale(
        spec_replicas_path = ".spec.replicas",
        status_replicas_path = ".status.currentReplicas",
        label_selector_path = ".status.podSelector"
    ),
    printcolumn = r#"{"name":"Current", "type":"integer", "jsonPath":".status.currentReplicas"}"#,
    printcolumn = r#"{"name":"Desired", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NginxSpec {
    /// Number of desired pods. Absent means the platform default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Container image. Defaults to "nginx:latest".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Reference to the NGINX configuration, mounted on "/etc/nginx/nginx.conf".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigRef>,

    /// Secret holding one or more certificate-key pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificates: Option<TLSSecret>,

    /// Overrides merged onto the generated nginx pod.
    #[serde(default, skip_serializing_if = "NginxPodTemplateSpec::is_empty")]
    pub pod_template: NginxPodTemplateSpec,

    /// Service exposing the nginx pods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<NginxService>,

    /// Additional files mounted on "/etc/nginx/extra_files".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_files: Option<FilesRef>,

    /// Endpoint checked for liveness and readiness.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub healthcheck_path: String,

    /// Compute resources for the nginx container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Cache volume for nginx to use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<NginxCacheSpec>,

    /// Hooks executed on nginx container lifecycle events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<NginxLifecycle>,
}

/// List form of the resource
pub type NginxList = ObjectList<Nginx>;

impl NginxSpec {
    /// Image to run, falling back to [`DEFAULT_IMAGE`]
    pub fn image(&self) -> &str {
        match self.image.as_deref() {
            Some(image) if !image.is_empty() => image,
            _ => DEFAULT_IMAGE,
        }
    }
}

impl Nginx {
    /// Labels stamped on every pod this resource owns.
    pub fn ownership_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (APP_LABEL.to_string(), "nginx".to_string()),
            (RESOURCE_NAME_LABEL.to_string(), self.name_any()),
        ])
    }

    /// Selector enumerating exactly the pods this resource owns.
    pub fn pod_selector(&self) -> LabelSelector {
        LabelSelector::from(self.ownership_labels())
    }
}

/// Where the NGINX configuration comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConfigKind {
    /// Points to a ConfigMap in the same namespace
    #[default]
    ConfigMap,
    /// Content stored as a pod annotation and injected as a file via the Downward API
    Inline,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::ConfigMap => write!(f, "ConfigMap"),
            ConfigKind::Inline => write!(f, "Inline"),
        }
    }
}

/// Reference to a configuration source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRef {
    /// Name of the ConfigMap. Required when kind is ConfigMap.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Kind of configuration source. Defaults to ConfigMap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConfigKind>,

    /// Inline configuration content. Required when kind is Inline.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl ConfigRef {
    /// Reference to a ConfigMap holding `nginx.conf`
    pub fn config_map(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some(ConfigKind::ConfigMap),
            value: String::new(),
        }
    }

    /// Inline configuration content
    pub fn inline(value: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            kind: Some(ConfigKind::Inline),
            value: value.into(),
        }
    }

    /// Effective kind, treating absent as ConfigMap
    pub fn kind(&self) -> ConfigKind {
        self.kind.unwrap_or_default()
    }
}

/// TLS certificate and key pairs stored in a Secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TLSSecret {
    /// Secret holding the certificate and key pairs
    #[serde(default)]
    pub secret_name: String,

    /// Where each pair is mounted in the nginx container
    #[serde(default)]
    pub items: Vec<TLSSecretItem>,
}

/// Maps one certificate-key pair from Secret data to container paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TLSSecretItem {
    /// Secret key holding the certificate
    #[serde(default)]
    pub certificate_field: String,

    /// Path of the certificate relative to the certificates root.
    /// Defaults to the certificate field name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub certificate_path: String,

    /// Secret key holding the private key
    #[serde(default)]
    pub key_field: String,

    /// Path of the key relative to the certificates root.
    /// Defaults to the key field name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_path: String,
}

impl TLSSecretItem {
    /// Pair with paths defaulting to the field names
    pub fn new(certificate_field: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            certificate_field: certificate_field.into(),
            key_field: key_field.into(),
            ..Self::default()
        }
    }

    /// Mount path of the certificate, relative to [`CERTIFICATES_MOUNT_PATH`]
    pub fn resolved_certificate_path(&self) -> &str {
        if self.certificate_path.is_empty() {
            &self.certificate_field
        } else {
            &self.certificate_path
        }
    }

    /// Mount path of the key, relative to [`CERTIFICATES_MOUNT_PATH`]
    pub fn resolved_key_path(&self) -> &str {
        if self.key_path.is_empty() {
            &self.key_field
        } else {
            &self.key_path
        }
    }
}

/// Arbitrary files stored in a ConfigMap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilesRef {
    /// ConfigMap (same namespace) holding the files
    #[serde(default)]
    pub name: String,

    /// ConfigMap key to path relative to [`EXTRA_FILES_MOUNT_PATH`]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
}

/// Overrides applied to the generated nginx pod
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NginxPodTemplateSpec {
    /// Affinity to be set on the nginx pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    /// Node selector to be set on the nginx pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Extra pod annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Extra pod labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Use the host's network namespace
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub host_network: bool,

    /// Ports used by nginx
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,

    /// Grace period for pod termination. Absent means the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_grace_period_seconds: Option<i64>,

    /// Security attributes of the nginx container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,

    /// Volumes attached to nginx pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,

    /// Mounts for the volumes declared above
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,

    /// Containers run in order before nginx starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,
}

impl NginxPodTemplateSpec {
    /// True when no override is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Kubernetes Service type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ServiceType {
    /// Cluster-internal virtual IP
    ClusterIP,
    /// Exposed on a port of each node
    NodePort,
    /// Provisioned external load balancer
    LoadBalancer,
    /// CNAME to an external name
    ExternalName,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::ClusterIP => write!(f, "ClusterIP"),
            ServiceType::NodePort => write!(f, "NodePort"),
            ServiceType::LoadBalancer => write!(f, "LoadBalancer"),
            ServiceType::ExternalName => write!(f, "ExternalName"),
        }
    }
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ClusterIP" => Ok(ServiceType::ClusterIP),
            "NodePort" => Ok(ServiceType::NodePort),
            "LoadBalancer" => Ok(ServiceType::LoadBalancer),
            "ExternalName" => Ok(ServiceType::ExternalName),
            other => Err(Error::InvalidConfig(format!("unknown service type {other:?}"))),
        }
    }
}

/// Whether external traffic is routed to node-local or cluster-wide endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ExternalTrafficPolicy {
    /// Route to any node
    Cluster,
    /// Route only to the receiving node, preserving client IP
    Local,
}

impl fmt::Display for ExternalTrafficPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalTrafficPolicy::Cluster => write!(f, "Cluster"),
            ExternalTrafficPolicy::Local => write!(f, "Local"),
        }
    }
}

impl FromStr for ExternalTrafficPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cluster" => Ok(ExternalTrafficPolicy::Cluster),
            "Local" => Ok(ExternalTrafficPolicy::Local),
            other => Err(Error::InvalidConfig(format!(
                "unknown external traffic policy {other:?}"
            ))),
        }
    }
}

/// Service exposing the nginx pods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NginxService {
    /// Service type. Defaults to the cluster default.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<ServiceType>,

    /// Load balancer IP requested for the service
    #[serde(
        rename = "loadBalancerIP",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub load_balancer_ip: String,

    /// Extra service labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Extra service annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// External traffic policy. Defaults to the cluster default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_traffic_policy: Option<ExternalTrafficPolicy>,

    /// Map endpoints with the pod label selector. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_pod_selector: Option<bool>,
}

impl NginxService {
    /// Effective `usePodSelector`, treating absent as true
    pub fn uses_pod_selector(&self) -> bool {
        self.use_pod_selector.unwrap_or(true)
    }
}

/// Cache volume for nginx
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NginxCacheSpec {
    /// Back the volume with memory
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub in_memory: bool,

    /// Mount path of the cache volume
    #[serde(default)]
    pub path: String,

    /// Size limit of the cache volume; only bounds memory-backed caches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Quantity>,
}

/// Hooks run on nginx container lifecycle events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NginxLifecycle {
    /// Run right after the container starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_start: Option<NginxLifecycleHandler>,

    /// Run before the container is terminated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_stop: Option<NginxLifecycleHandler>,
}

/// A single exec action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NginxLifecycleHandler {
    /// Command executed inside the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,
}
