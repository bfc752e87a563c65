//! Observed state of an Nginx resource.
//!
//! The reconciler owns every field here and refreshes the whole document on
//! each status write: pod and service snapshots are replaced, never patched
//! incrementally, so stale entries cannot accumulate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FieldError, ValidationErrors};
use crate::nginx::Nginx;

/// NginxStatus defines the observed state of Nginx
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NginxStatus {
    /// Last observed number of ready replicas
    #[serde(default, skip_serializing_if = "is_zero")]
    pub current_replicas: i32,

    /// Label selector matching the pods owned by this resource
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_selector: String,

    /// Pods observed at the last reconciliation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pods: Vec<PodStatus>,

    /// Services observed at the last reconciliation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceStatus>,
}

#[allow(clippy::trivially_copy_pass_by_ref, reason = "serde skip_serializing_if takes a reference")]
fn is_zero(n: &i32) -> bool {
    *n == 0
}

/// A pod running nginx
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PodStatus {
    /// Pod name
    pub name: String,

    /// Pod IP
    #[serde(rename = "podIP")]
    pub pod_ip: String,

    /// IP of the node running the pod
    #[serde(rename = "hostIP")]
    pub host_ip: String,
}

/// A Service created for nginx
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceStatus {
    /// Service name
    pub name: String,
}

impl NginxStatus {
    /// Builds a fresh status from one observation.
    ///
    /// Pods and services are sorted by name so repeated projections of the
    /// same cluster state produce identical documents.
    pub fn project(
        ready_replicas: i32,
        selector: &LabelSelector,
        pods: impl IntoIterator<Item = PodStatus>,
        services: impl IntoIterator<Item = ServiceStatus>,
    ) -> Self {
        let mut pods: Vec<PodStatus> = pods.into_iter().collect();
        pods.sort_by(|a, b| a.name.cmp(&b.name));
        let mut services: Vec<ServiceStatus> = services.into_iter().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));

        if ready_replicas < 0 {
            warn!(ready_replicas, "Clamped negative ready replica count to 0");
        }
        Self {
            current_replicas: ready_replicas.max(0),
            pod_selector: selector.to_string(),
            pods,
            services,
        }
    }
}

impl Nginx {
    /// Projects an observation using this resource's own ownership selector.
    pub fn project_status(
        &self,
        ready_replicas: i32,
        pods: impl IntoIterator<Item = PodStatus>,
        services: impl IntoIterator<Item = ServiceStatus>,
    ) -> NginxStatus {
        NginxStatus::project(ready_replicas, &self.pod_selector(), pods, services)
    }

    /// Checks a status document against this resource's ownership.
    ///
    /// Pod entries are not cross-checked against the selector: snapshots may
    /// be stale. The selector itself must be at least as narrow as the
    /// ownership labels.
    pub fn validate_status(&self, status: &NginxStatus) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if status.current_replicas < 0 {
            errors.push(FieldError::NegativeCurrentReplicas(status.current_replicas));
        }

        if !status.pod_selector.is_empty() {
            let ownership = self.ownership_labels();
            match status.pod_selector.parse::<LabelSelector>() {
                Ok(selector) if !selector.is_within(&ownership) => {
                    errors.push(FieldError::PodSelectorTooBroad {
                        selector: status.pod_selector.clone(),
                        ownership: LabelSelector::from(ownership).to_string(),
                    });
                }
                Ok(_) => {}
                Err(reason) => errors.push(FieldError::InvalidPodSelector {
                    selector: status.pod_selector.clone(),
                    reason,
                }),
            }
        }

        debug!(errors = errors.len(), "validated Nginx status");
        ValidationErrors::check(errors)
    }
}

/// Equality-based label selector, encoded as `k1=v1,k2=v2` with keys sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    /// Required label pairs
    pub fn requirements(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Whether `labels` satisfy every requirement
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }

    /// True when every pod this selector matches also carries `ownership`,
    /// i.e. the selector requires each ownership label with the same value.
    pub fn is_within(&self, ownership: &BTreeMap<String, String>) -> bool {
        ownership.iter().all(|(k, v)| self.0.get(k) == Some(v))
    }
}

impl From<BTreeMap<String, String>> for LabelSelector {
    fn from(labels: BTreeMap<String, String>) -> Self {
        Self(labels)
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

impl FromStr for LabelSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut requirements = BTreeMap::new();
        for term in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if term.contains("!=") {
                return Err(format!("unsupported operator in {term:?}"));
            }
            let (key, value) = term
                .split_once("==")
                .or_else(|| term.split_once('='))
                .ok_or_else(|| format!("expected key=value, got {term:?}"))?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || key.contains(char::is_whitespace) {
                return Err(format!("invalid label key in {term:?}"));
            }
            if value.contains(char::is_whitespace) || value.contains('=') {
                return Err(format!("invalid label value in {term:?}"));
            }
            if let Some(existing) = requirements.insert(key.to_string(), value.to_string()) {
                if existing != value {
                    return Err(format!("conflicting values for label {key:?}"));
                }
            }
        }
        Ok(Self(requirements))
    }
}
