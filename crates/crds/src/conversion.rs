//! Conversion from the minimal schema generation.
//!
//! Early documents carried an empty spec and status and always serialised
//! `metadata` and `spec`. [`Nginx`] is the only in-memory representation;
//! legacy documents are translated at the boundary.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::TypeMeta;
use serde::{Deserialize, Serialize};

use crate::nginx::{Nginx, NginxSpec};

/// Nginx document in the minimal generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyNginx {
    /// apiVersion and kind
    #[serde(flatten)]
    pub types: TypeMeta,

    /// Identity metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Always empty
    #[serde(default)]
    pub spec: LegacyNginxSpec,

    /// Always empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LegacyNginxStatus>,
}

/// Spec of the minimal generation; it declares no fields
#[allow(clippy::empty_structs_with_brackets, reason = "serialised as an empty JSON object")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyNginxSpec {}

/// Status of the minimal generation; it declares no fields
#[allow(clippy::empty_structs_with_brackets, reason = "serialised as an empty JSON object")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyNginxStatus {}

impl From<LegacyNginx> for Nginx {
    fn from(legacy: LegacyNginx) -> Self {
        let mut nginx = Nginx::new("", NginxSpec::default());
        nginx.metadata = legacy.metadata;
        nginx
    }
}

impl From<&Nginx> for LegacyNginx {
    /// Lossy: every spec and status field is dropped.
    fn from(nginx: &Nginx) -> Self {
        Self {
            types: TypeMeta::resource::<Nginx>(),
            metadata: nginx.metadata.clone(),
            spec: LegacyNginxSpec::default(),
            status: nginx.status.as_ref().map(|_| LegacyNginxStatus::default()),
        }
    }
}
