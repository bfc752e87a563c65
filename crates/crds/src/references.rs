//! Objects an Nginx resource refers to.
//!
//! The schema never resolves these itself. Every reference names an object
//! in the same namespace as the Nginx resource; the reconciler fetches it,
//! and a missing object or key is surfaced as a retryable condition on the
//! resource rather than a rejection at submission time (the object may
//! simply not exist yet).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use kube::ResourceExt;
use thiserror::Error;

use crate::nginx::{
    CERTIFICATES_MOUNT_PATH, CONFIG_MOUNT_PATH, ConfigKind, EXTRA_FILES_MOUNT_PATH,
    INLINE_CONFIG_ANNOTATION, Nginx,
};
use crate::validation::normalize_path;

/// Kind of a referenced object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferencedKind {
    /// Key/value configuration object
    ConfigMap,
    /// Certificate/key bundle
    Secret,
}

impl fmt::Display for ReferencedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferencedKind::ConfigMap => write!(f, "ConfigMap"),
            ReferencedKind::Secret => write!(f, "Secret"),
        }
    }
}

/// One object the reconciler must dereference, with the keys it must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    /// Kind of the referenced object
    pub kind: ReferencedKind,
    /// Object name
    pub name: String,
    /// Namespace, always the Nginx resource's own
    pub namespace: Option<String>,
    /// Keys that must be present in the object's data
    pub keys: BTreeSet<String>,
}

impl ObjectReference {
    /// Confirm every required key is present in a fetched object.
    pub fn check_keys<'a>(
        &self,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ResolutionError> {
        let available: BTreeSet<&str> = available.into_iter().collect();
        match self.keys.iter().find(|k| !available.contains(k.as_str())) {
            Some(missing) => Err(ResolutionError::MissingKey {
                kind: self.kind,
                name: self.name.clone(),
                key: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Error to report when the object itself cannot be found.
    pub fn missing(&self) -> ResolutionError {
        ResolutionError::MissingObject {
            kind: self.kind,
            name: self.name.clone(),
            namespace: self.namespace.clone().unwrap_or_default(),
        }
    }
}

/// Reference resolution failures, detected at reconciliation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The referenced object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    MissingObject {
        /// Kind of the object
        kind: ReferencedKind,
        /// Object name
        name: String,
        /// Object namespace
        namespace: String,
    },

    /// The object exists but lacks a required key
    #[error("{kind} {name} has no key {key:?}")]
    MissingKey {
        /// Kind of the object
        kind: ReferencedKind,
        /// Object name
        name: String,
        /// Missing key
        key: String,
    },
}

impl ResolutionError {
    /// Resolution errors are always retried with backoff; the object may appear later.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Machine-readable reason for a status condition
    pub fn reason(&self) -> &'static str {
        match self {
            ResolutionError::MissingObject {
                kind: ReferencedKind::ConfigMap,
                ..
            } => "ConfigNotFound",
            ResolutionError::MissingObject {
                kind: ReferencedKind::Secret,
                ..
            } => "SecretNotFound",
            ResolutionError::MissingKey { .. } => "KeyNotFound",
        }
    }
}

impl Nginx {
    /// Every external object this resource depends on.
    ///
    /// Inline configuration is carried on the pod itself and produces no
    /// reference.
    pub fn references(&self) -> Vec<ObjectReference> {
        let namespace = self.namespace();
        let mut refs = Vec::new();

        if let Some(config) = &self.spec.config {
            if config.kind() == ConfigKind::ConfigMap {
                refs.push(ObjectReference {
                    kind: ReferencedKind::ConfigMap,
                    name: config.name.clone(),
                    namespace: namespace.clone(),
                    keys: BTreeSet::from(["nginx.conf".to_string()]),
                });
            }
        }

        if let Some(certificates) = &self.spec.certificates {
            refs.push(ObjectReference {
                kind: ReferencedKind::Secret,
                name: certificates.secret_name.clone(),
                namespace: namespace.clone(),
                keys: certificates
                    .items
                    .iter()
                    .flat_map(|item| [item.certificate_field.clone(), item.key_field.clone()])
                    .collect(),
            });
        }

        if let Some(files) = &self.spec.extra_files {
            refs.push(ObjectReference {
                kind: ReferencedKind::ConfigMap,
                name: files.name.clone(),
                namespace,
                keys: files.files.keys().cloned().collect(),
            });
        }

        refs
    }

    /// Container paths the referenced data is mounted on, in declaration order.
    ///
    /// Paths that would not pass validation are left out.
    pub fn mount_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if self.spec.config.is_some() {
            paths.push(CONFIG_MOUNT_PATH.to_string());
        }
        let under = |root: &str, path: &str| {
            normalize_path(path)
                .ok()
                .map(|relative| format!("{root}/{relative}"))
        };
        if let Some(certificates) = &self.spec.certificates {
            paths.extend(certificates.items.iter().flat_map(|item| {
                [
                    under(CERTIFICATES_MOUNT_PATH, item.resolved_certificate_path()),
                    under(CERTIFICATES_MOUNT_PATH, item.resolved_key_path()),
                ]
                .into_iter()
                .flatten()
            }));
        }
        if let Some(files) = &self.spec.extra_files {
            paths.extend(
                files
                    .files
                    .values()
                    .filter_map(|path| under(EXTRA_FILES_MOUNT_PATH, path)),
            );
        }
        paths
    }

    /// Annotations for the generated pod.
    ///
    /// Inline configuration rides on [`INLINE_CONFIG_ANNOTATION`] and
    /// overrides a user annotation with the same key.
    pub fn pod_annotations(&self) -> BTreeMap<String, String> {
        let mut annotations = self.spec.pod_template.annotations.clone();
        if let Some(config) = self
            .spec
            .config
            .as_ref()
            .filter(|c| c.kind() == ConfigKind::Inline)
        {
            annotations.insert(INLINE_CONFIG_ANNOTATION.to_string(), config.value.clone());
        }
        annotations
    }
}
