//! Error types for the Nginx resource schema.
//!
//! Structural errors (malformed documents) are reported as a single fatal
//! error. Validation failures are aggregated so a client can fix every
//! problem in one round trip.

use std::fmt;

use thiserror::Error;

/// Errors produced while decoding, configuring or admitting Nginx documents.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed JSON document (wrong types, missing required fields)
    #[error("malformed Nginx document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Malformed YAML document
    #[error("malformed Nginx document: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    /// Document rejected by the validation rules
    #[error("Nginx document rejected: {0}")]
    Validation(#[from] ValidationErrors),

    /// Document does not carry a known apiVersion/kind pair
    #[error("unknown document shape: apiVersion={api_version:?} kind={kind:?}")]
    UnknownKind {
        /// apiVersion found in the document
        api_version: String,
        /// kind found in the document
        kind: String,
    },

    /// Invalid platform defaults configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A single field-scoped rejection reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// `replicas` below zero
    #[error("replicas must be non-negative, got {0}")]
    NegativeReplicas(i32),

    /// `config.kind=ConfigMap` without a name
    #[error("config.name required for kind ConfigMap")]
    ConfigNameRequired,

    /// `config.kind=ConfigMap` with inline content
    #[error("config.value must be empty for kind ConfigMap")]
    ConfigValueNotAllowed,

    /// `config.kind=Inline` without content
    #[error("config.value required for kind Inline")]
    ConfigValueRequired,

    /// `config.kind=Inline` naming an external object
    #[error("config.name must be empty for kind Inline")]
    ConfigNameNotAllowed,

    /// `certificates` present without a secret name
    #[error("certificates.secretName required")]
    SecretNameRequired,

    /// `certificates` present without any item
    #[error("certificates.items requires at least one item")]
    CertificateItemsRequired,

    /// `certificates.items[i].certificateField` empty
    #[error("certificates.items[{0}].certificateField required")]
    CertificateFieldRequired(usize),

    /// `certificates.items[i].keyField` empty
    #[error("certificates.items[{0}].keyField required")]
    KeyFieldRequired(usize),

    /// Two mounted files resolve to the same path
    #[error("mount path {path:?} collides: {first} and {second}")]
    PathCollision {
        /// Normalised colliding path
        path: String,
        /// Field that claimed the path first
        first: String,
        /// Field that claimed it again
        second: String,
    },

    /// `extraFiles` present without a ConfigMap name
    #[error("extraFiles.name required")]
    ExtraFilesNameRequired,

    /// A mounted file path names the mount root itself
    #[error("{0} must name a file below the mount root")]
    MountPathRequired(String),

    /// A mounted file path is absolute or contains ".."
    #[error("{field} must be a relative path without \"..\", got {path:?}")]
    MountPathNotRelative {
        /// Offending field
        field: String,
        /// Path as written
        path: String,
    },

    /// `cache` present without a mount point
    #[error("cache.path required")]
    CachePathRequired,

    /// `cache.path` is relative
    #[error("cache.path must be an absolute path, got {0:?}")]
    CachePathNotAbsolute(String),

    /// `healthcheckPath` does not start with a slash
    #[error("healthcheckPath must start with '/', got {0:?}")]
    HealthcheckPathNotAbsolute(String),

    /// `podTemplate.terminationGracePeriodSeconds` below zero
    #[error("podTemplate.terminationGracePeriodSeconds must be non-negative, got {0}")]
    NegativeTerminationGracePeriod(i64),

    /// Lifecycle hook declared without an exec action
    #[error("lifecycle.{0}.exec required")]
    LifecycleExecRequired(&'static str),

    /// `status.currentReplicas` below zero
    #[error("status.currentReplicas must be non-negative, got {0}")]
    NegativeCurrentReplicas(i32),

    /// `status.podSelector` cannot be parsed
    #[error("status.podSelector {selector:?} is invalid: {reason}")]
    InvalidPodSelector {
        /// Raw selector
        selector: String,
        /// Parser message
        reason: String,
    },

    /// `status.podSelector` omits an ownership label
    #[error("status.podSelector {selector:?} is broader than ownership labels {ownership:?}")]
    PodSelectorTooBroad {
        /// Raw selector
        selector: String,
        /// Encoded ownership selector
        ownership: String,
    },
}

impl FieldError {
    /// Dotted path of the offending field.
    pub fn field(&self) -> String {
        match self {
            Self::NegativeReplicas(_) => "replicas".to_string(),
            Self::ConfigNameRequired | Self::ConfigNameNotAllowed => "config.name".to_string(),
            Self::ConfigValueRequired | Self::ConfigValueNotAllowed => "config.value".to_string(),
            Self::SecretNameRequired => "certificates.secretName".to_string(),
            Self::CertificateItemsRequired => "certificates.items".to_string(),
            Self::CertificateFieldRequired(i) => format!("certificates.items[{i}].certificateField"),
            Self::KeyFieldRequired(i) => format!("certificates.items[{i}].keyField"),
            Self::PathCollision { second, .. } => second.clone(),
            Self::ExtraFilesNameRequired => "extraFiles.name".to_string(),
            Self::MountPathRequired(field) | Self::MountPathNotRelative { field, .. } => {
                field.clone()
            }
            Self::CachePathRequired | Self::CachePathNotAbsolute(_) => "cache.path".to_string(),
            Self::HealthcheckPathNotAbsolute(_) => "healthcheckPath".to_string(),
            Self::NegativeTerminationGracePeriod(_) => {
                "podTemplate.terminationGracePeriodSeconds".to_string()
            }
            Self::LifecycleExecRequired(hook) => format!("lifecycle.{hook}.exec"),
            Self::NegativeCurrentReplicas(_) => "status.currentReplicas".to_string(),
            Self::InvalidPodSelector { .. } | Self::PodSelectorTooBroad { .. } => {
                "status.podSelector".to_string()
            }
        }
    }
}

/// Every rejection found in one document. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Wraps collected errors, returning `Ok(())` when there are none.
    pub fn check(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self(errors))
        }
    }

    /// Rejection reasons in discovery order
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether any rejection matches `pred`
    pub fn any(&self, pred: impl Fn(&FieldError) -> bool) -> bool {
        self.0.iter().any(pred)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
