//! Validation rules for [`NginxSpec`].
//!
//! Validation is a pure predicate over a spec. It never dereferences the
//! ConfigMaps and Secrets the spec points at; a missing object is a
//! reconciliation-time condition, not a rejection. All rejections are
//! collected before returning.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tracing::debug;

use crate::error::{FieldError, ValidationErrors};
use crate::nginx::{
    ConfigKind, ConfigRef, FilesRef, NginxCacheSpec, NginxLifecycle, NginxSpec, TLSSecret,
};

impl NginxSpec {
    /// Check every rule, reporting all violations at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if let Some(replicas) = self.replicas.filter(|r| *r < 0) {
            errors.push(FieldError::NegativeReplicas(replicas));
        }
        if let Some(config) = &self.config {
            validate_config(config, &mut errors);
        }

        let mut mounts = MountPaths::default();
        if let Some(certificates) = &self.certificates {
            validate_certificates(certificates, &mut mounts, &mut errors);
        }
        if let Some(files) = &self.extra_files {
            validate_extra_files(files, &mut mounts, &mut errors);
        }

        if let Some(cache) = &self.cache {
            validate_cache(cache, &mut errors);
        }
        if !self.healthcheck_path.is_empty() && !self.healthcheck_path.starts_with('/') {
            errors.push(FieldError::HealthcheckPathNotAbsolute(
                self.healthcheck_path.clone(),
            ));
        }
        if let Some(seconds) = self
            .pod_template
            .termination_grace_period_seconds
            .filter(|s| *s < 0)
        {
            errors.push(FieldError::NegativeTerminationGracePeriod(seconds));
        }
        if let Some(lifecycle) = &self.lifecycle {
            validate_lifecycle(lifecycle, &mut errors);
        }

        debug!(errors = errors.len(), "validated Nginx spec");
        ValidationErrors::check(errors)
    }
}

fn validate_config(config: &ConfigRef, errors: &mut Vec<FieldError>) {
    match config.kind() {
        ConfigKind::ConfigMap => {
            if config.name.is_empty() {
                errors.push(FieldError::ConfigNameRequired);
            }
            if !config.value.is_empty() {
                errors.push(FieldError::ConfigValueNotAllowed);
            }
        }
        ConfigKind::Inline => {
            if config.value.is_empty() {
                errors.push(FieldError::ConfigValueRequired);
            }
            if !config.name.is_empty() {
                errors.push(FieldError::ConfigNameNotAllowed);
            }
        }
    }
}

fn validate_certificates(
    certificates: &TLSSecret,
    mounts: &mut MountPaths,
    errors: &mut Vec<FieldError>,
) {
    if certificates.secret_name.is_empty() {
        errors.push(FieldError::SecretNameRequired);
    }
    if certificates.items.is_empty() {
        errors.push(FieldError::CertificateItemsRequired);
    }

    for (i, item) in certificates.items.iter().enumerate() {
        if item.certificate_field.is_empty() {
            errors.push(FieldError::CertificateFieldRequired(i));
        }
        if item.key_field.is_empty() {
            errors.push(FieldError::KeyFieldRequired(i));
        }
        // an empty field with no explicit path is already reported above
        for (path, field) in [
            (item.resolved_certificate_path(), "certificatePath"),
            (item.resolved_key_path(), "keyPath"),
        ] {
            if !path.is_empty() {
                mounts.claim(path, format!("certificates.items[{i}].{field}"), errors);
            }
        }
    }
}

fn validate_extra_files(files: &FilesRef, mounts: &mut MountPaths, errors: &mut Vec<FieldError>) {
    if files.name.is_empty() {
        errors.push(FieldError::ExtraFilesNameRequired);
    }
    for (key, path) in &files.files {
        mounts.claim(path, format!("extraFiles.files[{key}]"), errors);
    }
}

fn validate_cache(cache: &NginxCacheSpec, errors: &mut Vec<FieldError>) {
    if cache.path.is_empty() {
        errors.push(FieldError::CachePathRequired);
    } else if !cache.path.starts_with('/') {
        errors.push(FieldError::CachePathNotAbsolute(cache.path.clone()));
    }
}

fn validate_lifecycle(lifecycle: &NginxLifecycle, errors: &mut Vec<FieldError>) {
    for (hook, handler) in [
        ("postStart", &lifecycle.post_start),
        ("preStop", &lifecycle.pre_stop),
    ] {
        if handler.as_ref().is_some_and(|h| h.exec.is_none()) {
            errors.push(FieldError::LifecycleExecRequired(hook));
        }
    }
}

/// Mounted file paths claimed so far, keyed by normalised path.
#[derive(Debug, Default)]
struct MountPaths(BTreeMap<String, String>);

impl MountPaths {
    fn claim(&mut self, path: &str, field: String, errors: &mut Vec<FieldError>) {
        let normalized = match normalize_path(path) {
            Ok(normalized) => normalized,
            Err(MountPathError::Empty) => {
                errors.push(FieldError::MountPathRequired(field));
                return;
            }
            Err(MountPathError::NotRelative) => {
                errors.push(FieldError::MountPathNotRelative {
                    field,
                    path: path.to_string(),
                });
                return;
            }
        };
        match self.0.entry(normalized) {
            Entry::Occupied(first) => errors.push(FieldError::PathCollision {
                path: first.key().clone(),
                first: first.get().clone(),
                second: field,
            }),
            Entry::Vacant(slot) => {
                slot.insert(field);
            }
        }
    }
}

/// Why a path cannot be mounted below its root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MountPathError {
    /// Names the mount root itself
    Empty,
    /// Absolute, or climbs out of the root with ".."
    NotRelative,
}

/// Canonical form of a path relative to its mount root.
///
/// Empty and "." segments are dropped, so "x//b", "x/./b" and "./x/b" all
/// name "x/b". Absolute paths and ".." segments are rejected.
pub(crate) fn normalize_path(path: &str) -> Result<String, MountPathError> {
    if path.starts_with('/') {
        return Err(MountPathError::NotRelative);
    }
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(MountPathError::NotRelative),
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return Err(MountPathError::Empty);
    }
    Ok(segments.join("/"))
}
