//! Platform-wide defaults applied during defaulting.
//!
//! Replica count, service type, external traffic policy and termination
//! grace period are cluster policy, not schema constants. Each one is
//! optional: when a default is not configured the field stays absent and
//! the consumer applies whatever the cluster would.

use std::env;
use std::str::FromStr;

use tracing::info;

use crate::error::Error;
use crate::nginx::{ExternalTrafficPolicy, ServiceType};

/// Environment variable holding the default replica count
pub const ENV_DEFAULT_REPLICAS: &str = "NGINX_DEFAULT_REPLICAS";
/// Environment variable holding the default Service type
pub const ENV_DEFAULT_SERVICE_TYPE: &str = "NGINX_DEFAULT_SERVICE_TYPE";
/// Environment variable holding the default external traffic policy
pub const ENV_DEFAULT_EXTERNAL_TRAFFIC_POLICY: &str = "NGINX_DEFAULT_EXTERNAL_TRAFFIC_POLICY";
/// Environment variable holding the default termination grace period
pub const ENV_DEFAULT_TERMINATION_GRACE_PERIOD: &str =
    "NGINX_DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS";

/// Cluster policy values used to fill absent spec fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformDefaults {
    /// Default for `spec.replicas`
    pub replicas: Option<i32>,
    /// Default for `spec.service.type`
    pub service_type: Option<ServiceType>,
    /// Default for `spec.service.externalTrafficPolicy`
    pub external_traffic_policy: Option<ExternalTrafficPolicy>,
    /// Default for `spec.podTemplate.terminationGracePeriodSeconds`
    pub termination_grace_period_seconds: Option<i64>,
}

impl PlatformDefaults {
    /// Load defaults from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load defaults through an arbitrary key lookup.
    ///
    /// Unset or blank variables leave the default unconfigured; values that
    /// do not parse are a configuration error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let defaults = Self {
            replicas: parse_var(&lookup, ENV_DEFAULT_REPLICAS)?,
            service_type: parse_var(&lookup, ENV_DEFAULT_SERVICE_TYPE)?,
            external_traffic_policy: parse_var(&lookup, ENV_DEFAULT_EXTERNAL_TRAFFIC_POLICY)?,
            termination_grace_period_seconds: parse_var(
                &lookup,
                ENV_DEFAULT_TERMINATION_GRACE_PERIOD,
            )?,
        };

        if defaults.replicas.is_some_and(|r| r < 0) {
            return Err(Error::InvalidConfig(format!(
                "{ENV_DEFAULT_REPLICAS} must be non-negative"
            )));
        }
        if defaults.termination_grace_period_seconds.is_some_and(|s| s < 0) {
            return Err(Error::InvalidConfig(format!(
                "{ENV_DEFAULT_TERMINATION_GRACE_PERIOD} must be non-negative"
            )));
        }

        info!(
            replicas = ?defaults.replicas,
            service_type = ?defaults.service_type,
            external_traffic_policy = ?defaults.external_traffic_policy,
            termination_grace_period_seconds = ?defaults.termination_grace_period_seconds,
            "Loaded platform defaults"
        );
        Ok(defaults)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::InvalidConfig(format!("{key}={raw:?}: {e}"))),
        _ => Ok(None),
    }
}
