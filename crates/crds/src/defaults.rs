//! Defaulting rules for [`NginxSpec`].
//!
//! Defaulting only fills absent fields; anything the caller set is left
//! untouched, which also makes it idempotent.

use tracing::debug;

use crate::config::PlatformDefaults;
use crate::nginx::{ConfigKind, DEFAULT_IMAGE, NginxSpec};

impl NginxSpec {
    /// Fill every absent field in place.
    pub fn apply_defaults(&mut self, defaults: &PlatformDefaults) {
        if self.replicas.is_none() {
            self.replicas = defaults.replicas;
        }

        if self.image.as_deref().is_none_or(str::is_empty) {
            debug!(image = DEFAULT_IMAGE, "Defaulting image");
            self.image = Some(DEFAULT_IMAGE.to_string());
        }

        if let Some(config) = self.config.as_mut() {
            config.kind.get_or_insert(ConfigKind::ConfigMap);
        }

        if let Some(certificates) = self.certificates.as_mut() {
            for item in &mut certificates.items {
                if item.certificate_path.is_empty() {
                    item.certificate_path.clone_from(&item.certificate_field);
                }
                if item.key_path.is_empty() {
                    item.key_path.clone_from(&item.key_field);
                }
            }
        }

        if let Some(service) = self.service.as_mut() {
            if service.type_.is_none() {
                service.type_ = defaults.service_type;
            }
            if service.external_traffic_policy.is_none() {
                service.external_traffic_policy = defaults.external_traffic_policy;
            }
            service.use_pod_selector.get_or_insert(true);
        }

        if self.pod_template.termination_grace_period_seconds.is_none() {
            self.pod_template.termination_grace_period_seconds =
                defaults.termination_grace_period_seconds;
        }
    }

    /// Defaulted copy of this spec.
    #[must_use]
    pub fn defaulted(mut self, defaults: &PlatformDefaults) -> Self {
        self.apply_defaults(defaults);
        self
    }
}
