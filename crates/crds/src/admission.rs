//! Submission pipeline: parse, default, validate.
//!
//! Pure and synchronous. Structural errors abort before defaulting runs;
//! validation errors are reported together after it. A document is either
//! fully accepted in canonical form or rejected.

use tracing::{debug, info, warn};

use crate::config::PlatformDefaults;
use crate::error::Error;
use crate::nginx::Nginx;

/// Default and validate an already-decoded resource.
pub fn admit(mut nginx: Nginx, defaults: &PlatformDefaults) -> Result<Nginx, Error> {
    let name = nginx.metadata.name.clone().unwrap_or_default();
    nginx.spec.apply_defaults(defaults);
    debug!(%name, "Applied defaults");

    if let Err(errors) = nginx.spec.validate() {
        warn!(%name, %errors, "Rejected Nginx spec");
        return Err(errors.into());
    }

    info!(%name, "Admitted Nginx spec");
    Ok(nginx)
}

/// Parse a JSON document and admit it.
pub fn admit_json(raw: &str, defaults: &PlatformDefaults) -> Result<Nginx, Error> {
    let nginx: Nginx = serde_json::from_str(raw)?;
    admit(nginx, defaults)
}

/// Parse a YAML document and admit it.
pub fn admit_yaml(raw: &str, defaults: &PlatformDefaults) -> Result<Nginx, Error> {
    let nginx: Nginx = serde_yaml::from_str(raw)?;
    admit(nginx, defaults)
}
