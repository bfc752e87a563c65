//! Nginx CRD Definitions
//!
//! Desired/observed state contract for the `Nginx` custom resource:
//! schema types, defaulting, validation, reference description and status
//! projection. Reconciling the cluster towards the spec happens elsewhere.

pub mod admission;
pub mod config;
pub mod conversion;
mod defaults;
pub mod error;
pub mod nginx;
pub mod references;
pub mod registry;
pub mod status;
mod validation;

#[cfg(test)]
mod validation_test;

pub use admission::*;
pub use config::*;
pub use conversion::*;
pub use error::*;
pub use nginx::*;
pub use references::*;
pub use registry::{Document, DocumentShape, decode};
pub use status::*;
