//! Registry of known document shapes.
//!
//! The table is built once on first use and read-only afterwards. It maps
//! each registered apiVersion/kind pair to the type that decodes it.

use std::collections::HashMap;
use std::sync::LazyLock;

use kube::core::{GroupVersionKind, Resource};
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::nginx::{Nginx, NginxList};

/// Document shapes this crate can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// Singular resource
    Nginx,
    /// List of resources
    NginxList,
}

/// A decoded document
#[derive(Debug, Clone)]
pub enum Document {
    /// Singular resource
    Nginx(Box<Nginx>),
    /// List of resources
    NginxList(NginxList),
}

static REGISTRY: LazyLock<HashMap<GroupVersionKind, DocumentShape>> = LazyLock::new(|| {
    let group = Nginx::group(&());
    let version = Nginx::version(&());
    let kind = Nginx::kind(&());
    HashMap::from([
        (
            GroupVersionKind::gvk(&group, &version, &kind),
            DocumentShape::Nginx,
        ),
        (
            GroupVersionKind::gvk(&group, &version, &format!("{kind}List")),
            DocumentShape::NginxList,
        ),
    ])
});

/// Shape registered for an apiVersion/kind pair.
pub fn lookup(api_version: &str, kind: &str) -> Option<DocumentShape> {
    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    REGISTRY
        .get(&GroupVersionKind::gvk(group, version, kind))
        .copied()
}

/// Every registered apiVersion/kind pair
pub fn registered() -> impl Iterator<Item = (&'static GroupVersionKind, DocumentShape)> {
    REGISTRY.iter().map(|(gvk, shape)| (gvk, *shape))
}

/// Decode a document by dispatching on its apiVersion and kind.
pub fn decode(value: Value) -> Result<Document, Error> {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let (api_version, kind) = (field("apiVersion"), field("kind"));

    match lookup(&api_version, &kind) {
        Some(DocumentShape::Nginx) => {
            debug!(%api_version, %kind, "Decoding Nginx document");
            Ok(Document::Nginx(Box::new(serde_json::from_value(value)?)))
        }
        Some(DocumentShape::NginxList) => {
            debug!(%api_version, %kind, "Decoding NginxList document");
            Ok(Document::NginxList(serde_json::from_value(value)?))
        }
        None => Err(Error::UnknownKind { api_version, kind }),
    }
}
