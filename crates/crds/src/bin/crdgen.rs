//! Prints the Nginx CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run --bin crdgen > config/crd/nginx.yaml`

use kube::CustomResourceExt;
use nginx_crds::Nginx;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(crd = Nginx::crd_name(), "Generating CRD manifest");
    print!("{}", serde_yaml::to_string(&Nginx::crd())?);
    Ok(())
}
