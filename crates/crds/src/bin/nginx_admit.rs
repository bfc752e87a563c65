//! Offline admission check for Nginx documents.
//!
//! Each file argument is parsed (JSON or YAML), defaulted with the platform
//! defaults from the environment and validated. Accepted documents are
//! printed in canonical form; rejected ones list every reason.
//!
//! Exits non-zero when any document is rejected.

use std::path::Path;
use std::{env, fs, process};

use anyhow::Context;
use nginx_crds::{Error, Nginx, PlatformDefaults, admit_json, admit_yaml};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let files: Vec<String> = env::args().skip(1).collect();
    if files.is_empty() {
        anyhow::bail!("usage: nginx-admit <document.json|document.yaml>...");
    }

    let defaults = PlatformDefaults::from_env().context("loading platform defaults")?;

    let mut rejected = 0usize;
    for file in &files {
        match admit_file(Path::new(file), &defaults)? {
            Ok(nginx) => {
                info!(%file, "accepted");
                println!("{}", serde_json::to_string_pretty(&nginx)?);
            }
            Err(Error::Validation(errors)) => {
                rejected += 1;
                for reason in errors {
                    error!(%file, field = %reason.field(), "{reason}");
                }
            }
            Err(e) => {
                rejected += 1;
                error!(%file, "{e}");
            }
        }
    }

    if rejected > 0 {
        error!(rejected, total = files.len(), "documents rejected");
        process::exit(1);
    }
    Ok(())
}

/// Outer error: the file could not be read. Inner: the document was rejected.
fn admit_file(path: &Path, defaults: &PlatformDefaults) -> anyhow::Result<Result<Nginx, Error>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    Ok(if is_json {
        admit_json(&raw, defaults)
    } else {
        admit_yaml(&raw, defaults)
    })
}
