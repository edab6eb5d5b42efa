//! Resolve one incident from the command line.
//!
//! ```text
//! incident-resolver "API gateway timeout when payload delivery happened"
//! echo "disk full on db-01" | incident-resolver
//! ```
//!
//! The pipeline is configured from the YAML file named by `RESOLVER_CONFIG`
//! (default `resolver.yaml`). Without that file the resolver runs offline
//! with stub adapters and an empty corpus.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use resolver::ResolverConfig;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "RESOLVER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "resolver.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pure JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .json()
        .init();

    let text = read_incident_text()?;
    let config = load_config()?;
    let pipeline = config
        .build_pipeline()
        .context("failed to build resolution pipeline")?;

    let result = pipeline.resolve(&text).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_incident_text() -> anyhow::Result<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read incident text from stdin")?;
    if buf.trim().is_empty() {
        bail!("usage: incident-resolver <incident text>  (or pipe the text on stdin)");
    }
    Ok(buf)
}

fn load_config() -> anyhow::Result<ResolverConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        return ResolverConfig::from_file(&path)
            .with_context(|| format!("failed to load pipeline config from {path}"));
    }
    tracing::warn!(path = %path, "pipeline config not found; running offline");
    Ok(ResolverConfig::offline())
}
