use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kube_status::prelude::*;
use std::path::PathBuf;

#[derive(Args)]
pub struct ServeArgs {
    /// Configuration file (defaults to the standard search paths)
    #[arg(short, long, value_name = "FILE", env = "KUBE_STATUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Base URL of a dependency whose readiness gates ours (repeatable)
    #[arg(long = "dependency", value_name = "URL")]
    pub dependencies: Vec<String>,

    /// Report ready only while this file exists
    #[arg(long, value_name = "PATH")]
    pub ready_file: Option<PathBuf>,

    /// Report healthy only while this file exists
    #[arg(long, value_name = "PATH")]
    pub health_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    if let Some(port) = args.port {
        config.service.port = port;
    }
    if !args.dependencies.is_empty() {
        config.service.dependencies = args.dependencies;
    }

    init_tracing(&config).context("Failed to initialize tracing")?;

    let service = Service::builder()
        .with_config(config)
        .health_fn(file_check(args.health_file))
        .readiness_fn(file_check(args.ready_file))
        .build()
        .context("Invalid service definition")?;

    service
        .start()
        .await
        .context("Failed to start status service")?;

    println!(
        "{} {} serving as {} on {}",
        "✓".green().bold(),
        service.config().service.name.bold(),
        service.id(),
        service.url()
    );

    let stopped = service.stopped();
    tokio::select! {
        _ = shutdown_signal() => {
            service.shutdown();
            stopped.cancelled().await;
            Ok(())
        }
        _ = stopped.cancelled() => {
            match service.fatal() {
                Some(fatal) if fatal.error != ServeError::Stopped => {
                    tracing::error!(error = %fatal.error, "Serving loop terminated");
                    Err(Error::Fatal(fatal.error)).context("Status service terminated")
                }
                _ => Ok(()),
            }
        }
    }
}

/// A check that passes while `path` exists, or always when unset
fn file_check(
    path: Option<PathBuf>,
) -> impl Fn() -> std::result::Result<(), CheckError> + Send + Sync + 'static {
    move || match &path {
        Some(path) if !path.exists() => Err(format!("{} does not exist", path.display()).into()),
        _ => Ok(()),
    }
}
