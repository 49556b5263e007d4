use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kube_status::prelude::*;
use std::time::Duration;

#[derive(Args)]
pub struct ProbeArgs {
    /// Query /readiness instead of /healthz
    #[arg(long)]
    pub readiness: bool,

    /// Probe every address instead of stopping at the first failure
    #[arg(long)]
    pub all: bool,

    /// Identifier chain to forward with readiness probes
    #[arg(long, value_name = "UUID", value_delimiter = ',')]
    pub uuids: Vec<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Print each status body as JSON
    #[arg(short, long)]
    pub verbose: bool,

    /// Base URLs of the services to probe
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,
}

pub async fn execute(args: ProbeArgs) -> Result<()> {
    let endpoint = if args.readiness { "readiness" } else { "health" };
    println!("{}", format!("Checking {}...", endpoint).bold());
    println!();

    let client = DependencyClient::new(args.urls)
        .all(args.all)
        .chain(args.uuids)
        .timeout(args.timeout_ms.map(Duration::from_millis));

    let report = if args.readiness {
        client.readiness().await
    } else {
        client.health().await
    };

    for (address, status) in client.addresses().iter().zip(&report.statuses) {
        print!("{} ... ", address);
        match status {
            Some(status) if status.success => println!("{}", "✓ OK".green().bold()),
            Some(status) => println!(
                "{} {}",
                format!("✗ {}", status.code).red().bold(),
                status.message
            ),
            None => println!("{}", "- no status".dimmed()),
        }

        if args.verbose {
            if let Some(status) = status {
                let body = serde_json::to_string_pretty(status)
                    .context("Failed to encode status")?;
                println!("{}", body);
            }
        }
    }

    println!();
    report
        .into_result()
        .with_context(|| format!("{} probe failed", endpoint))?;
    println!("{}", "All services responded successfully!".green().bold());

    Ok(())
}
