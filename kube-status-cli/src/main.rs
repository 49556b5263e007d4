use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;

use commands::probe::ProbeArgs;
use commands::serve::ServeArgs;

/// kube-status - health and readiness endpoints with dependency propagation
#[derive(Parser)]
#[command(name = "kube-status")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a status service until interrupted
    Serve(ServeArgs),
    /// Query the health or readiness of running services
    Probe(ProbeArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args).await,
        Commands::Probe(args) => commands::probe::execute(args).await,
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_probe() {
        let cli = Cli::try_parse_from([
            "kube-status",
            "probe",
            "--readiness",
            "--uuids",
            "a,b",
            "http://one:8080",
            "http://two:8080",
        ])
        .unwrap();

        match cli.command {
            Commands::Probe(args) => {
                assert!(args.readiness);
                assert_eq!(args.uuids, vec!["a", "b"]);
                assert_eq!(args.urls.len(), 2);
            }
            Commands::Serve(_) => panic!("expected probe"),
        }
    }

    #[test]
    fn test_probe_requires_url() {
        assert!(Cli::try_parse_from(["kube-status", "probe"]).is_err());
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "kube-status",
            "serve",
            "--port",
            "9000",
            "--dependency",
            "http://db-proxy:8080",
            "--dependency",
            "http://cache:8080",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(9000));
                assert_eq!(args.dependencies.len(), 2);
                assert!(args.config.is_none());
            }
            Commands::Probe(_) => panic!("expected serve"),
        }
    }

    #[test]
    fn test_serve_rejects_negative_port() {
        assert!(Cli::try_parse_from(["kube-status", "serve", "--port", "-1"]).is_err());
    }
}
