//! Command-line interface for the hemolens service.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hemolens::{AppConfig, ReportReader, api};

#[derive(Parser)]
#[command(name = "hemolens", version, about = "Blood-test report analysis service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind to.
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(short = 'p', long, default_value_t = 8080)]
        port: u16,
    },

    /// Extract the text of a blood-test report PDF and print it.
    Extract {
        /// Path of the PDF file.
        path: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port } => {
            let config = AppConfig::from_env().context("failed to load configuration")?;
            api::serve(&host, port, config).await?;
        }
        Command::Extract { path } => {
            let reader = ReportReader::new();
            let text = reader
                .extract(&path)
                .with_context(|| format!("failed to extract {}", path.display()))?;
            println!("{text}");
        }
    }

    Ok(())
}
