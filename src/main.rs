//! cloudflare-update-dns - point a Cloudflare zone at your public IP.

use clap::Parser;
use cloudflare_update_dns::config::Config;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudflare-update-dns")]
#[command(about = "Update Cloudflare DNS with your IP address")]
#[command(version)]
struct Cli {
    /// Path to config file (defaults to ./config.json, then the user and system config dirs)
    #[arg(short, long, env = "CLOUDFLARE_UPDATE_DNS_CONFIG")]
    config: Option<PathBuf>,
}

fn get_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(Config::default_path)
}

/// Progress goes to stdout, warnings and errors to stderr.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(
            std::io::stderr
                .with_max_level(Level::WARN)
                .or_else(std::io::stdout),
        )
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = get_config_path(cli.config);
    let report = cloudflare_update_dns::run(&config_path).await?;

    // Individual record failures were already reported and do not fail the run.
    println!(
        "IP {}: {} record(s) fetched, {} updated, {} failed",
        report.ip,
        report.fetched,
        report.updated(),
        report.failed()
    );

    Ok(())
}
