use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use ubisim::api::run_http_server;
use ubisim::data::load_reference_data;
use ubisim::lookup::{DEFAULT_ENDPOINT, HttpBaselineLookup};
use ubisim::session::Simulator;

#[derive(Parser, Debug)]
#[command(
    name = "ubisim",
    about = "Budget-neutral basic income simulator (gamma calibration + per-household payout estimates)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP JSON API.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(
        long,
        default_value = "data",
        help = "Directory holding the reference dataset files"
    )]
    data_dir: PathBuf,
    #[arg(
        long,
        default_value = DEFAULT_ENDPOINT,
        help = "Baseline benefit calculator endpoint"
    )]
    lookup_url: String,
    #[arg(
        long,
        default_value_t = 1000,
        help = "Quiet window after an edit before a computation pass, in milliseconds"
    )]
    debounce_ms: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ubisim=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) {
    let reference = match load_reference_data(&args.data_dir) {
        Ok(reference) => reference,
        Err(error) => {
            error!(%error, "reference data load failed");
            std::process::exit(1);
        }
    };
    info!(persons = reference.persons.len(), "reference data loaded");

    let lookup = Arc::new(HttpBaselineLookup::new(args.lookup_url));
    let simulator = Simulator::new(reference, lookup, Duration::from_millis(args.debounce_ms));

    if let Err(error) = run_http_server(simulator, args.port).await {
        error!(%error, "server error");
        std::process::exit(1);
    }
}
