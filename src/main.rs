//! CLI entry point for the bus network tool.
//!
//! One subcommand per pipeline stage: parse the raw timetable export,
//! geocode its stops, then build and analyze the network.

use anyhow::{Context, Result};
use bus_network::{
    fetch::BasicClient,
    geocode::{
        DEFAULT_ENDPOINT, DEFAULT_ERROR_WAIT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_INTERVAL,
        DEFAULT_REGION, DEFAULT_USER_AGENT, NominatimGeocoder, RateLimited,
    },
    network::DEFAULT_SAMPLE_SIZE,
    pipeline::{AnalyzeOptions, MergeSpec, run_analyze, run_geocode, run_parse},
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bus_network")]
#[command(about = "Turn a bus timetable export into an analyzed stop network", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the raw timetable export into a long-format route table
    Parse {
        /// Semicolon-delimited timetable export
        #[arg(short, long, default_value = "ORARI_MERGED.csv")]
        input: PathBuf,

        /// Route table to write
        #[arg(short, long, default_value = "all_routes.csv")]
        output: PathBuf,
    },
    /// Attach coordinates to every stop of the route table
    Geocode {
        /// Route table produced by `parse`
        #[arg(short, long, default_value = "all_routes.csv")]
        input: PathBuf,

        /// Geocoded table to write
        #[arg(short, long, default_value = "all_routes_with_coords.csv")]
        output: PathBuf,

        /// Base URL of the Nominatim-compatible geocoding service
        #[arg(long, env = "GEOCODER_URL", default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        /// User agent identifying this application to the service
        #[arg(long, env = "GEOCODER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,

        /// Region appended to every stop name
        #[arg(long, env = "GEOCODER_REGION", default_value = DEFAULT_REGION)]
        region: String,

        /// Minimum delay between consecutive lookups, in milliseconds
        #[arg(long, env = "GEOCODER_MIN_DELAY_MS", default_value_t = DEFAULT_MIN_INTERVAL.as_millis() as u64)]
        min_delay_ms: u64,

        /// Per-request timeout, in seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Build the network graph, score and merge routes, and write plots and maps
    Analyze {
        /// Geocoded table produced by `geocode`
        #[arg(short, long, default_value = "all_routes_with_coords.csv")]
        input: PathBuf,

        /// Directory for every artifact of the run
        #[arg(short = 'd', long, default_value = "output")]
        output_dir: PathBuf,

        /// Merge two routes: ROUTE1,ROUTE2[,NAME] (repeatable)
        #[arg(long = "merge", value_name = "ROUTE1,ROUTE2[,NAME]")]
        merges: Vec<MergeSpec>,

        /// Stops sampled by the demand simulation
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,

        /// Seed for the demand simulation
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bus_network.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_network.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { input, output } => {
            let records = run_parse(&input, &output)?;
            info!(records = records.len(), output = %output.display(), "Route table written");
        }
        Commands::Geocode {
            input,
            output,
            endpoint,
            user_agent,
            region,
            min_delay_ms,
            timeout_secs,
        } => {
            let client = BasicClient::new(&user_agent, Duration::from_secs(timeout_secs))
                .context("failed to build HTTP client")?;
            let geocoder = RateLimited::new(
                NominatimGeocoder::new(client, &endpoint)?,
                Duration::from_millis(min_delay_ms),
            )
            .with_retries(DEFAULT_MAX_RETRIES, DEFAULT_ERROR_WAIT);

            info!(endpoint = %endpoint, region = %region, min_delay_ms, "Geocoding stops");
            let geocoded = run_geocode(&geocoder, &input, &output, &region).await?;
            let resolved = geocoded.iter().filter(|r| r.coordinates.is_some()).count();
            info!(
                records = geocoded.len(),
                resolved,
                output = %output.display(),
                "Geocoded table written"
            );
        }
        Commands::Analyze {
            input,
            output_dir,
            merges,
            sample_size,
            seed,
        } => {
            let options = AnalyzeOptions {
                output_dir,
                merges,
                sample_size,
                seed,
            };
            let outcome = run_analyze(&input, &options)?;
            for path in &outcome.artifacts {
                info!(path = %path.display(), "Artifact written");
            }
        }
    }

    Ok(())
}
