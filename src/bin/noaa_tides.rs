use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use noaa_tides::{DataFormat, Location, Product, Tides, TidesConfig, TidesError};

#[derive(Parser)]
#[command(name = "noaa-tides")]
#[command(about = "Download and cache NOAA CO-OPS tides, water level and temperature data")]
#[command(version)]
struct Cli {
    /// Cache directory. Defaults to the system cache directory.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// JSON config file (endpoint, datum, timeout, retry, gap policy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Populate the cache with all-history data")]
    Download(DownloadArgs),
    #[command(about = "Load one product for a station and print it")]
    Load(LoadArgs),
}

#[derive(Args)]
struct DownloadArgs {
    /// hourly_height, water_level, air_temperature, water_temperature or all
    product: String,
    /// A station id, name, alias, or all
    station_id: String,
    /// raw, clean or all
    data_format: String,
}

#[derive(Args)]
struct LoadArgs {
    product: String,
    /// A station id, name or alias
    station_id: String,
    /// First day, YYYYMMDD
    #[arg(long)]
    start: Option<String>,
    /// Last day, YYYYMMDD
    #[arg(long)]
    end: Option<String>,
    #[arg(long)]
    all_history: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, TidesError> {
    let config = cli
        .config
        .as_deref()
        .map(TidesConfig::from_path)
        .transpose()?;
    let client = Tides::builder()
        .maybe_cache_folder(cli.cache_dir)
        .maybe_config(config)
        .build()
        .await?;

    match cli.command {
        Command::Download(args) => {
            let format: DataFormat = args.data_format.parse()?;
            let station = if args.station_id.eq_ignore_ascii_case("all") {
                args.station_id
            } else {
                resolve_station(&client, &args.station_id)?
            };
            let report = client.download(&args.product, &station, format).await?;
            for done in &report.completed {
                if done.missing_chunks > 0 {
                    println!(
                        "partial {} {} ({} chunks missing, not cached)",
                        done.station_id, done.product, done.missing_chunks
                    );
                } else {
                    println!("ok      {} {}", done.station_id, done.product);
                }
            }
            for product in &report.skipped {
                println!("skipped unsupported product '{product}'");
            }
            for failure in &report.failed {
                println!(
                    "failed  {} {}: {}",
                    failure.station_id, failure.product, failure.error
                );
            }
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Load(args) => {
            let product: Product = args.product.parse()?;
            let station = resolve_station(&client, &args.station_id)?;
            let location = Location::parse(station, args.start.as_deref(), args.end.as_deref())?;
            let result = client
                .load()
                .product(product)
                .location(&location)
                .all_history(args.all_history)
                .call()
                .await?;
            println!("{}", result.frame);
            println!(
                "{} rows of {} for station {} ({:?})",
                result.frame.height(),
                result.product,
                result.station_id,
                result.origin
            );
            if !result.is_complete() {
                println!("{} chunks could not be fetched", result.missing.len());
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Accepts an id from the catalog or a loose station name ("portland", "bh").
fn resolve_station(client: &Tides, query: &str) -> Result<String, TidesError> {
    let catalog = client.catalog();
    if catalog.get(query).is_ok() {
        return Ok(query.to_string());
    }
    Ok(catalog.station_id_for_name(query)?.to_string())
}
