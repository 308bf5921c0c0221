use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use epod_dropoff::sdk::{
    appointments::{check_appointment, todays_board, AppointmentRecord},
    clock::{fetch_manila_time, manila_today, Clock, FixedClock, SystemClock},
    config::AppConfig,
    deliveries::{DeliveryRecord, PreDeliveryRecord},
    geocoding::{
        CacheOnlyProvider, GeocodingCache, GeocodingProvider, JsonFileStore, KeyValueStore, MemoryStore,
        OpenCageProvider,
    },
    ranking::{attach_received_by, DropOffRanker},
    rows::parse_rows,
    timestamp::parse_timestamp,
    util::{log::init_logging, rate_limit::geocode_limiter},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fs, path::Path, path::PathBuf, process::ExitCode, sync::Arc};

/// Nearest drop-off ranking and appointment checks for the e-POD dashboard
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON file holding the persistent geocode cache
    #[arg(long, global = true, default_value = "geo_cache.json")]
    cache: PathBuf,

    /// Keep geocodes in memory only for this run
    #[arg(long, global = true)]
    in_memory: bool,

    /// Log cache hits, misses and per-row skips
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank today's deliveries by distance from a warehouse
    Rank {
        /// Warehouse address to measure from
        #[arg(short, long)]
        warehouse: String,

        /// JSON array of delivery rows
        #[arg(short, long)]
        deliveries: PathBuf,

        /// [Optional] JSON array of pre-delivery confirmations, to fill in "received_by"
        #[arg(long)]
        pre_deliveries: Option<PathBuf>,

        /// [Optional] Write the ranking here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// [Optional] Pretend today is this Manila date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Check whether a plate already has an open appointment that day
    CheckAppointment {
        /// JSON array of existing appointments
        #[arg(short, long)]
        appointments: PathBuf,

        #[arg(short, long)]
        plate: String,

        /// Proposed date (YYYY-MM-DD in Manila, or RFC 3339)
        #[arg(short, long)]
        date: String,

        /// Appointment being edited, so it doesn't clash with itself
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Print today's appointments in board order
    Board {
        #[arg(short, long)]
        appointments: PathBuf,

        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Resolve one address through the cache
    Geocode { address: String },
    /// Manage the geocode cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Forget one address so the next lookup hits the provider again
    Evict { address: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    match &cli.command {
        Command::Rank {
            warehouse,
            deliveries,
            pre_deliveries,
            output,
            today,
        } => {
            let records: Vec<DeliveryRecord> = read_rows(deliveries, "delivery")?;
            log::info!("Loaded {} delivery rows from {}", records.len(), deliveries.display());

            let clock = resolve_clock(&config, *today).await?;
            let ranker = DropOffRanker::new(build_cache(&cli, &config)?)
                .with_clock(clock)
                .with_concurrency(config.geocoder.concurrency);

            let mut ranked = ranker.rank(warehouse, &records).await;
            if ranked.is_empty() {
                log::info!("No delivery for today.");
            }
            if let Some(path) = pre_deliveries {
                let pre: Vec<PreDeliveryRecord> = read_rows(path, "pre-delivery")?;
                attach_received_by(&mut ranked, &pre);
            }

            write_output(&serde_json::to_string_pretty(&ranked)?, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckAppointment {
            appointments,
            plate,
            date,
            exclude,
        } => {
            let existing: Vec<AppointmentRecord> = read_rows(appointments, "appointment")?;
            let proposed = parse_timestamp(date).ok_or_else(|| anyhow!("Unreadable date: {}", date))?;

            match check_appointment(&existing, plate, proposed, exclude.as_deref()) {
                Ok(()) => {
                    println!("No conflicting appointment for {}.", plate);
                    Ok(ExitCode::SUCCESS)
                }
                Err(conflict) => {
                    log::warn!("Blocked by appointment {}", conflict.existing_appointment_id);
                    println!("{}", conflict);
                    Ok(ExitCode::from(2))
                }
            }
        }
        Command::Board {
            appointments,
            today,
        } => {
            let existing: Vec<AppointmentRecord> = read_rows(appointments, "appointment")?;
            let clock = resolve_clock(&config, *today).await?;
            let board = todays_board(&existing, manila_today(clock.as_ref()));
            println!("{}", serde_json::to_string_pretty(&board)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Geocode { address } => {
            let cache = build_cache(&cli, &config)?;
            match cache.resolve(address).await {
                Some(coord) => {
                    println!("{}", serde_json::to_string(&coord)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("Coordinates not found.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Cache {
            action: CacheAction::Evict { address },
        } => {
            let cache = build_cache(&cli, &config)?;
            if cache.evict(address)? {
                log::info!("Evicted \"{}\" from {}", address, cli.cache.display());
            } else {
                log::info!("\"{}\" was not cached", address);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_cache(cli: &Cli, config: &AppConfig) -> Result<GeocodingCache> {
    let store: Arc<dyn KeyValueStore> = if cli.in_memory {
        Arc::new(MemoryStore::new())
    } else {
        let store = JsonFileStore::open(&cli.cache)
            .with_context(|| format!("Failed to open geo cache {}", cli.cache.display()))?;
        log::info!("💾 Using geo cache {} ({} entries)", cli.cache.display(), store.len());
        Arc::new(store)
    };

    let provider: Arc<dyn GeocodingProvider> = if config.geocoder.api_key.is_some() {
        let limiter = geocode_limiter(config.geocoder.rate_per_minute);
        Arc::new(OpenCageProvider::from_config(&config.geocoder, limiter)?)
    } else {
        log::warn!("OPENCAGE_API_KEY is not set; only cached addresses will resolve");
        Arc::new(CacheOnlyProvider)
    };

    Ok(GeocodingCache::new(store, provider))
}

async fn resolve_clock(config: &AppConfig, today: Option<NaiveDate>) -> Result<Arc<dyn Clock>> {
    if let Some(date) = today {
        let clock = FixedClock::at_manila_date(date).ok_or_else(|| anyhow!("Invalid date: {}", date))?;
        return Ok(Arc::new(clock));
    }

    if let Some(api_key) = &config.time_source.api_key {
        let client = reqwest::Client::builder().timeout(config.geocoder.timeout).build()?;
        if let Some(now) = fetch_manila_time(&client, &config.time_source.base_url, api_key).await {
            log::info!("Using TimeZoneDB time {}", now);
            return Ok(Arc::new(FixedClock(now)));
        }
        log::warn!("Falling back to the system clock");
    }

    Ok(Arc::new(SystemClock))
}

/// Reads a JSON array; rows that don't deserialize are logged and skipped.
fn read_rows<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<Vec<T>> {
    let data = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let rows: Vec<Value> =
        serde_json::from_str(&data).with_context(|| format!("Expected a JSON array in {}", path.display()))?;
    Ok(parse_rows(rows, kind))
}

fn write_output(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("✅ Ranking written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
