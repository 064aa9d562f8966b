use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use incident_tracker::{
    analytics::{ElapsedBucket, IncidentBreakdown, IncidentExporter},
    config::Config,
    lifecycle::{format_duration, Clock, IncidentService, ManualClock, SystemClock},
    models::{Incident, IncidentStatus},
    state::{IncidentFilter, InMemoryStore},
    telemetry,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "incident-tracker")]
#[command(about = "Incident lifecycle and elapsed-time tooling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a millisecond duration
    Format {
        #[arg(value_name = "MILLIS", allow_negative_numbers = true)]
        millis: i64,
    },

    /// Show live elapsed time for incidents in a dump
    Elapsed {
        /// JSON array of incidents
        #[arg(short, long)]
        file: PathBuf,

        /// Evaluate as of this RFC 3339 instant instead of now
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,

        /// Only these statuses (Open, Closed, ReOpen)
        #[arg(short, long)]
        status: Vec<IncidentStatus>,

        /// Only incidents under this many hours (4, 8, 12 or 24)
        #[arg(long)]
        max_hours: Option<u64>,

        #[arg(short, long, default_value = "0")]
        page: u32,

        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Export incidents to CSV
    Export {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,

        /// Only incidents under this many hours (4, 8, 12 or 24)
        #[arg(long)]
        max_hours: Option<u64>,
    },

    /// Print dashboard breakdown as JSON
    Summary {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },

    /// Close an incident in the dump and write it back
    Close {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, value_name = "INCIDENT_ID")]
        id: Uuid,

        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },

    /// Reopen a closed incident in the dump and write it back
    Reopen {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, value_name = "INCIDENT_ID")]
        id: Uuid,

        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    telemetry::init_tracing(&config.observability);

    match cli.command {
        Commands::Format { millis } => {
            println!("{}", format_duration(millis));
        }

        Commands::Elapsed {
            file,
            at,
            status,
            max_hours,
            page,
            page_size,
        } => {
            let (service, _) = service_for(&file, at, &config).await?;
            let bucket = max_hours.map(bucket_for).transpose()?;
            let filter = IncidentFilter {
                statuses: status,
                ..Default::default()
            };

            let rows = service
                .list_with_elapsed(&filter, bucket, page, config.listing.page_size(page_size))
                .await?;

            for (_, view) in &rows {
                println!("{:<20} {:<8} {}", view.reference, view.status, view.formatted);
            }
        }

        Commands::Export {
            file,
            output,
            at,
            max_hours,
        } => {
            let incidents = read_dump(&file).await?;
            let now = at.unwrap_or_else(Utc::now);

            let bytes = match max_hours {
                None => IncidentExporter::write_csv(&incidents, now, &output).await?,
                Some(hours) => {
                    let bucket = bucket_for(hours)?;
                    let bytes = IncidentExporter::to_csv_within(&incidents, bucket, now)?;
                    tokio::fs::write(&output, &bytes)
                        .await
                        .with_context(|| format!("writing {}", output.display()))?;
                    bytes
                }
            };

            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }

        Commands::Summary { file, at } => {
            let incidents = read_dump(&file).await?;
            let now = at.unwrap_or_else(Utc::now);

            let breakdown = IncidentBreakdown::from_incidents(&incidents, now);
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }

        Commands::Close { file, id, at } => {
            let (service, store) = service_for(&file, at, &config).await?;
            let incident = service.close_incident(&id).await?;
            write_dump(&file, &store.snapshot()).await?;
            println!("{}", serde_json::to_string_pretty(&incident)?);
        }

        Commands::Reopen { file, id, at } => {
            let (service, store) = service_for(&file, at, &config).await?;
            let incident = service.reopen_incident(&id).await?;
            write_dump(&file, &store.snapshot()).await?;
            println!("{}", serde_json::to_string_pretty(&incident)?);
        }
    }

    Ok(())
}

fn bucket_for(hours: u64) -> anyhow::Result<ElapsedBucket> {
    match ElapsedBucket::from_max_hours(hours) {
        Some(bucket) => Ok(bucket),
        None => bail!("--max-hours must be one of 4, 8, 12 or 24, got {}", hours),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

async fn read_dump(path: &Path) -> anyhow::Result<Vec<Incident>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let incidents: Vec<Incident> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    tracing::debug!(path = %path.display(), count = incidents.len(), "Loaded incident dump");
    Ok(incidents)
}

async fn write_dump(path: &Path, incidents: &[Incident]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(incidents)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

async fn service_for(
    path: &Path,
    at: Option<DateTime<Utc>>,
    config: &Config,
) -> anyhow::Result<(IncidentService, InMemoryStore)> {
    let store = InMemoryStore::with_incidents(read_dump(path).await?);

    let clock: Arc<dyn Clock> = match at {
        Some(instant) => Arc::new(ManualClock::new(instant)),
        None => Arc::new(SystemClock),
    };

    let service = IncidentService::new(Arc::new(store.clone()), clock)
        .with_config(config.lifecycle.clone());

    Ok((service, store))
}
