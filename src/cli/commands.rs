use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, Commands};
use crate::clients::OpenWeatherClient;
use crate::config::{CitiesConfig, City, Settings};
use crate::error::{PipelineError, Result};
use crate::pipeline::{
    ExtractionOutcome, ExtractionRequest, Extractor, ParquetRowWriter, WarehouseLoader,
    transform_records,
};
use crate::storage::{LocalObjectStore, ObjectStore, Partition};
use crate::utils::constants::DAY_SECONDS;
use crate::validation::QualityGate;

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);

    let settings = Settings::load(cli.settings.as_deref())?;
    let cities = CitiesConfig::load(&cli.cities_file)?;

    match cli.command {
        Commands::Run { date, city } => run_all(&settings, &cities, date, city).await,

        Commands::Extract {
            city,
            date,
            start_ts,
            end_ts,
        } => {
            let city = lookup_city(&cities, &city)?;
            let outcome =
                run_extract(&settings, city, logical_datetime(date), start_ts, end_ts).await?;
            match outcome {
                ExtractionOutcome::Stored { key } => {
                    println!("Stored valid payload at {key}");
                    Ok(())
                }
                ExtractionOutcome::Skipped => {
                    println!("No data available; extraction skipped");
                    Ok(())
                }
                ExtractionOutcome::CriticalFailure { reason } => {
                    Err(PipelineError::DataQuality(reason))
                }
            }
        }

        Commands::Transform {
            city,
            date,
            compression,
        } => {
            let city = lookup_city(&cities, &city)?;
            let key = run_transform(&settings, city, logical_datetime(date), &compression).await?;
            println!("Stored silver artifact at {key}");
            Ok(())
        }

        Commands::Load { city, date } => {
            let city = lookup_city(&cities, &city)?;
            let loaded = run_load(&settings, city, logical_datetime(date)).await?;
            println!("Loaded {loaded} rows into the warehouse");
            Ok(())
        }
    }
}

enum CityOutcome {
    Loaded { rows: usize },
    Skipped,
    CriticalFailure { reason: String },
}

async fn run_all(
    settings: &Settings,
    cities: &CitiesConfig,
    date: Option<NaiveDate>,
    only: Option<String>,
) -> Result<()> {
    let logical_date = logical_datetime(date);
    let selected: Vec<&City> = match &only {
        Some(name) => vec![lookup_city(cities, name)?],
        None => cities.cities.iter().collect(),
    };
    let total = selected.len();

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut failures = Vec::new();
    for city in selected {
        progress.set_message(format!("Processing {}", city.name));

        match process_city(settings, city, logical_date).await {
            Ok(CityOutcome::Loaded { rows }) => {
                progress.println(format!("{}: loaded {rows} rows", city.name));
            }
            Ok(CityOutcome::Skipped) => {
                progress.println(format!("{}: no data available, skipped", city.name));
            }
            Ok(CityOutcome::CriticalFailure { reason }) => {
                progress.println(format!("{}: critical data quality failure", city.name));
                failures.push(format!("{}: {reason}", city.name));
            }
            Err(err) => {
                progress.println(format!("{}: failed ({err})", city.name));
                failures.push(format!("{}: {err}", city.name));
            }
        }

        progress.inc(1);
    }
    progress.finish_with_message("Pipeline run complete");

    if failures.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::DataQuality(format!(
            "{} of {total} cities failed: {}",
            failures.len(),
            failures.join("; ")
        )))
    }
}

async fn process_city(
    settings: &Settings,
    city: &City,
    logical_date: DateTime<Utc>,
) -> Result<CityOutcome> {
    match run_extract(settings, city, logical_date, None, None).await? {
        ExtractionOutcome::Skipped => Ok(CityOutcome::Skipped),
        ExtractionOutcome::CriticalFailure { reason } => {
            Ok(CityOutcome::CriticalFailure { reason })
        }
        ExtractionOutcome::Stored { .. } => {
            run_transform(settings, city, logical_date, "snappy").await?;
            let rows = run_load(settings, city, logical_date).await?;
            Ok(CityOutcome::Loaded { rows })
        }
    }
}

async fn run_extract(
    settings: &Settings,
    city: &City,
    logical_date: DateTime<Utc>,
    start_ts: Option<i64>,
    end_ts: Option<i64>,
) -> Result<ExtractionOutcome> {
    let api = OpenWeatherClient::new(&settings.api.base_url, &settings.api.key)?;
    let store = LocalObjectStore::new(&settings.storage.root);
    let gate = QualityGate::new(
        settings.quality.threshold_percent,
        settings.quality.min_failed_items,
    );
    let extractor = Extractor::new(api, store, gate);

    let end_ts = end_ts.unwrap_or_else(|| logical_date.timestamp());
    let start_ts = start_ts.unwrap_or(end_ts - DAY_SECONDS);

    extractor
        .extract_and_store(&ExtractionRequest {
            city: city.name.clone(),
            lat: city.lat,
            lon: city.lon,
            start_ts,
            end_ts,
            logical_date,
        })
        .await
}

async fn run_transform(
    settings: &Settings,
    city: &City,
    logical_date: DateTime<Utc>,
    compression: &str,
) -> Result<String> {
    let store = LocalObjectStore::new(&settings.storage.root);
    let partition = Partition::new(&city.name, logical_date);

    let payload = store.get_json(&partition.valid_key()).await?;
    let rows = transform_records(&payload, &city.name)?;

    let writer = ParquetRowWriter::new().with_compression(compression)?;
    let key = partition.silver_key();
    store.put_bytes(writer.write_to_bytes(&rows)?, &key).await?;

    Ok(key)
}

async fn run_load(settings: &Settings, city: &City, logical_date: DateTime<Utc>) -> Result<usize> {
    let store = LocalObjectStore::new(&settings.storage.root);
    let partition = Partition::new(&city.name, logical_date);

    let bytes = store.get_bytes(&partition.silver_key()).await?;
    let rows = ParquetRowWriter::new().read_rows(bytes)?;

    let mut loader = WarehouseLoader::open(&settings.warehouse.db_path)?;
    loader.load(&rows, &city.name)
}

fn lookup_city<'a>(cities: &'a CitiesConfig, name: &str) -> Result<&'a City> {
    cities
        .find(name)
        .ok_or_else(|| PipelineError::CityNotFound(name.to_string()))
}

/// Midnight UTC of the scheduling date.
fn logical_datetime(date: Option<NaiveDate>) -> DateTime<Utc> {
    date.unwrap_or_else(|| Utc::now().date_naive())
        .and_time(NaiveTime::MIN)
        .and_utc()
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
