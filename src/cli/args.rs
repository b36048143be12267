use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "air-pollution-pipeline")]
#[command(about = "Daily air pollution ETL with data-quality gating")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        help = "Settings file path [default: pipeline.toml if present]"
    )]
    pub settings: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "config/cities.yml",
        help = "Cities configuration file"
    )]
    pub cities_file: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run extract, transform and load for every configured city
    Run {
        #[arg(short, long, help = "Logical date (YYYY-MM-DD) [default: today UTC]")]
        date: Option<NaiveDate>,

        #[arg(long, help = "Only process this city")]
        city: Option<String>,
    },

    /// Extract raw data through the quality gate into the bronze layer
    Extract {
        #[arg(short, long)]
        city: String,

        #[arg(short, long, help = "Logical date (YYYY-MM-DD) [default: today UTC]")]
        date: Option<NaiveDate>,

        #[arg(
            long,
            help = "Interval start (epoch seconds) [default: logical date minus one day]"
        )]
        start_ts: Option<i64>,

        #[arg(long, help = "Interval end (epoch seconds) [default: logical date]")]
        end_ts: Option<i64>,
    },

    /// Transform a stored bronze payload into a silver Parquet artifact
    Transform {
        #[arg(short, long)]
        city: String,

        #[arg(short, long, help = "Logical date (YYYY-MM-DD) [default: today UTC]")]
        date: Option<NaiveDate>,

        #[arg(short = 'C', long, default_value = "snappy")]
        compression: String,
    },

    /// Load a silver Parquet artifact into the warehouse
    Load {
        #[arg(short, long)]
        city: String,

        #[arg(short, long, help = "Logical date (YYYY-MM-DD) [default: today UTC]")]
        date: Option<NaiveDate>,
    },
}
