//! CLI entry point for the rail punctuality dashboard engine.
//!
//! Provides subcommands for building a full filtered report, listing the
//! selectable filter values, and searching stations in a published dataset.

use anyhow::Result;
use chrono::Weekday;
use clap::{Args, Parser, Subcommand};
use rail_punctuality::analytics::{
    FilterState, HistogramMode, RankingMetric, ReportOptions, TimeWindow, WeekdayMask,
};
use rail_punctuality::fetch::BasicClient;
use rail_punctuality::loader::{Dataset, load_dataset};
use rail_punctuality::output::{print_json, print_pretty, write_leaderboards, write_report};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rail_punctuality")]
#[command(about = "Filtered punctuality views over pre-aggregated train data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every dashboard view for a filter and write it as JSON
    Report {
        /// Dataset directory or base URL
        #[arg(short, long, env = "DATA_SOURCE", value_name = "DIR_OR_URL")]
        source: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Leaderboard ranking: ratio, late, late-minutes, cancelled, suppressed
        #[arg(long, default_value = "ratio")]
        rank_by: RankingMetric,

        /// Show the histogram as percentages of the filtered total
        #[arg(long, default_value_t = false)]
        hist_percent: bool,

        /// Restrict the city leaderboard to provincial capitals
        #[arg(long, default_value_t = false)]
        capitals_only: bool,

        /// JSON file to write the report to
        #[arg(short, long, default_value = "report.json")]
        output: String,

        /// Gzip compress the report
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Optional: directory to export leaderboard CSVs to
        #[arg(long)]
        leaderboards_csv: Option<String>,
    },
    /// List the selectable years, categories, stations and day range
    Options {
        /// Dataset directory or base URL
        #[arg(short, long, env = "DATA_SOURCE", value_name = "DIR_OR_URL")]
        source: String,
    },
    /// Search stations by name or code
    Stations {
        /// Dataset directory or base URL
        #[arg(short, long, env = "DATA_SOURCE", value_name = "DIR_OR_URL")]
        source: String,

        /// Text matched against station names and codes, accents ignored
        query: String,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Year, or "all"
    #[arg(long, default_value = "all")]
    year: String,

    /// Train category, or "all"
    #[arg(long, default_value = "all")]
    category: String,

    /// Origin station code, or "all"
    #[arg(long, default_value = "all")]
    origin: String,

    /// Destination station code, or "all"
    #[arg(long, default_value = "all")]
    destination: String,

    /// First day (YYYY-MM-DD), inclusive
    #[arg(long = "from")]
    date_from: Option<String>,

    /// Last day (YYYY-MM-DD), inclusive
    #[arg(long = "to")]
    date_to: Option<String>,

    /// Comma-separated weekdays, e.g. mon,tue,fri
    #[arg(long, value_delimiter = ',')]
    weekdays: Vec<Weekday>,

    /// Window start (HH:MM)
    #[arg(long)]
    time_from: Option<String>,

    /// Window end (HH:MM); may be earlier than the start to wrap midnight
    #[arg(long)]
    time_to: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> FilterState {
        let mut filter = FilterState::new();
        filter.set_year(&self.year);
        filter.set_category(&self.category);
        filter.set_origin(&self.origin);
        filter.set_destination(&self.destination);
        filter.set_date_range(self.date_from.as_deref(), self.date_to.as_deref());
        if !self.weekdays.is_empty() {
            filter.set_weekdays(WeekdayMask::only(self.weekdays.iter().copied()));
        }
        if self.time_from.is_some() || self.time_to.is_some() {
            filter.set_time_window(TimeWindow::between(
                self.time_from.as_deref().unwrap_or("00:00"),
                self.time_to.as_deref().unwrap_or("23:59"),
            ));
        }
        filter
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/rail_punctuality.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rail_punctuality.log"));

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
        Commands::Report {
            source,
            filter,
            rank_by,
            hist_percent,
            capitals_only,
            output,
            gzip,
            leaderboards_csv,
        } => {
            let dataset = load(&source).await?;
            let filter = filter.to_filter();
            let options = ReportOptions {
                ranking: rank_by,
                histogram_mode: if hist_percent {
                    HistogramMode::Percent
                } else {
                    HistogramMode::Count
                },
                capitals_only,
            };

            let report = dataset.dashboard().report(&filter, options);
            print_pretty(&report);
            for warning in &report.warnings {
                warn!(warning = %warning, "Report warning");
            }
            for note in &report.filter_notes {
                info!(note = %note, "Filter note");
            }
            info!(
                observed = report.kpi.data.observed,
                late_ratio = report.kpi.data.late_ratio,
                missing_coordinates = report.map.data.missing_coordinates,
                "KPI summary"
            );

            write_report(&output, &report, gzip)?;
            if let Some(dir) = leaderboards_csv {
                write_leaderboards(&dir, &report)?;
            }
        }
        Commands::Options { source } => {
            let dataset = load(&source).await?;
            print_json(&dataset.options())?;
        }
        Commands::Stations { source, query } => {
            let dataset = load(&source).await?;
            let matches = dataset.resolver.search(&query);
            info!(query = %query, matches = matches.len(), "Station search");
            for station in &matches {
                info!(
                    label = %dataset.resolver.label(&station.code),
                    city = station.city.as_deref().unwrap_or("-"),
                    has_coords = station.coords.is_some(),
                    "Station"
                );
            }
        }
    }

    Ok(())
}

/// Loads the dataset from a local directory or over HTTP.
#[tracing::instrument]
async fn load(source: &str) -> Result<Dataset> {
    let client = BasicClient::new();
    load_dataset(&client, source).await
}
