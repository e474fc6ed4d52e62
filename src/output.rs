//! Output formatting and persistence for dashboard reports.
//!
//! Supports pretty-printing, JSON files (optionally gzipped) and CSV export.

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::analytics::kpi::Totals;
use crate::analytics::leaderboard::{CityEntry, RouteEntry, StationEntry};
use crate::analytics::report::DashboardReport;

/// Flat CSV row: the entity key columns followed by its totals.
#[derive(Debug, Serialize)]
struct LeaderboardRow<'a> {
    rank: usize,
    key: &'a str,
    name: &'a str,
    counterpart: &'a str,
    counterpart_name: &'a str,
    city: &'a str,
    observed: f64,
    late: f64,
    late_minutes: f64,
    cancelled: f64,
    suppressed: f64,
    late_ratio: f64,
}

impl<'a> LeaderboardRow<'a> {
    fn new(rank: usize, key: &'a str, totals: &Totals) -> Self {
        LeaderboardRow {
            rank,
            key,
            name: "",
            counterpart: "",
            counterpart_name: "",
            city: "",
            observed: totals.observed,
            late: totals.late,
            late_minutes: totals.late_minutes,
            cancelled: totals.cancelled,
            suppressed: totals.suppressed,
            late_ratio: totals.late_ratio,
        }
    }
}

impl<'a> From<&'a StationEntry> for LeaderboardRow<'a> {
    fn from(e: &'a StationEntry) -> Self {
        LeaderboardRow {
            name: &e.name,
            city: e.city.as_deref().unwrap_or_default(),
            ..LeaderboardRow::new(e.rank, &e.code, &e.totals)
        }
    }
}

impl<'a> From<&'a RouteEntry> for LeaderboardRow<'a> {
    fn from(e: &'a RouteEntry) -> Self {
        LeaderboardRow {
            name: &e.origin_name,
            counterpart: &e.destination_code,
            counterpart_name: &e.destination_name,
            ..LeaderboardRow::new(e.rank, &e.origin_code, &e.totals)
        }
    }
}

impl<'a> From<&'a CityEntry> for LeaderboardRow<'a> {
    fn from(e: &'a CityEntry) -> Self {
        LeaderboardRow {
            city: &e.city,
            ..LeaderboardRow::new(e.rank, &e.city, &e.totals)
        }
    }
}

fn rows<'a, T: 'a>(entries: &'a [T]) -> Vec<LeaderboardRow<'a>>
where
    LeaderboardRow<'a>: From<&'a T>,
{
    entries.iter().map(LeaderboardRow::from).collect()
}

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty(report: &DashboardReport) {
    debug!("{:#?}", report);
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes the report as pretty JSON, gzip-compressed when `gzip` is set.
#[tracing::instrument(skip(report))]
pub fn write_report(path: &str, report: &DashboardReport, gzip: bool) -> Result<()> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = BufWriter::new(File::create(path)?);

    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        serde_json::to_writer_pretty(&mut encoder, report)?;
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        serde_json::to_writer_pretty(&mut file, report)?;
        file.flush()?;
    }

    info!(path, gzip, "Report written");
    Ok(())
}

/// Writes records to a new CSV file with a header row.
///
/// Records must be flat structs; an empty slice still creates the file.
pub fn write_csv<T: Serialize>(path: &str, records: &[T]) -> Result<()> {
    debug!(path, rows = records.len(), "Writing CSV");
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Exports the station, route and city leaderboards into `dir`.
pub fn write_leaderboards(dir: &str, report: &DashboardReport) -> Result<()> {
    fs::create_dir_all(dir)?;
    let dir = Path::new(dir);
    let path = |name: &str| dir.join(name).to_string_lossy().into_owned();

    write_csv(&path("stations.csv"), &rows(&report.stations.data))?;
    write_csv(&path("routes.csv"), &rows(&report.routes.data))?;
    write_csv(&path("cities.csv"), &rows(&report.cities.data.entries))?;

    info!(dir = %dir.display(), "Leaderboards exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dashboard::Dashboard;
    use crate::analytics::filter::FilterState;
    use crate::analytics::report::ReportOptions;
    use crate::analytics::resolver::EntityResolver;
    use crate::analytics::types::{FactRow, FactTables};
    use crate::config::DashboardConfig;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn report() -> DashboardReport {
        let mut t = FactTables::default();
        t.kpi.month.push(FactRow::new("2024-01", "REG").with_trips(40.0, 10.0));
        t.stations.month.push(FactRow::new("2024-01", "REG").with_station("S1").with_trips(40.0, 10.0));
        t.stations.month.push(FactRow::new("2024-01", "REG").with_station("S2").with_trips(30.0, 3.0));
        let r = EntityResolver::default();
        let c = DashboardConfig::default();
        Dashboard::new(&t, &r, &c).report(&FilterState::new(), ReportOptions::default())
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&report());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&report()).unwrap();
    }

    #[test]
    fn test_write_report_plain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json").to_string_lossy().into_owned();
        write_report(&path, &report(), false).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["kpi"]["data"]["observed"], 40.0);
        assert_eq!(value["filter"]["year"], "all");
    }

    #[test]
    fn test_write_report_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json.gz").to_string_lossy().into_owned();
        write_report(&path, &report(), true).unwrap();

        let mut text = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.contains("\"late_ratio\""));
    }

    #[test]
    fn test_write_leaderboards_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_string_lossy().into_owned();
        write_leaderboards(&out, &report()).unwrap();

        let content = fs::read_to_string(dir.path().join("stations.csv")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        // 1 header + 2 stations
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rank,key,name,counterpart"));
        assert!(lines[1].starts_with("1,S1,S1,,,,40"));
        assert!(dir.path().join("routes.csv").exists());
    }
}
