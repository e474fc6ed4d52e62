//! Ingestion of the published dataset: manifest, fact tables and dimensions.
//!
//! Column names are matched case-insensitively against fixed synonym lists
//! once per file; every row is normalized into a [`FactRow`].

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::analytics::dashboard::Dashboard;
use crate::analytics::options::FilterOptions;
use crate::analytics::resolver::{EntityResolver, StationRecord};
use crate::analytics::types::{FactRow, FactTables, Granularity, LayeredTable, MetricField, Metrics};
use crate::config::DashboardConfig;
use crate::fetch::{HttpClient, read_source};
use crate::number::{coerce, parse_locale_number};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const STATIONS_FILE: &str = "stations_dim.csv";
pub const CAPITALS_FILE: &str = "capoluoghi_provincia.csv";

/// Daily and hourly tables tried in addition to the manifest's list.
pub const EXTRA_FILES: [&str; 5] = [
    "od_giorno_categoria.csv",
    "stazioni_giorno_categoria_nodo.csv",
    "hist_giorno_categoria.csv",
    "kpi_giorno_ora_categoria.csv",
    "hist_giorno_ora_categoria.csv",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Kpi,
    Routes,
    Stations,
    Histogram,
}

const FACT_FILES: [(&str, TableKind, Granularity); 10] = [
    ("kpi_mese_categoria", TableKind::Kpi, Granularity::Month),
    ("kpi_giorno_categoria", TableKind::Kpi, Granularity::Day),
    ("kpi_giorno_ora_categoria", TableKind::Kpi, Granularity::DayHour),
    ("od_mese_categoria", TableKind::Routes, Granularity::Month),
    ("od_giorno_categoria", TableKind::Routes, Granularity::Day),
    ("stazioni_mese_categoria_nodo", TableKind::Stations, Granularity::Month),
    ("stazioni_giorno_categoria_nodo", TableKind::Stations, Granularity::Day),
    ("hist_mese_categoria", TableKind::Histogram, Granularity::Month),
    ("hist_giorno_categoria", TableKind::Histogram, Granularity::Day),
    ("hist_giorno_ora_categoria", TableKind::Histogram, Granularity::DayHour),
];

/// Maps a fact file name, with or without `.csv`/`.gz`, to its table slot.
pub fn slot_for(file_name: &str) -> Option<(TableKind, Granularity)> {
    let stem = file_name.trim().trim_end_matches(".gz").trim_end_matches(".csv");
    let stem = stem.rsplit('/').next().unwrap_or(stem);
    FACT_FILES
        .iter()
        .find(|(name, _, _)| *name == stem)
        .map(|(_, kind, granularity)| (*kind, *granularity))
}

fn table_mut(tables: &mut FactTables, kind: TableKind) -> &mut LayeredTable {
    match kind {
        TableKind::Kpi => &mut tables.kpi,
        TableKind::Routes => &mut tables.routes,
        TableKind::Stations => &mut tables.stations,
        TableKind::Histogram => &mut tables.histogram,
    }
}

const MONTH_COLUMNS: &[&str] = &["mese", "month", "periodo", "period"];
const DAY_COLUMNS: &[&str] = &["giorno", "day", "data", "date"];
const HOUR_COLUMNS: &[&str] = &["ora", "hour"];
const CATEGORY_COLUMNS: &[&str] = &["categoria", "category"];
const ORIGIN_COLUMNS: &[&str] = &["cod_partenza", "origin_code", "origin"];
const DESTINATION_COLUMNS: &[&str] = &["cod_arrivo", "destination_code", "destination"];
const STATION_COLUMNS: &[&str] = &["cod_stazione", "cod_nodo", "station_code", "station"];
const BUCKET_COLUMNS: &[&str] = &["bucket_ritardo_arrivo", "delay_bucket", "bucket"];

const DIM_CODE: &[&str] = &["cod_stazione", "codice", "cod", "code", "station_code", "id_stazione", "id"];
const DIM_NAME: &[&str] = &["nome_stazione", "nome", "station_name", "name", "descrizione", "denominazione"];
const DIM_CITY: &[&str] = &["citta", "comune", "city", "nome_comune", "municipality", "town", "localita", "località"];
const DIM_LAT: &[&str] = &["lat", "latitude", "latitudine", "y"];
const DIM_LON: &[&str] = &["lon", "lng", "longitude", "longitudine", "x"];

/// Index of the first header matching any synonym, in synonym order.
fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    names
        .iter()
        .find_map(|name| normalized.iter().position(|h| h == name))
}

fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes)
}

/// Column positions of one fact file, resolved from its header.
struct FactColumns {
    period: Option<usize>,
    hour: Option<usize>,
    category: Option<usize>,
    origin: Option<usize>,
    destination: Option<usize>,
    station: Option<usize>,
    bucket: Option<usize>,
    metrics: Vec<(MetricField, usize)>,
}

impl FactColumns {
    fn resolve(headers: &StringRecord, granularity: Granularity) -> Self {
        let period = match granularity {
            Granularity::Month => find_column(headers, MONTH_COLUMNS),
            Granularity::Day | Granularity::DayHour => find_column(headers, DAY_COLUMNS),
        };
        let metrics = MetricField::ALL
            .iter()
            .filter_map(|f| find_column(headers, f.column_names()).map(|idx| (*f, idx)))
            .collect();
        FactColumns {
            period,
            hour: find_column(headers, HOUR_COLUMNS),
            category: find_column(headers, CATEGORY_COLUMNS),
            origin: find_column(headers, ORIGIN_COLUMNS),
            destination: find_column(headers, DESTINATION_COLUMNS),
            station: find_column(headers, STATION_COLUMNS),
            bucket: find_column(headers, BUCKET_COLUMNS),
            metrics,
        }
    }
}

/// An hour is kept only when it is a whole number in 0-23.
fn parse_hour(raw: &str) -> Option<u8> {
    let value = parse_locale_number(raw)?;
    (value.fract() == 0.0 && (0.0..=23.0).contains(&value)).then_some(value as u8)
}

/// Parses one fact table in CSV form.
///
/// Rows with no period value and records the reader rejects are skipped;
/// malformed metric values count as zero. A missing category becomes `all`.
pub fn parse_fact_table(bytes: &[u8], granularity: Granularity) -> Result<Vec<FactRow>> {
    let mut rdr = reader(bytes);
    let headers = rdr.headers().context("reading fact table header")?.clone();
    let cols = FactColumns::resolve(&headers, granularity);
    if cols.period.is_none() {
        warn!(?granularity, "Fact table has no period column");
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let Some(period) = field(&record, cols.period) else {
            skipped += 1;
            continue;
        };

        let mut metrics = Metrics::default();
        for (metric, idx) in &cols.metrics {
            metrics.set(*metric, record.get(*idx).map(coerce).unwrap_or(0.0));
        }

        rows.push(FactRow {
            period: period.to_string(),
            hour: field(&record, cols.hour).and_then(parse_hour),
            category: field(&record, cols.category).unwrap_or("all").to_string(),
            origin: field(&record, cols.origin).map(str::to_string),
            destination: field(&record, cols.destination).map(str::to_string),
            station: field(&record, cols.station).map(str::to_string),
            bucket: field(&record, cols.bucket).map(str::to_string),
            metrics,
        });
    }

    if skipped > 0 {
        debug!(skipped, kept = rows.len(), "Skipped fact rows");
    }
    Ok(rows)
}

/// Parses the station dimension. Rows without a code are skipped.
pub fn parse_stations(bytes: &[u8]) -> Result<Vec<StationRecord>> {
    let mut rdr = reader(bytes);
    let headers = rdr.headers().context("reading station header")?.clone();
    let code = find_column(&headers, DIM_CODE);
    if code.is_none() {
        anyhow::bail!("station dimension has no code column");
    }
    let name = find_column(&headers, DIM_NAME);
    let city = find_column(&headers, DIM_CITY);
    let lat = find_column(&headers, DIM_LAT);
    let lon = find_column(&headers, DIM_LON);

    let mut out = Vec::new();
    for record in rdr.records().flatten() {
        let Some(code) = field(&record, code) else {
            continue;
        };
        out.push(StationRecord {
            code: code.to_string(),
            name: field(&record, name).unwrap_or_default().to_string(),
            city: field(&record, city).unwrap_or_default().to_string(),
            lat: field(&record, lat).and_then(parse_locale_number),
            lon: field(&record, lon).and_then(parse_locale_number),
        });
    }
    Ok(out)
}

/// Parses the capital-city list: a city column, or the first column.
pub fn parse_capitals(bytes: &[u8]) -> Result<Vec<String>> {
    let mut rdr = reader(bytes);
    let headers = rdr.headers().context("reading capitals header")?.clone();
    let col = find_column(&headers, DIM_CITY).or(Some(0));
    Ok(rdr
        .records()
        .flatten()
        .filter_map(|r| field(&r, col).map(str::to_string))
        .collect())
}

/// Everything the dashboard needs, loaded and normalized.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub config: DashboardConfig,
    pub tables: FactTables,
    pub resolver: EntityResolver,
}

impl Dataset {
    pub fn dashboard(&self) -> Dashboard<'_> {
        Dashboard::new(&self.tables, &self.resolver, &self.config)
    }

    pub fn options(&self) -> FilterOptions {
        FilterOptions::from_tables(&self.tables, &self.resolver)
    }
}

/// Reads `name`, falling back to a gzip-compressed `name.gz`.
async fn read_table<C: HttpClient>(client: &C, source: &str, name: &str) -> Result<Vec<u8>> {
    match read_source(client, source, name).await {
        Ok(bytes) => Ok(bytes),
        Err(plain) if !name.ends_with(".gz") => read_source(client, source, &format!("{name}.gz"))
            .await
            .map_err(|_| plain),
        Err(e) => Err(e),
    }
}

/// Loads a dataset from a local directory or an `http(s)` base URL.
///
/// Only the station dimension is required. A missing or invalid manifest
/// falls back to the built-in defaults, and fact tables that cannot be read
/// are left empty.
#[tracing::instrument(skip(client))]
pub async fn load_dataset<C: HttpClient>(client: &C, source: &str) -> Result<Dataset> {
    let config = match read_source(client, source, MANIFEST_FILE).await {
        Ok(bytes) => DashboardConfig::from_json(&bytes).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid manifest, using defaults");
            DashboardConfig::default()
        }),
        Err(e) => {
            debug!(error = %e, "No manifest, using defaults");
            DashboardConfig::default()
        }
    };

    let mut files: Vec<(String, bool)> = config.gold_files.iter().map(|f| (f.clone(), true)).collect();
    for extra in EXTRA_FILES {
        if !files.iter().any(|(f, _)| f == extra) {
            files.push((extra.to_string(), false));
        }
    }

    let mut tables = FactTables::default();
    for (name, listed) in &files {
        let Some((kind, granularity)) = slot_for(name) else {
            warn!(file = %name, "Unrecognized fact file, skipped");
            continue;
        };
        let parsed = match read_table(client, source, name).await {
            Ok(bytes) => parse_fact_table(&bytes, granularity),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(rows) => {
                debug!(file = %name, rows = rows.len(), "Fact table loaded");
                table_mut(&mut tables, kind).rows_mut(granularity).extend(rows);
            }
            Err(e) if *listed => warn!(file = %name, error = %e, "Fact table unavailable"),
            Err(e) => debug!(file = %name, error = %e, "Optional fact table unavailable"),
        }
    }

    let stations = read_table(client, source, STATIONS_FILE)
        .await
        .context("station dimension is required")?;
    let stations = parse_stations(&stations)?;

    let capitals = match read_table(client, source, CAPITALS_FILE).await {
        Ok(bytes) => parse_capitals(&bytes).unwrap_or_default(),
        Err(e) => {
            debug!(error = %e, "No capital-city list");
            Vec::new()
        }
    };

    let resolver = EntityResolver::new(stations, capitals);
    info!(
        stations = resolver.len(),
        kpi_months = tables.kpi.month.len(),
        empty = tables.is_empty(),
        "Dataset loaded"
    );

    Ok(Dataset {
        config,
        tables,
        resolver,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_for_known_files() {
        assert_eq!(
            slot_for("kpi_giorno_ora_categoria.csv"),
            Some((TableKind::Kpi, Granularity::DayHour))
        );
        assert_eq!(
            slot_for("od_mese_categoria.csv.gz"),
            Some((TableKind::Routes, Granularity::Month))
        );
        assert_eq!(slot_for("notes.csv"), None);
    }

    #[test]
    fn test_parse_fact_table_synonyms_and_coercion() {
        let csv = "\u{feff}Mese,Categoria,cod_partenza,cod_arrivo,corse_osservate,in_ritardo,minuti_ritardo_tot\n\
                   2024-01,REG,S1,S2,\"1.234\",12,\"3,5\"\n\
                   2024-01,,S1,S3,10,abc,0\n\
                   ,REG,S1,S2,5,5,5\n";
        let rows = parse_fact_table(csv.as_bytes(), Granularity::Month).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].origin.as_deref(), Some("S1"));
        assert_eq!(rows[0].metrics.observed, 1234.0);
        assert_eq!(rows[0].metrics.late_minutes, 3.5);
        assert_eq!(rows[1].category, "all");
        assert_eq!(rows[1].metrics.late, 0.0);
    }

    #[test]
    fn test_parse_fact_table_hours() {
        let csv = "giorno,ora,categoria,corse_osservate,in_ritardo\n\
                   2024-01-08,7,REG,10,1\n\
                   2024-01-08,24,REG,10,1\n";
        let rows = parse_fact_table(csv.as_bytes(), Granularity::DayHour).unwrap();
        assert_eq!(rows[0].hour, Some(7));
        assert_eq!(rows[1].hour, None);
    }

    #[test]
    fn test_parse_fact_table_without_period_is_empty() {
        let rows = parse_fact_table(b"categoria,count\nREG,3\n", Granularity::Month).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_stations_synonyms() {
        let csv = "codice,nome,comune,latitudine,longitudine\n\
                   S1,Roma Termini,Roma,\"41,9\",12.5\n\
                   ,Nowhere,X,1,1\n\
                   S2,Milano,Milano,,\n";
        let stations = parse_stations(csv.as_bytes()).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].city, "Roma");
        assert_eq!(stations[0].lat, Some(41.9));
        assert_eq!(stations[1].lat, None);
    }

    #[test]
    fn test_parse_stations_requires_code_column() {
        assert!(parse_stations(b"nome,citta\nRoma,Roma\n").is_err());
    }

    #[test]
    fn test_parse_capitals_first_column_fallback() {
        let caps = parse_capitals("provincia\nRoma\nMilano\n".as_bytes()).unwrap();
        assert_eq!(caps, ["Roma", "Milano"]);
        let caps = parse_capitals("sigla,citta\nRM,Roma\n".as_bytes()).unwrap();
        assert_eq!(caps, ["Roma"]);
    }
}
