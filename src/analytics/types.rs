//! Data types used by the filter and aggregation engine.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::AddAssign;

/// Time resolution of a fact table, ordered coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Month,
    Day,
    DayHour,
}

impl Granularity {
    /// Length of the period key at this granularity (`YYYY-MM` or `YYYY-MM-DD`).
    pub fn period_len(self) -> usize {
        match self {
            Granularity::Month => 7,
            Granularity::Day | Granularity::DayHour => 10,
        }
    }
}

/// Output features that pick their granularity independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Kpi,
    Series,
    Histogram,
    Stations,
    Routes,
}

/// Every additive count field a fact row can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    Observed,
    Completed,
    Cancelled,
    Suppressed,
    PartiallyCancelled,
    MissingInfo,
    OnTime,
    Late,
    Early,
    Over5,
    Over10,
    Over15,
    Over30,
    Over60,
    LateMinutes,
    EarlyMinutes,
    NetMinutes,
    Count,
}

impl MetricField {
    pub const ALL: [MetricField; 18] = [
        MetricField::Observed,
        MetricField::Completed,
        MetricField::Cancelled,
        MetricField::Suppressed,
        MetricField::PartiallyCancelled,
        MetricField::MissingInfo,
        MetricField::OnTime,
        MetricField::Late,
        MetricField::Early,
        MetricField::Over5,
        MetricField::Over10,
        MetricField::Over15,
        MetricField::Over30,
        MetricField::Over60,
        MetricField::LateMinutes,
        MetricField::EarlyMinutes,
        MetricField::NetMinutes,
        MetricField::Count,
    ];

    /// Accepted column names, in lookup order.
    pub fn column_names(self) -> &'static [&'static str] {
        match self {
            MetricField::Observed => &["corse_osservate", "observed_trips", "observed"],
            MetricField::Completed => &["effettuate", "completed"],
            MetricField::Cancelled => &["cancellate", "cancelled"],
            MetricField::Suppressed => &["soppresse", "suppressed"],
            MetricField::PartiallyCancelled => {
                &["parzialmente_cancellate", "partially_cancelled"]
            }
            MetricField::MissingInfo => &["info_mancante", "missing_info"],
            MetricField::OnTime => &["in_orario", "on_time"],
            MetricField::Late => &["in_ritardo", "late"],
            MetricField::Early => &["in_anticipo", "early"],
            MetricField::Over5 => &["oltre_5", "late_over_5"],
            MetricField::Over10 => &["oltre_10", "late_over_10"],
            MetricField::Over15 => &["oltre_15", "late_over_15"],
            MetricField::Over30 => &["oltre_30", "late_over_30"],
            MetricField::Over60 => &["oltre_60", "late_over_60"],
            MetricField::LateMinutes => &["minuti_ritardo_tot", "late_minutes"],
            MetricField::EarlyMinutes => &["minuti_anticipo_tot", "early_minutes"],
            MetricField::NetMinutes => &["minuti_netti_tot", "net_minutes"],
            MetricField::Count => &["count", "conteggio"],
        }
    }
}

/// Summed count fields of one or more fact rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub observed: f64,
    pub completed: f64,
    pub cancelled: f64,
    pub suppressed: f64,
    pub partially_cancelled: f64,
    pub missing_info: f64,
    pub on_time: f64,
    pub late: f64,
    pub early: f64,
    pub over_5: f64,
    pub over_10: f64,
    pub over_15: f64,
    pub over_30: f64,
    pub over_60: f64,
    pub late_minutes: f64,
    pub early_minutes: f64,
    pub net_minutes: f64,
    /// Frequency column of histogram tables.
    pub count: f64,
}

impl Metrics {
    pub fn get(&self, field: MetricField) -> f64 {
        *self.slot(field)
    }

    pub fn set(&mut self, field: MetricField, value: f64) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: MetricField) -> &f64 {
        match field {
            MetricField::Observed => &self.observed,
            MetricField::Completed => &self.completed,
            MetricField::Cancelled => &self.cancelled,
            MetricField::Suppressed => &self.suppressed,
            MetricField::PartiallyCancelled => &self.partially_cancelled,
            MetricField::MissingInfo => &self.missing_info,
            MetricField::OnTime => &self.on_time,
            MetricField::Late => &self.late,
            MetricField::Early => &self.early,
            MetricField::Over5 => &self.over_5,
            MetricField::Over10 => &self.over_10,
            MetricField::Over15 => &self.over_15,
            MetricField::Over30 => &self.over_30,
            MetricField::Over60 => &self.over_60,
            MetricField::LateMinutes => &self.late_minutes,
            MetricField::EarlyMinutes => &self.early_minutes,
            MetricField::NetMinutes => &self.net_minutes,
            MetricField::Count => &self.count,
        }
    }

    fn slot_mut(&mut self, field: MetricField) -> &mut f64 {
        match field {
            MetricField::Observed => &mut self.observed,
            MetricField::Completed => &mut self.completed,
            MetricField::Cancelled => &mut self.cancelled,
            MetricField::Suppressed => &mut self.suppressed,
            MetricField::PartiallyCancelled => &mut self.partially_cancelled,
            MetricField::MissingInfo => &mut self.missing_info,
            MetricField::OnTime => &mut self.on_time,
            MetricField::Late => &mut self.late,
            MetricField::Early => &mut self.early,
            MetricField::Over5 => &mut self.over_5,
            MetricField::Over10 => &mut self.over_10,
            MetricField::Over15 => &mut self.over_15,
            MetricField::Over30 => &mut self.over_30,
            MetricField::Over60 => &mut self.over_60,
            MetricField::LateMinutes => &mut self.late_minutes,
            MetricField::EarlyMinutes => &mut self.early_minutes,
            MetricField::NetMinutes => &mut self.net_minutes,
            MetricField::Count => &mut self.count,
        }
    }
}

impl AddAssign<&Metrics> for Metrics {
    fn add_assign(&mut self, other: &Metrics) {
        for field in MetricField::ALL {
            *self.slot_mut(field) += other.get(field);
        }
    }
}

/// One pre-aggregated fact row, normalized at ingestion.
///
/// `period` is `YYYY-MM` for monthly tables and `YYYY-MM-DD` for daily and
/// hourly tables. Dimension keys are `None` when the table does not carry them.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub period: String,
    pub hour: Option<u8>,
    pub category: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub station: Option<String>,
    pub bucket: Option<String>,
    pub metrics: Metrics,
}

impl FactRow {
    pub fn new(period: &str, category: &str) -> Self {
        FactRow {
            period: period.to_string(),
            hour: None,
            category: category.to_string(),
            origin: None,
            destination: None,
            station: None,
            bucket: None,
            metrics: Metrics::default(),
        }
    }

    pub fn with_route(mut self, origin: &str, destination: &str) -> Self {
        self.origin = Some(origin.to_string());
        self.destination = Some(destination.to_string());
        self
    }

    pub fn with_station(mut self, code: &str) -> Self {
        self.station = Some(code.to_string());
        self
    }

    pub fn with_hour(mut self, hour: u8) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn with_bucket(mut self, label: &str, count: f64) -> Self {
        self.bucket = Some(label.to_string());
        self.metrics.count = count;
        self
    }

    pub fn with_trips(mut self, observed: f64, late: f64) -> Self {
        self.metrics.observed = observed;
        self.metrics.late = late;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// The `YYYY-MM-DD` day of the row, if its period carries one.
    pub fn day(&self) -> Option<&str> {
        self.period.get(..10)
    }

    /// The `YYYY-MM` month of the row.
    pub fn month(&self) -> &str {
        self.period.get(..7).unwrap_or(&self.period)
    }
}

/// The same fact table at up to three granularities.
#[derive(Debug, Clone, Default)]
pub struct LayeredTable {
    pub month: Vec<FactRow>,
    pub day: Vec<FactRow>,
    pub day_hour: Vec<FactRow>,
}

impl LayeredTable {
    pub fn rows(&self, granularity: Granularity) -> &[FactRow] {
        match granularity {
            Granularity::Month => &self.month,
            Granularity::Day => &self.day,
            Granularity::DayHour => &self.day_hour,
        }
    }

    pub fn rows_mut(&mut self, granularity: Granularity) -> &mut Vec<FactRow> {
        match granularity {
            Granularity::Month => &mut self.month,
            Granularity::Day => &mut self.day,
            Granularity::DayHour => &mut self.day_hour,
        }
    }

    pub fn has(&self, granularity: Granularity) -> bool {
        !self.rows(granularity).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.month.is_empty() && self.day.is_empty() && self.day_hour.is_empty()
    }
}

/// All fact tables the dashboard reads from.
#[derive(Debug, Clone, Default)]
pub struct FactTables {
    pub kpi: LayeredTable,
    pub routes: LayeredTable,
    pub stations: LayeredTable,
    pub histogram: LayeredTable,
}

impl FactTables {
    pub fn is_empty(&self) -> bool {
        self.kpi.is_empty()
            && self.routes.is_empty()
            && self.stations.is_empty()
            && self.histogram.is_empty()
    }
}

/// Why a view's result is empty, partial, or approximated.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewNote {
    /// The filter needs a granularity no loaded table provides.
    Unsatisfiable(String),
    /// The view has no data source under the active filter.
    Unavailable(String),
    /// The day range was applied at month precision.
    MonthApproximation,
    /// No hourly table was available, so the time window was not applied.
    TimeWindowIgnored,
}

impl ViewNote {
    pub fn kind(&self) -> &'static str {
        match self {
            ViewNote::Unsatisfiable(_) => "unsatisfiable",
            ViewNote::Unavailable(_) => "unavailable",
            ViewNote::MonthApproximation => "month_approximation",
            ViewNote::TimeWindowIgnored => "time_window_ignored",
        }
    }
}

impl fmt::Display for ViewNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewNote::Unsatisfiable(reason) => {
                write!(f, "filter unsatisfiable at available granularity: {reason}")
            }
            ViewNote::Unavailable(reason) => write!(f, "data unavailable: {reason}"),
            ViewNote::MonthApproximation => {
                write!(f, "day range applied to whole months (no daily data)")
            }
            ViewNote::TimeWindowIgnored => {
                write!(f, "time window not applied (no hourly data for this view)")
            }
        }
    }
}

impl Serialize for ViewNote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ViewNote", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

/// A view payload plus the notes explaining how it was derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View<T> {
    pub data: T,
    pub notes: Vec<ViewNote>,
}

impl<T> View<T> {
    pub fn new(data: T, notes: Vec<ViewNote>) -> Self {
        View { data, notes }
    }

    /// True when the filter could not be honoured at all for this view.
    pub fn is_unavailable(&self) -> bool {
        self.notes.iter().any(|n| {
            matches!(n, ViewNote::Unsatisfiable(_) | ViewNote::Unavailable(_))
        })
    }
}
