//! Multi-granularity filter-and-aggregation engine.
//!
//! Tables are loaded once into [`FactTables`]; a [`Dashboard`] borrows them
//! together with the station [`EntityResolver`] and the [`DashboardConfig`]
//! and recomputes each view from scratch for the given [`FilterState`].
//!
//! [`DashboardConfig`]: crate::config::DashboardConfig

pub mod aggregate;
pub mod dashboard;
pub mod filter;
pub mod granularity;
pub mod histogram;
pub mod kpi;
pub mod leaderboard;
pub mod map;
pub mod options;
pub mod report;
pub mod resolver;
pub mod series;
pub mod types;

pub use dashboard::Dashboard;
pub use filter::{FilterState, TimeWindow, WeekdayMask};
pub use histogram::HistogramMode;
pub use leaderboard::RankingMetric;
pub use options::FilterOptions;
pub use report::{DashboardReport, ReportOptions};
pub use resolver::EntityResolver;
pub use types::{FactRow, FactTables, Granularity, View, ViewNote};
