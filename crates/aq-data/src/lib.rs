//! Air Quality Dataset
//!
//! In-memory query layer over the flat air quality dataset:
//!
//! - [`store`]: loads the backing CSV once, normalizes every timestamp to
//!   Asia/Manila and memoizes the result for the process lifetime.
//! - [`aggregate`]: per-city (plus `"all"`) summary statistics, computed
//!   lazily and memoized.
//! - [`query`]: parameterized historical queries, daily rollups and the
//!   spatial heatmap rollup.
//!
//! Everything here is read-only after its one-time initialization, so
//! concurrent access needs no locking. Invalidation is process restart.

pub mod aggregate;
pub mod observation;
pub mod query;
pub mod store;

pub use aggregate::{AggregateCache, Aggregates, CitySummary, Trend};
pub use observation::{parse_timestamp, Observation, TimestampError, POLLUTANT_NAMES, TIMEZONE};
pub use query::{DailyRollup, DailySlice, HeatmapCell, HistoricalFilter, HistoricalSlice};
pub use store::{Dataset, DatasetStore, StoreError};
