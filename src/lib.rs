//! COVID-19 time-series pipeline: CSV ingestion, per-country/global
//! aggregation, derived metrics and a TTL cache over the combined result.

pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod reports;
pub mod service;
pub mod state;
pub mod transform;
pub mod types;
pub mod util;

pub use cache::{Clock, DataCache, ManualClock, SystemClock};
pub use config::AppConfig;
pub use errors::DataError;
pub use fetch::{Fetcher, HttpFetcher};
pub use service::CovidDataService;
pub use types::{CombinedData, DataType, NormalizedSeries, RawRow};
