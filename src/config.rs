use std::env;

use tracing::warn;

/// JHU CSSE global confirmed-cases time series.
pub const DEFAULT_CONFIRMED_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_global.csv";
/// JHU CSSE global deaths time series.
pub const DEFAULT_DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_global.csv";
/// disease.sh aggregator root.
pub const DEFAULT_API_BASE_URL: &str = "https://disease.sh/v3/covid-19";

/// Runtime knobs for the data pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// CSV source for cumulative confirmed cases.
    pub confirmed_url: String,
    /// CSV source for cumulative deaths.
    pub deaths_url: String,
    /// Base URL of the REST aggregator used by the `api` adapter.
    pub api_base_url: String,
    /// How long a combined fetch stays valid in the cache.
    pub cache_ttl_ms: i64,
    /// Data older than this many days is flagged as stale.
    pub stale_after_days: i64,
    /// Default size of top-N rankings.
    pub top_n: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            confirmed_url: DEFAULT_CONFIRMED_URL.to_string(),
            deaths_url: DEFAULT_DEATHS_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_ttl_ms: 60 * 60 * 1000,
            stale_after_days: 180,
            top_n: 10,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `COVID_*` environment variables.
    ///
    /// Empty values are ignored; numeric values that fail to parse keep the
    /// default and log a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("COVID_CONFIRMED_URL") {
            config.confirmed_url = url.trim().to_string();
        }
        if let Some(url) = get("COVID_DEATHS_URL") {
            config.deaths_url = url.trim().to_string();
        }
        if let Some(url) = get("COVID_API_BASE_URL") {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("COVID_CACHE_TTL_MS") {
            match raw.trim().parse::<i64>() {
                Ok(v) if v >= 0 => config.cache_ttl_ms = v,
                _ => warn!("ignoring invalid COVID_CACHE_TTL_MS value '{}'", raw),
            }
        }
        if let Some(raw) = get("COVID_STALE_AFTER_DAYS") {
            match raw.trim().parse::<i64>() {
                Ok(v) if v >= 0 => config.stale_after_days = v,
                _ => warn!("ignoring invalid COVID_STALE_AFTER_DAYS value '{}'", raw),
            }
        }
        if let Some(raw) = get("COVID_TOP_N") {
            match raw.trim().parse::<usize>() {
                Ok(v) if v > 0 => config.top_n = v,
                _ => warn!("ignoring invalid COVID_TOP_N value '{}'", raw),
            }
        }
        config
    }
}
