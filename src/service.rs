use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{Clock, DataCache};
use crate::config::AppConfig;
use crate::errors::DataError;
use crate::fetch::Fetcher;
use crate::loader;
use crate::metrics::estimate_active;
use crate::transform::transform;
use crate::types::{
    CaseTriple, CombinedData, CountryData, DataFreshness, DataType, GlobalData, GlobalStats,
    Metadata, NormalizedSeries,
};
use crate::util::parse_iso_date;

pub const DATA_SOURCE: &str = "Johns Hopkins University CSSE";

/// Fetches, builds and memoizes the combined confirmed/deaths/active data.
pub struct CovidDataService<F: Fetcher, C: Clock> {
    fetcher: F,
    cache: DataCache<C>,
    config: AppConfig,
}

impl<F: Fetcher, C: Clock> CovidDataService<F, C> {
    pub fn new(fetcher: F, clock: C, config: AppConfig) -> Self {
        let cache = DataCache::new(clock, config.cache_ttl_ms);
        Self {
            fetcher,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &DataCache<C> {
        &self.cache
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The combined data, from cache while fresh, otherwise rebuilt.
    ///
    /// Both CSV sources are fetched in parallel; if either fails the error is
    /// returned and whatever was cached before stays in place.
    pub fn get_all_data(&self) -> Result<Arc<CombinedData>, DataError> {
        if let Some(cached) = self.cache.get() {
            info!("[covid:cache] using cached data");
            return Ok(cached);
        }

        info!("[covid:cache] fetching fresh data");
        let (confirmed_csv, deaths_csv) = rayon::join(
            || self.fetcher.fetch_text(&self.config.confirmed_url),
            || self.fetcher.fetch_text(&self.config.deaths_url),
        );
        let (confirmed_csv, deaths_csv) = (confirmed_csv?, deaths_csv?);

        let confirmed = build_series(&confirmed_csv, DataType::Confirmed);
        let deaths = build_series(&deaths_csv, DataType::Deaths);
        let active = estimate_active(&confirmed, &deaths);

        let combined = CombinedData {
            confirmed,
            deaths,
            active,
            metadata: self.metadata(),
        };
        Ok(self.cache.insert(combined))
    }

    /// Drop the cached entry; the next read refetches.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn get_country_data(&self, name: &str) -> Result<CountryData, DataError> {
        let all = self.get_all_data()?;
        let pick = |series: &NormalizedSeries| series.countries.get(name).cloned();
        let data = CountryData {
            confirmed: pick(&all.confirmed),
            deaths: pick(&all.deaths),
            active: pick(&all.active),
        };
        if data.confirmed.is_none() && data.deaths.is_none() && data.active.is_none() {
            return Err(DataError::NotFound(format!("country '{}'", name)));
        }
        Ok(data)
    }

    pub fn get_global_data(&self) -> Result<GlobalData, DataError> {
        let all = self.get_all_data()?;
        Ok(GlobalData {
            confirmed: all.confirmed.global.clone(),
            deaths: all.deaths.global.clone(),
            active: all.active.global.clone(),
            metadata: all.metadata.clone(),
        })
    }

    pub fn get_available_countries(&self) -> Result<Vec<String>, DataError> {
        let all = self.get_all_data()?;
        Ok(all.confirmed.countries.keys().cloned().collect())
    }

    /// Latest global values (dated by the confirmed series) and the change
    /// since the previous date. Deltas are not clamped.
    pub fn get_global_stats(&self) -> Result<GlobalStats, DataError> {
        let all = self.get_all_data()?;
        Ok(global_stats(&all))
    }

    pub fn get_data_freshness(&self) -> Result<DataFreshness, DataError> {
        let all = self.get_all_data()?;
        let freshness = data_freshness(
            &all,
            self.cache.clock().now().date_naive(),
            self.config.stale_after_days,
        );
        if freshness.is_stale {
            warn!(
                "[covid:freshness] data is {} days old",
                freshness.days_since_last_update.unwrap_or_default()
            );
        }
        Ok(freshness)
    }

    fn metadata(&self) -> Metadata {
        let notes = BTreeMap::from([
            (
                "recovered".to_string(),
                "Recovered-case reporting was discontinued on 2021-08-05".to_string(),
            ),
            (
                "active".to_string(),
                "Estimated active cases = confirmed cases - deaths".to_string(),
            ),
            (
                "dataEnd".to_string(),
                "Data collection stopped on 2023-03-10".to_string(),
            ),
        ]);
        Metadata {
            last_updated: self.cache.clock().now(),
            source: DATA_SOURCE.to_string(),
            data_types: DataType::ALL.to_vec(),
            notes,
        }
    }
}

fn build_series(csv_text: &str, data_type: DataType) -> NormalizedSeries {
    let (rows, report) = loader::parse_with_report(csv_text);
    info!(
        "[covid:load] {}: {} rows parsed, {} skipped",
        data_type, report.parsed_rows, report.skipped_rows
    );
    transform(&rows, data_type)
}

/// Latest and previous date are taken from the confirmed global series and
/// applied to all three types.
pub fn global_stats(all: &CombinedData) -> GlobalStats {
    let mut dates = all.confirmed.global.keys().rev();
    let last = dates.next().cloned();
    let prev = dates.next().cloned();

    let value_at = |series: &NormalizedSeries, date: &Option<String>| {
        date.as_ref()
            .and_then(|d| series.global.get(d))
            .copied()
            .unwrap_or(0)
    };
    let triple_at = |date: &Option<String>| CaseTriple {
        confirmed: value_at(&all.confirmed, date),
        deaths: value_at(&all.deaths, date),
        active: value_at(&all.active, date),
    };

    let current = triple_at(&last);
    let previous = triple_at(&prev);
    GlobalStats {
        last_update: last,
        current,
        daily: CaseTriple {
            confirmed: current.confirmed - previous.confirmed,
            deaths: current.deaths - previous.deaths,
            active: current.active - previous.active,
        },
    }
}

/// Whole days between the last confirmed global date and `today`.
///
/// An empty series is reported as not stale with no dates.
pub fn data_freshness(
    all: &CombinedData,
    today: chrono::NaiveDate,
    stale_after_days: i64,
) -> DataFreshness {
    let last = all
        .confirmed
        .global
        .keys()
        .next_back()
        .and_then(|d| parse_iso_date(d).map(|parsed| (d.clone(), parsed)));
    let Some((last_date, parsed)) = last else {
        return DataFreshness {
            last_data_date: None,
            days_since_last_update: None,
            is_stale: false,
            warning: None,
        };
    };

    let days = (today - parsed).num_days();
    let is_stale = days > stale_after_days;
    let warning = is_stale.then(|| {
        format!(
            "Warning: this data has not been updated since {}",
            parsed.format("%B %Y")
        )
    });
    DataFreshness {
        last_data_date: Some(last_date),
        days_since_last_update: Some(days),
        is_stale,
        warning,
    }
}
