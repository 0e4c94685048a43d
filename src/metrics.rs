use crate::types::{
    CaseCounts, CountrySeries, DailySeries, DataType, NormalizedSeries, RankedCountry, Rates,
    SeriesSnapshot,
};
use crate::util::{average, round2};
use indexmap::IndexMap;

const TREND_WINDOW: usize = 7;

/// Estimated active cases per country: `max(0, confirmed - deaths)`.
///
/// Only countries present in both inputs are kept, dates come from the
/// confirmed totals (a missing deaths date counts as zero), and `global` is
/// the sum of the already clamped country values.
pub fn estimate_active(confirmed: &NormalizedSeries, deaths: &NormalizedSeries) -> NormalizedSeries {
    let mut active = NormalizedSeries::empty(DataType::Active);

    for (name, confirmed_country) in &confirmed.countries {
        let Some(deaths_country) = deaths.countries.get(name) else {
            continue;
        };
        let mut total = DailySeries::new();
        for (date, confirmed_value) in &confirmed_country.total {
            let deaths_value = deaths_country.total.get(date).copied().unwrap_or(0);
            let value = (confirmed_value - deaths_value).max(0);
            total.insert(date.clone(), value);
            *active.global.entry(date.clone()).or_insert(0) += value;
        }
        active.countries.insert(
            name.clone(),
            CountrySeries {
                name: name.clone(),
                provinces: IndexMap::new(),
                total,
                coordinates: confirmed_country.coordinates,
            },
        );
    }
    active
}

pub fn calculate_rates(counts: CaseCounts) -> Rates {
    if counts.confirmed == 0 {
        return Rates::default();
    }
    let confirmed = counts.confirmed as f64;
    let pct = |part: i64| round2(part as f64 / confirmed * 100.0);
    Rates {
        mortality_rate: pct(counts.deaths),
        recovery_rate: pct(counts.recovered),
        active_rate: pct(counts.confirmed - counts.deaths - counts.recovered),
    }
}

/// Relative change of the last 7 days' mean against the 7 days before.
///
/// Returns a fraction (`0.25` is +25%). Fewer than 7 dates, or nothing
/// before the recent window, gives `0`. When the older mean is zero the
/// result is `1` if anything happened recently and `0` otherwise.
pub fn compute_trend(series: &DailySeries) -> f64 {
    let values: Vec<f64> = series.values().map(|v| *v as f64).collect();
    if values.len() < TREND_WINDOW {
        return 0.0;
    }
    let split = values.len() - TREND_WINDOW;
    let recent = &values[split..];
    let older = &values[split.saturating_sub(TREND_WINDOW)..split];
    if older.is_empty() {
        return 0.0;
    }

    let recent_avg = average(recent);
    let older_avg = average(older);
    if older_avg == 0.0 {
        return if recent_avg > 0.0 { 1.0 } else { 0.0 };
    }
    (recent_avg - older_avg) / older_avg
}

/// The `n` countries with the largest latest-date value, largest first.
///
/// Ties keep the map's iteration order.
pub fn top_n(countries: &IndexMap<String, CountrySeries>, n: usize) -> Vec<RankedCountry> {
    let mut ranked: Vec<RankedCountry> = countries
        .iter()
        .map(|(name, country)| RankedCountry {
            name: name.clone(),
            value: country.total.values().next_back().copied().unwrap_or(0),
        })
        .collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.value.cmp(&a.value));
    ranked.truncate(n);
    ranked
}

/// Latest value of a series and its change from the previous date.
pub fn latest_and_daily(series: &DailySeries) -> SeriesSnapshot {
    let mut tail = series.iter().rev();
    match (tail.next(), tail.next()) {
        (Some((date, last)), prev) => SeriesSnapshot {
            date: Some(date.clone()),
            current: *last,
            daily: last - prev.map(|(_, v)| *v).unwrap_or(0),
        },
        (None, _) => SeriesSnapshot {
            date: None,
            current: 0,
            daily: 0,
        },
    }
}

/// Entries whose ISO date lies within `[start, end]`.
///
/// With either bound missing the series is returned unchanged.
pub fn filter_date_range(series: &DailySeries, start: Option<&str>, end: Option<&str>) -> DailySeries {
    match (start, end) {
        (Some(start), Some(end)) => series
            .iter()
            .filter(|(date, _)| date.as_str() >= start && date.as_str() <= end)
            .map(|(date, v)| (date.clone(), *v))
            .collect(),
        _ => series.clone(),
    }
}
