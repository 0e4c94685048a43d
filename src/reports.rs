use crate::metrics::{calculate_rates, compute_trend, latest_and_daily, top_n};
use crate::types::{
    CaseCounts, CombinedData, CountryTrendRow, DataFreshness, DataType, GlobalStats,
    NormalizedSeries, SummaryStats, TopCountryRow,
};
use crate::util::{format_delta, format_int, format_number};

fn latest_total(series: &NormalizedSeries, country: &str) -> i64 {
    series
        .countries
        .get(country)
        .and_then(|c| c.total.values().next_back().copied())
        .unwrap_or(0)
}

/// Top `n` countries for `data_type`, with all three latest counts.
pub fn generate_top_countries(data: &CombinedData, data_type: DataType, n: usize) -> Vec<TopCountryRow> {
    top_n(&data.series(data_type).countries, n)
        .into_iter()
        .enumerate()
        .map(|(idx, ranked)| {
            let confirmed = latest_total(&data.confirmed, &ranked.name);
            let deaths = latest_total(&data.deaths, &ranked.name);
            let active = latest_total(&data.active, &ranked.name);
            let rates = calculate_rates(CaseCounts {
                confirmed,
                deaths,
                recovered: 0,
            });
            TopCountryRow {
                rank: idx + 1,
                country: ranked.name,
                confirmed: format_int(confirmed),
                deaths: format_int(deaths),
                active: format_int(active),
                mortality_rate: format!("{}%", format_number(rates.mortality_rate, 2)),
            }
        })
        .collect()
}

/// Latest value, daily change and 7-day trend for the top `n` countries.
pub fn generate_country_trends(data: &CombinedData, data_type: DataType, n: usize) -> Vec<CountryTrendRow> {
    let series = data.series(data_type);
    top_n(&series.countries, n)
        .into_iter()
        .filter_map(|ranked| {
            let country = series.countries.get(&ranked.name)?;
            let snapshot = latest_and_daily(&country.total);
            let trend = compute_trend(&country.total) * 100.0;
            Some(CountryTrendRow {
                country: ranked.name,
                last_date: snapshot.date.unwrap_or_else(|| "-".to_string()),
                current: format_int(snapshot.current),
                daily_change: format_delta(snapshot.daily),
                trend_7d: format!("{}%", format_number(trend, 2)),
            })
        })
        .collect()
}

pub fn generate_summary(
    data: &CombinedData,
    stats: &GlobalStats,
    freshness: &DataFreshness,
) -> SummaryStats {
    let rates = calculate_rates(CaseCounts {
        confirmed: stats.current.confirmed,
        deaths: stats.current.deaths,
        recovered: 0,
    });
    SummaryStats {
        last_update: stats.last_update.clone(),
        total_countries: data.confirmed.countries.len(),
        current: stats.current,
        daily: stats.daily,
        rates,
        global_trend: compute_trend(&data.confirmed.global),
        is_stale: freshness.is_stale,
        days_since_last_update: freshness.days_since_last_update,
    }
}
