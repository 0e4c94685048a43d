use crate::types::{Coordinates, CountrySeries, DataType, NormalizedSeries, RawRow, RegionSeries};
use crate::util::format_date;
use indexmap::IndexMap;

pub const UNKNOWN_COUNTRY: &str = "Unknown";
pub const MAIN_REGION: &str = "main";

/// Fold parsed rows into per-country and global daily totals.
///
/// Provinces of the same country are summed per date, countries are summed
/// into `global`, and every country is backfilled with zeros so all series
/// share one date set. The first row of a country supplies its coordinates.
pub fn transform(rows: &[RawRow], data_type: DataType) -> NormalizedSeries {
    let mut series = NormalizedSeries::empty(data_type);

    for row in rows {
        let country_name = match row.region_name.trim() {
            "" => UNKNOWN_COUNTRY,
            name => name,
        };
        let coordinates = Coordinates {
            lat: row.lat,
            lng: row.lng,
        };
        let country = series
            .countries
            .entry(country_name.to_string())
            .or_insert_with(|| CountrySeries {
                name: country_name.to_string(),
                provinces: IndexMap::new(),
                total: Default::default(),
                coordinates,
            });

        let mut region = RegionSeries {
            name: row
                .sub_region
                .clone()
                .unwrap_or_else(|| country_name.to_string()),
            coordinates,
            data: Default::default(),
        };
        for (raw_date, value) in &row.daily_values {
            let date = format_date(raw_date);
            *country.total.entry(date.clone()).or_insert(0) += value;
            *series.global.entry(date.clone()).or_insert(0) += value;
            region.data.insert(date, *value);
        }

        let key = row
            .sub_region
            .clone()
            .unwrap_or_else(|| MAIN_REGION.to_string());
        country.provinces.insert(key, region);
    }

    backfill_dates(&mut series);
    series
}

/// Give every country an entry (zero when unreported) for each date in `global`.
fn backfill_dates(series: &mut NormalizedSeries) {
    for country in series.countries.values_mut() {
        for date in series.global.keys() {
            country.total.entry(date.clone()).or_insert(0);
        }
    }
}
