use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::errors::DataError;

/// `YYYY-MM-DD`; lexicographic order equals chronological order.
pub type IsoDate = String;

/// Daily cumulative counts keyed by ISO date.
pub type DailySeries = BTreeMap<IsoDate, i64>;

/// One data line of a source table, before any aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// `Country/Region` (or `Country`); may be empty.
    pub region_name: String,
    /// `Province/State` (or `Province`); `None` when absent or blank.
    pub sub_region: Option<String>,
    pub lat: f64,
    pub lng: f64,
    /// Raw `M/D/YY` header token and value, in header order.
    pub daily_values: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Confirmed,
    Deaths,
    Active,
}

impl DataType {
    pub const ALL: [DataType; 3] = [DataType::Confirmed, DataType::Deaths, DataType::Active];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Confirmed => "confirmed",
            DataType::Deaths => "deaths",
            DataType::Active => "active",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataType::Confirmed => "Confirmed cases",
            DataType::Deaths => "Deaths",
            DataType::Active => "Active cases (estimated)",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(DataType::Confirmed),
            "deaths" => Ok(DataType::Deaths),
            "active" => Ok(DataType::Active),
            other => Err(DataError::NotFound(format!("data type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A province/state (or the `main` pseudo-region) of one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSeries {
    pub name: String,
    pub coordinates: Coordinates,
    pub data: DailySeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySeries {
    pub name: String,
    pub provinces: IndexMap<String, RegionSeries>,
    /// Sum over all provinces per date.
    pub total: DailySeries,
    /// Coordinates of the first row seen for this country.
    pub coordinates: Coordinates,
}

/// Per-country and global daily totals for one data type.
///
/// Every country's `total` and `global` share the same date keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub data_type: DataType,
    pub countries: IndexMap<String, CountrySeries>,
    pub global: DailySeries,
}

impl NormalizedSeries {
    pub fn empty(data_type: DataType) -> Self {
        Self {
            data_type,
            countries: IndexMap::new(),
            global: DailySeries::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    /// When the fetch that produced this payload ran; serialized as RFC 3339.
    pub last_updated: DateTime<Utc>,
    pub source: String,
    pub data_types: Vec<DataType>,
    pub notes: BTreeMap<String, String>,
}

/// Everything one fetch-and-build cycle produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedData {
    pub confirmed: NormalizedSeries,
    pub deaths: NormalizedSeries,
    pub active: NormalizedSeries,
    pub metadata: Metadata,
}

impl CombinedData {
    pub fn series(&self, data_type: DataType) -> &NormalizedSeries {
        match data_type {
            DataType::Confirmed => &self.confirmed,
            DataType::Deaths => &self.deaths,
            DataType::Active => &self.active,
        }
    }
}

/// All series of a single country; a type is `None` when the country is
/// absent from that series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryData {
    pub confirmed: Option<CountrySeries>,
    pub deaths: Option<CountrySeries>,
    pub active: Option<CountrySeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalData {
    pub confirmed: DailySeries,
    pub deaths: DailySeries,
    pub active: DailySeries,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CaseTriple {
    pub confirmed: i64,
    pub deaths: i64,
    pub active: i64,
}

/// Latest global values and their change since the previous date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    pub last_update: Option<IsoDate>,
    pub current: CaseTriple,
    /// May be negative when a source revises history downward.
    pub daily: CaseTriple,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataFreshness {
    pub last_data_date: Option<IsoDate>,
    pub days_since_last_update: Option<i64>,
    pub is_stale: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaseCounts {
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
}

/// Percentages of confirmed cases, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rates {
    pub mortality_rate: f64,
    pub recovery_rate: f64,
    pub active_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCountry {
    pub name: String,
    pub value: i64,
}

/// Last observation of a series and its delta from the one before.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    pub date: Option<IsoDate>,
    pub current: i64,
    pub daily: i64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopCountryRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "Confirmed")]
    #[tabled(rename = "Confirmed")]
    pub confirmed: String,
    #[serde(rename = "Deaths")]
    #[tabled(rename = "Deaths")]
    pub deaths: String,
    #[serde(rename = "ActiveEstimate")]
    #[tabled(rename = "ActiveEstimate")]
    pub active: String,
    #[serde(rename = "MortalityRate")]
    #[tabled(rename = "MortalityRate")]
    pub mortality_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CountryTrendRow {
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "LastDate")]
    #[tabled(rename = "LastDate")]
    pub last_date: String,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current: String,
    #[serde(rename = "DailyChange")]
    #[tabled(rename = "DailyChange")]
    pub daily_change: String,
    #[serde(rename = "Trend7d")]
    #[tabled(rename = "Trend7d")]
    pub trend_7d: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub last_update: Option<IsoDate>,
    pub total_countries: usize,
    pub current: CaseTriple,
    pub daily: CaseTriple,
    pub rates: Rates,
    pub global_trend: f64,
    pub is_stale: bool,
    pub days_since_last_update: Option<i64>,
}
