use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::metrics::{compute_trend, filter_date_range, top_n};
use crate::types::{
    CombinedData, CountryData, DailySeries, DataFreshness, DataType, GlobalStats, RankedCountry,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Everything the dashboard shows, independent of any UI toolkit.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub all_data: Option<Arc<CombinedData>>,
    pub global_stats: Option<GlobalStats>,
    pub available_countries: Vec<String>,
    pub data_freshness: Option<DataFreshness>,
    pub loading: bool,
    pub error: Option<String>,
    pub selected_country: Option<String>,
    pub selected_data_type: DataType,
    pub date_range: DateRange,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            all_data: None,
            global_stats: None,
            available_countries: Vec::new(),
            data_freshness: None,
            loading: false,
            error: None,
            selected_country: None,
            selected_data_type: DataType::Confirmed,
            date_range: DateRange::default(),
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub all_data: Arc<CombinedData>,
    pub global_stats: GlobalStats,
    pub available_countries: Vec<String>,
    pub data_freshness: DataFreshness,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum Event {
    Loading(bool),
    DataLoaded(LoadedData),
    Failed(String),
    SelectCountry(Option<String>),
    SelectDataType(DataType),
    SetDateRange(DateRange),
    ClearError,
    SetFreshness(DataFreshness),
}

/// Apply one event, returning the next state.
pub fn reduce(state: &DashboardState, event: Event) -> DashboardState {
    let mut next = state.clone();
    match event {
        Event::Loading(loading) => {
            next.loading = loading;
            if loading {
                next.error = None;
            }
        }
        Event::DataLoaded(loaded) => {
            next.all_data = Some(loaded.all_data);
            next.global_stats = Some(loaded.global_stats);
            next.available_countries = loaded.available_countries;
            next.data_freshness = Some(loaded.data_freshness);
            next.last_updated = Some(loaded.last_updated);
            next.loading = false;
            next.error = None;
        }
        Event::Failed(message) => {
            next.error = Some(message);
            next.loading = false;
        }
        Event::SelectCountry(country) => next.selected_country = country,
        Event::SelectDataType(data_type) => next.selected_data_type = data_type,
        Event::SetDateRange(range) => next.date_range = range,
        Event::ClearError => next.error = None,
        Event::SetFreshness(freshness) => next.data_freshness = Some(freshness),
    }
    next
}

impl DashboardState {
    pub fn is_data_loaded(&self) -> bool {
        self.all_data.is_some()
    }

    pub fn is_data_stale(&self) -> bool {
        self.data_freshness.as_ref().is_some_and(|f| f.is_stale)
    }

    /// All series of the selected country, if one is selected and known.
    pub fn selected_country_data(&self) -> Option<CountryData> {
        let name = self.selected_country.as_deref()?;
        let all = self.all_data.as_ref()?;
        let pick = |data_type| all.series(data_type).countries.get(name).cloned();
        Some(CountryData {
            confirmed: pick(DataType::Confirmed),
            deaths: pick(DataType::Deaths),
            active: pick(DataType::Active),
        })
    }

    /// Global series of the selected data type.
    pub fn global_series(&self) -> DailySeries {
        self.all_data
            .as_ref()
            .map(|all| all.series(self.selected_data_type).global.clone())
            .unwrap_or_default()
    }

    pub fn in_date_range(&self, series: &DailySeries) -> DailySeries {
        filter_date_range(
            series,
            self.date_range.start.as_deref(),
            self.date_range.end.as_deref(),
        )
    }

    pub fn top_countries(&self, n: usize) -> Vec<RankedCountry> {
        self.all_data
            .as_ref()
            .map(|all| top_n(&all.series(self.selected_data_type).countries, n))
            .unwrap_or_default()
    }

    pub fn trend_of(&self, series: &DailySeries) -> f64 {
        compute_trend(series)
    }
}
