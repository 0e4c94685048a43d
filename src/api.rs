//! Adapter for the disease.sh REST aggregator.
//!
//! Response bodies are decoded into loose wire structs (every count may be
//! missing or `null`) and then mapped onto the typed records below, so
//! callers never see an absent number.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::DataError;
use crate::fetch::{fetch_json, Fetcher};
use crate::util::format_date;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiGlobalStats {
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
    pub today_cases: i64,
    pub today_deaths: i64,
    pub critical: i64,
    /// Epoch millis of the aggregator's last refresh.
    pub updated: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiCountry {
    pub country: String,
    pub iso2: Option<String>,
    pub iso3: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
    pub today_cases: i64,
    pub today_deaths: i64,
    pub today_recovered: i64,
    pub critical: i64,
    pub population: i64,
    pub continent: Option<String>,
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiContinent {
    pub continent: String,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
    pub today_cases: i64,
    pub today_deaths: i64,
    pub critical: i64,
    pub population: i64,
    pub countries: Vec<String>,
}

/// One day of the historical feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalPoint {
    pub date: String,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    /// `confirmed - deaths - recovered`, never below zero.
    pub active: i64,
}

/// Fields that can be used to rank `ApiCountry` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryField {
    Confirmed,
    Deaths,
    Recovered,
    Active,
    TodayCases,
    TodayDeaths,
    Critical,
    Population,
}

impl CountryField {
    fn of(&self, c: &ApiCountry) -> i64 {
        match self {
            CountryField::Confirmed => c.confirmed,
            CountryField::Deaths => c.deaths,
            CountryField::Recovered => c.recovered,
            CountryField::Active => c.active,
            CountryField::TodayCases => c.today_cases,
            CountryField::TodayDeaths => c.today_deaths,
            CountryField::Critical => c.critical,
            CountryField::Population => c.population,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCounts {
    cases: Option<i64>,
    deaths: Option<i64>,
    recovered: Option<i64>,
    active: Option<i64>,
    today_cases: Option<i64>,
    today_deaths: Option<i64>,
    today_recovered: Option<i64>,
    critical: Option<i64>,
    population: Option<i64>,
    updated: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCountryInfo {
    iso2: Option<String>,
    iso3: Option<String>,
    lat: Option<f64>,
    long: Option<f64>,
    flag: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCountry {
    country: String,
    country_info: Option<WireCountryInfo>,
    continent: Option<String>,
    #[serde(flatten)]
    counts: WireCounts,
}

#[derive(Debug, Deserialize)]
struct WireContinent {
    continent: String,
    #[serde(default)]
    countries: Vec<String>,
    #[serde(flatten)]
    counts: WireCounts,
}

#[derive(Debug, Default, Deserialize)]
struct WireTimeline {
    #[serde(default)]
    cases: BTreeMap<String, Option<i64>>,
    #[serde(default)]
    deaths: BTreeMap<String, Option<i64>>,
    #[serde(default)]
    recovered: BTreeMap<String, Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct WireCountryTimeline {
    timeline: Option<WireTimeline>,
}

impl From<WireCountry> for ApiCountry {
    fn from(w: WireCountry) -> Self {
        let info = w.country_info;
        let c = w.counts;
        ApiCountry {
            country: w.country,
            iso2: info.as_ref().and_then(|i| i.iso2.clone()),
            iso3: info.as_ref().and_then(|i| i.iso3.clone()),
            lat: info.as_ref().and_then(|i| i.lat).unwrap_or(0.0),
            lng: info.as_ref().and_then(|i| i.long).unwrap_or(0.0),
            confirmed: c.cases.unwrap_or(0),
            deaths: c.deaths.unwrap_or(0),
            recovered: c.recovered.unwrap_or(0),
            active: c.active.unwrap_or(0),
            today_cases: c.today_cases.unwrap_or(0),
            today_deaths: c.today_deaths.unwrap_or(0),
            today_recovered: c.today_recovered.unwrap_or(0),
            critical: c.critical.unwrap_or(0),
            population: c.population.unwrap_or(0),
            continent: w.continent,
            flag: info.and_then(|i| i.flag),
        }
    }
}

impl From<WireContinent> for ApiContinent {
    fn from(w: WireContinent) -> Self {
        let c = w.counts;
        ApiContinent {
            continent: w.continent,
            confirmed: c.cases.unwrap_or(0),
            deaths: c.deaths.unwrap_or(0),
            recovered: c.recovered.unwrap_or(0),
            active: c.active.unwrap_or(0),
            today_cases: c.today_cases.unwrap_or(0),
            today_deaths: c.today_deaths.unwrap_or(0),
            critical: c.critical.unwrap_or(0),
            population: c.population.unwrap_or(0),
            countries: w.countries,
        }
    }
}

/// Flatten a timeline into dated points, oldest first.
///
/// Dates arrive as `M/D/YY` and are normalized to ISO so that ordering by
/// key is chronological.
fn timeline_points(timeline: WireTimeline) -> Vec<HistoricalPoint> {
    let mut points: Vec<HistoricalPoint> = timeline
        .cases
        .iter()
        .map(|(raw_date, cases)| {
            let confirmed = cases.unwrap_or(0);
            let deaths = timeline.deaths.get(raw_date).copied().flatten().unwrap_or(0);
            let recovered = timeline
                .recovered
                .get(raw_date)
                .copied()
                .flatten()
                .unwrap_or(0);
            HistoricalPoint {
                date: format_date(raw_date),
                confirmed,
                deaths,
                recovered,
                active: (confirmed - deaths - recovered).max(0),
            }
        })
        .collect();
    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

/// Thin client over the aggregator's endpoints.
pub struct ApiClient<F: Fetcher> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetcher> ApiClient<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `url(path)` followed by a percent-encoded query string.
    fn url_with_query(&self, path: &str, query: &[(&str, &str)]) -> String {
        let pairs: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.url(path), pairs.join("&"))
    }

    pub fn fetch_global_stats(&self) -> Result<ApiGlobalStats, DataError> {
        let c: WireCounts = fetch_json(&self.fetcher, &self.url("all"))?;
        Ok(ApiGlobalStats {
            confirmed: c.cases.unwrap_or(0),
            deaths: c.deaths.unwrap_or(0),
            recovered: c.recovered.unwrap_or(0),
            active: c.active.unwrap_or(0),
            today_cases: c.today_cases.unwrap_or(0),
            today_deaths: c.today_deaths.unwrap_or(0),
            critical: c.critical.unwrap_or(0),
            updated: c.updated.unwrap_or(0),
        })
    }

    pub fn fetch_countries(&self) -> Result<Vec<ApiCountry>, DataError> {
        let wire: Vec<WireCountry> = fetch_json(&self.fetcher, &self.url("countries"))?;
        info!("[covid:api] {} countries", wire.len());
        Ok(wire.into_iter().map(ApiCountry::from).collect())
    }

    /// A 404 from the aggregator becomes `DataError::NotFound`.
    pub fn fetch_country(&self, name: &str) -> Result<ApiCountry, DataError> {
        let url = self.url(&format!("countries/{}", encode_segment(name)));
        match fetch_json::<WireCountry, _>(&self.fetcher, &url) {
            Ok(wire) => Ok(wire.into()),
            Err(err) if err.status() == Some(404) => {
                Err(DataError::NotFound(format!("country '{}'", name)))
            }
            Err(err) => Err(err),
        }
    }

    pub fn fetch_historical(&self, days: u32) -> Result<Vec<HistoricalPoint>, DataError> {
        let days = days.to_string();
        let url = self.url_with_query("historical/all", &[("lastdays", &days)]);
        let timeline: WireTimeline = fetch_json(&self.fetcher, &url)?;
        Ok(timeline_points(timeline))
    }

    /// Historical points for one country; empty if the body has no timeline.
    pub fn fetch_country_historical(
        &self,
        name: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>, DataError> {
        let days = days.to_string();
        let url = self.url_with_query(
            &format!("historical/{}", encode_segment(name)),
            &[("lastdays", &days)],
        );
        match fetch_json::<WireCountryTimeline, _>(&self.fetcher, &url) {
            Ok(wire) => Ok(wire.timeline.map(timeline_points).unwrap_or_default()),
            Err(err) if err.status() == Some(404) => {
                Err(DataError::NotFound(format!("country '{}'", name)))
            }
            Err(err) => Err(err),
        }
    }

    pub fn fetch_continents(&self) -> Result<Vec<ApiContinent>, DataError> {
        let wire: Vec<WireContinent> = fetch_json(&self.fetcher, &self.url("continents"))?;
        Ok(wire.into_iter().map(ApiContinent::from).collect())
    }
}

/// Percent-encode a country name for use as one path segment.
fn encode_segment(s: &str) -> String {
    urlencoding::encode(s.trim()).into_owned()
}

/// The `limit` largest countries by `field`; ties keep input order.
pub fn top_countries(countries: &[ApiCountry], limit: usize, field: CountryField) -> Vec<ApiCountry> {
    let mut sorted = countries.to_vec();
    sorted.sort_by(|a, b| field.of(b).cmp(&field.of(a)));
    sorted.truncate(limit);
    sorted
}

/// Case-insensitive continent match.
pub fn countries_by_continent(countries: &[ApiCountry], continent: &str) -> Vec<ApiCountry> {
    countries
        .iter()
        .filter(|c| {
            c.continent
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(continent))
        })
        .cloned()
        .collect()
}

/// Case-insensitive substring search on the country name.
pub fn search_countries(countries: &[ApiCountry], query: &str) -> Vec<ApiCountry> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    countries
        .iter()
        .filter(|c| c.country.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

/// The last `days` points of a historical series.
pub fn last_days(points: &[HistoricalPoint], days: usize) -> &[HistoricalPoint] {
    &points[points.len().saturating_sub(days)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Routes(HashMap<String, Result<String, u16>>);

    impl Fetcher for Routes {
        fn fetch_text(&self, url: &str) -> Result<String, DataError> {
            match self.0.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(code)) => Err(DataError::Network {
                    url: url.to_string(),
                    status: Some(*code),
                    reason: format!("HTTP error! status: {code}"),
                }),
                None => Err(DataError::Network {
                    url: url.to_string(),
                    status: None,
                    reason: "no route".to_string(),
                }),
            }
        }
    }

    fn client(routes: &[(&str, Result<&str, u16>)]) -> ApiClient<Routes> {
        let map = routes
            .iter()
            .map(|(path, r)| {
                (
                    format!("http://api/{}", path),
                    r.map(|body| body.to_string()),
                )
            })
            .collect();
        ApiClient::new(Routes(map), "http://api/")
    }

    fn country(name: &str, continent: &str, confirmed: i64) -> ApiCountry {
        ApiCountry {
            country: name.to_string(),
            iso2: None,
            iso3: None,
            lat: 0.0,
            lng: 0.0,
            confirmed,
            deaths: 0,
            recovered: 0,
            active: 0,
            today_cases: 0,
            today_deaths: 0,
            today_recovered: 0,
            critical: 0,
            population: 0,
            continent: Some(continent.to_string()),
            flag: None,
        }
    }

    #[test]
    fn maps_country_fields_and_nulls() {
        let body = r#"[{"country":"France","countryInfo":{"iso2":"FR","iso3":"FRA","lat":46,"long":2,"flag":"https://flags/fr.png"},
            "cases":100,"todayCases":3,"deaths":5,"todayDeaths":null,"recovered":null,"active":95,
            "critical":1,"population":65000000,"continent":"Europe"}]"#;
        let countries = client(&[("countries", Ok(body))]).fetch_countries().unwrap();
        let fr = &countries[0];
        assert_eq!(fr.confirmed, 100);
        assert_eq!(fr.today_deaths, 0);
        assert_eq!(fr.recovered, 0);
        assert_eq!(fr.flag.as_deref(), Some("https://flags/fr.png"));
        assert_eq!(fr.lat, 46.0);
        assert_eq!(fr.continent.as_deref(), Some("Europe"));
    }

    #[test]
    fn missing_country_is_not_found() {
        let err = client(&[("countries/Atlantis", Err(404))])
            .fetch_country("Atlantis")
            .unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));

        let err = client(&[("countries/France", Err(500))])
            .fetch_country("France")
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn country_names_are_percent_encoded() {
        let body = r#"{"country":"Curaçao","cases":45}"#;
        let api = client(&[("countries/Cura%C3%A7ao", Ok(body))]);
        let cw = api.fetch_country(" Curaçao ").unwrap();
        assert_eq!(cw.confirmed, 45);

        assert_eq!(encode_segment("Korea, South"), "Korea%2C%20South");
        assert_eq!(encode_segment("A/B"), "A%2FB");
        assert_eq!(encode_segment("Saint Martin#1"), "Saint%20Martin%231");
    }

    #[test]
    fn historical_query_is_built_from_encoded_pairs() {
        let api = client(&[(
            "historical/Cote%20d%27Ivoire?lastdays=7",
            Ok(r#"{"country":"Cote d'Ivoire"}"#),
        )]);
        assert!(api
            .fetch_country_historical("Cote d'Ivoire", 7)
            .unwrap()
            .is_empty());
        assert_eq!(
            api.url_with_query("historical/all", &[("lastdays", "all")]),
            "http://api/historical/all?lastdays=all"
        );
    }

    #[test]
    fn historical_active_is_clamped_and_sorted() {
        let body = r#"{"cases":{"12/31/20":10,"1/1/21":12},
            "deaths":{"12/31/20":1,"1/1/21":2},
            "recovered":{"12/31/20":20,"1/1/21":5}}"#;
        let points = client(&[("historical/all?lastdays=2", Ok(body))])
            .fetch_historical(2)
            .unwrap();
        assert_eq!(points[0].date, "2020-12-31");
        assert_eq!(points[0].active, 0);
        assert_eq!(points[1].date, "2021-01-01");
        assert_eq!(points[1].active, 5);
    }

    #[test]
    fn country_historical_without_timeline_is_empty() {
        let points = client(&[("historical/Peru?lastdays=30", Ok(r#"{"country":"Peru"}"#))])
            .fetch_country_historical("Peru", 30)
            .unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn continents_keep_country_lists() {
        let body = r#"[{"continent":"Oceania","cases":7,"countries":["Fiji","Tonga"]}]"#;
        let continents = client(&[("continents", Ok(body))]).fetch_continents().unwrap();
        assert_eq!(continents[0].countries, vec!["Fiji", "Tonga"]);
        assert_eq!(continents[0].deaths, 0);
    }

    #[test]
    fn list_helpers() {
        let all = vec![
            country("Peru", "South America", 5),
            country("Spain", "Europe", 9),
            country("Portugal", "europe", 5),
        ];
        let top = top_countries(&all, 2, CountryField::Confirmed);
        assert_eq!(top[0].country, "Spain");
        assert_eq!(top[1].country, "Peru");
        assert_eq!(countries_by_continent(&all, "EUROPE").len(), 2);
        assert_eq!(search_countries(&all, "p").len(), 3);
        assert_eq!(search_countries(&all, "ort")[0].country, "Portugal");
        assert!(search_countries(&all, " ").is_empty());
    }

    #[test]
    fn last_days_slices_the_tail() {
        let points: Vec<HistoricalPoint> = (1..=5)
            .map(|d| HistoricalPoint {
                date: format!("2021-01-0{}", d),
                confirmed: d,
                deaths: 0,
                recovered: 0,
                active: d,
            })
            .collect();
        assert_eq!(last_days(&points, 2)[0].confirmed, 4);
        assert_eq!(last_days(&points, 10).len(), 5);
    }
}
