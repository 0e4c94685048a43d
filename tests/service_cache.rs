use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use covid_report::{
    AppConfig, CovidDataService, DataError, DataType, Fetcher, ManualClock,
};

const CONFIRMED_URL: &str = "http://test/confirmed.csv";
const DEATHS_URL: &str = "http://test/deaths.csv";

const CONFIRMED: &str = "Province/State,Country/Region,Lat,Long,3/8/23,3/9/23\n\
    ,Peru,-9.19,-75.0,100,110\n\
    ,Chile,-35.7,-71.5,50,55\n";
const DEATHS: &str = "Province/State,Country/Region,Lat,Long,3/8/23,3/9/23\n\
    ,Peru,-9.19,-75.0,5,6\n\
    ,Chile,-35.7,-71.5,60,61\n";

/// Serves fixed bodies and counts calls; can be switched to fail.
#[derive(Default)]
struct ScriptedFetcher {
    calls: AtomicUsize,
    fail_deaths_with: Mutex<Option<u16>>,
}

impl Fetcher for ScriptedFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match url {
            CONFIRMED_URL => Ok(CONFIRMED.to_string()),
            DEATHS_URL => match *self.fail_deaths_with.lock().unwrap() {
                Some(code) => Err(DataError::Network {
                    url: url.to_string(),
                    status: Some(code),
                    reason: format!("HTTP error! status: {code}"),
                }),
                None => Ok(DEATHS.to_string()),
            },
            _ => Err(DataError::Network {
                url: url.to_string(),
                status: None,
                reason: "unknown url".to_string(),
            }),
        }
    }
}

fn config() -> AppConfig {
    AppConfig {
        confirmed_url: CONFIRMED_URL.to_string(),
        deaths_url: DEATHS_URL.to_string(),
        cache_ttl_ms: 60_000,
        ..AppConfig::default()
    }
}

fn service() -> CovidDataService<Arc<ScriptedFetcher>, Arc<ManualClock>> {
    let start = Utc.with_ymd_and_hms(2023, 3, 10, 12, 0, 0).unwrap();
    CovidDataService::new(
        Arc::new(ScriptedFetcher::default()),
        Arc::new(ManualClock::at(start)),
        config(),
    )
}

fn calls(svc: &CovidDataService<Arc<ScriptedFetcher>, Arc<ManualClock>>) -> usize {
    svc.fetcher().calls.load(Ordering::SeqCst)
}

#[test]
fn second_read_within_ttl_reuses_entry() {
    let svc = service();
    let first = svc.get_all_data().unwrap();
    assert_eq!(calls(&svc), 2);

    svc.cache().clock().advance(59_999);
    let second = svc.get_all_data().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls(&svc), 2);
}

#[test]
fn expiry_and_clear_trigger_refetch() {
    let svc = service();
    let first = svc.get_all_data().unwrap();

    svc.cache().clock().advance(60_000);
    let second = svc.get_all_data().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(calls(&svc), 4);

    svc.clear_cache();
    let third = svc.get_all_data().unwrap();
    assert!(!Arc::ptr_eq(&second, &third));
    assert_eq!(calls(&svc), 6);
}

#[test]
fn failed_fetch_propagates_and_keeps_previous_entry() {
    let svc = service();
    let first = svc.get_all_data().unwrap();

    *svc.fetcher().fail_deaths_with.lock().unwrap() = Some(503);
    svc.cache().clock().advance(120_000);
    let err = svc.get_all_data().unwrap_err();
    assert_eq!(err.status(), Some(503));

    let kept = svc.cache().entry().expect("previous entry survives");
    assert!(Arc::ptr_eq(&kept.payload, &first));
}

#[test]
fn failure_on_empty_cache_stores_nothing() {
    let svc = service();
    *svc.fetcher().fail_deaths_with.lock().unwrap() = Some(404);
    assert!(matches!(
        svc.get_all_data(),
        Err(DataError::Network { status: Some(404), .. })
    ));
    assert!(svc.cache().entry().is_none());
}

#[test]
fn combined_payload_and_accessors() {
    let svc = service();
    let all = svc.get_all_data().unwrap();
    assert_eq!(all.metadata.data_types, DataType::ALL.to_vec());
    assert_eq!(all.active.countries["Chile"].total["2023-03-09"], 0);
    assert_eq!(all.active.global["2023-03-09"], 104);

    let stats = svc.get_global_stats().unwrap();
    assert_eq!(stats.last_update.as_deref(), Some("2023-03-09"));
    assert_eq!(stats.current.confirmed, 165);
    assert_eq!(stats.daily.confirmed, 15);
    assert_eq!(stats.daily.deaths, 2);

    let countries = svc.get_available_countries().unwrap();
    assert_eq!(countries, vec!["Peru", "Chile"]);

    let peru = svc.get_country_data("Peru").unwrap();
    assert_eq!(peru.deaths.unwrap().total["2023-03-08"], 5);
    assert!(matches!(
        svc.get_country_data("Atlantis"),
        Err(DataError::NotFound(_))
    ));

    let global = svc.get_global_data().unwrap();
    assert_eq!(global.deaths["2023-03-09"], 67);
    assert_eq!(calls(&svc), 2);
}

#[test]
fn freshness_follows_injected_clock() {
    let svc = service();
    let fresh = svc.get_data_freshness().unwrap();
    assert_eq!(fresh.last_data_date.as_deref(), Some("2023-03-09"));
    assert_eq!(fresh.days_since_last_update, Some(1));
    assert!(!fresh.is_stale);

    let later = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    svc.cache().clock().set(later.timestamp_millis());
    let stale = svc.get_data_freshness().unwrap();
    assert!(stale.is_stale);
    assert!(stale.warning.is_some());
}

#[test]
fn metadata_is_stamped_by_the_clock_and_serialized_as_rfc3339() {
    let svc = service();
    let all = svc.get_all_data().unwrap();
    assert_eq!(
        all.metadata.last_updated,
        Utc.with_ymd_and_hms(2023, 3, 10, 12, 0, 0).unwrap()
    );

    let json = serde_json::to_value(&all.metadata).unwrap();
    assert_eq!(json["last_updated"], "2023-03-10T12:00:00Z");
}
