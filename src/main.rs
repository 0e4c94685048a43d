// Entry point and high-level CLI flow.
//
// - Option [1] fetches (or reuses cached) data and prints a short overview.
// - Option [2] generates the ranking and trend reports plus a JSON summary.
// - Option [3] clears the cache and reloads.
// - Option [4] switches the data type used for rankings.
use std::io::{self, Write};

use chrono::Utc;
use covid_report::state::{reduce, DashboardState, Event, LoadedData};
use covid_report::{output, reports, util};
use covid_report::{AppConfig, CovidDataService, DataError, DataType, HttpFetcher, SystemClock};
use tracing::warn;

type Service = CovidDataService<HttpFetcher, SystemClock>;

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn load(service: &Service) -> Result<LoadedData, DataError> {
    let all_data = service.get_all_data()?;
    Ok(LoadedData {
        global_stats: service.get_global_stats()?,
        available_countries: service.get_available_countries()?,
        data_freshness: service.get_data_freshness()?,
        all_data,
        last_updated: Utc::now(),
    })
}

/// Handle option [1]: fetch the data and print the headline numbers.
fn handle_load(service: &Service, state: DashboardState) -> DashboardState {
    let state = reduce(&state, Event::Loading(true));
    let state = match load(service) {
        Ok(loaded) => reduce(&state, Event::DataLoaded(loaded)),
        Err(e) => {
            eprintln!("Failed to load data: {}\n", e);
            return reduce(&state, Event::Failed(format!("Error while loading data: {}", e)));
        }
    };

    if let Some(stats) = &state.global_stats {
        println!(
            "Loaded {} countries, data up to {}.",
            util::format_int(state.available_countries.len()),
            stats.last_update.as_deref().unwrap_or("-")
        );
        println!(
            "Confirmed: {} ({})  Deaths: {} ({})  Active (est.): {} ({})",
            util::format_int(stats.current.confirmed),
            util::format_delta(stats.daily.confirmed),
            util::format_int(stats.current.deaths),
            util::format_delta(stats.daily.deaths),
            util::format_int(stats.current.active),
            util::format_delta(stats.daily.active)
        );
    }
    if let Some(warning) = state.data_freshness.as_ref().and_then(|f| f.warning.as_ref()) {
        warn!("{}", warning);
        println!("{}", warning);
    }
    println!("Note: recovered cases are no longer reported; active cases are estimated as confirmed - deaths.\n");
    state
}

/// Handle option [2]: build the reports, export them and print previews.
fn handle_generate_reports(service: &Service, state: &DashboardState) {
    let Some(data) = state.all_data.as_ref() else {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return;
    };
    let (Some(stats), Some(freshness)) = (&state.global_stats, &state.data_freshness) else {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return;
    };
    let data_type = state.selected_data_type;
    let n = service.config().top_n;

    println!("Generating reports for {}...", data_type.label());
    println!("Outputs saved to individual files...\n");

    let r1 = reports::generate_top_countries(data, data_type, n);
    let file1 = "report_top_countries.csv";
    if let Err(e) = output::write_csv(file1, &r1) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Top {} Countries by {}\n", n, data_type.label());
    output::preview_table_rows(&r1, 5);
    println!("(Full table exported to {})\n", file1);

    let r2 = reports::generate_country_trends(data, data_type, n);
    let file2 = "report_country_trends.csv";
    if let Err(e) = output::write_csv(file2, &r2) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: Latest Change and 7-Day Trend\n");
    output::preview_table_rows(&r2, 5);
    println!("(Full table exported to {})\n", file2);

    let summary = reports::generate_summary(data, stats, freshness);
    if let Err(e) = output::write_json("summary.json", &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"mortality_rate\": {}, \"global_trend_pct\": {}}}\n",
        util::format_number(summary.rates.mortality_rate, 2),
        util::format_number(summary.global_trend * 100.0, 2)
    );
}

/// Handle option [4]: pick confirmed, deaths or active.
fn handle_select_data_type(state: DashboardState) -> DashboardState {
    for (idx, data_type) in DataType::ALL.iter().enumerate() {
        println!("[{}] {}", idx + 1, data_type.label());
    }
    let choice = read_choice();
    let picked = choice
        .parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| DataType::ALL.get(i).copied())
        .or_else(|| choice.parse::<DataType>().ok());
    match picked {
        Some(data_type) => {
            println!("Data type set to {}.\n", data_type.label());
            reduce(&state, Event::SelectDataType(data_type))
        }
        None => {
            println!("Invalid choice.\n");
            state
        }
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let service = CovidDataService::new(HttpFetcher, SystemClock, AppConfig::from_env());
    let mut state = DashboardState::default();

    loop {
        println!("COVID-19 Data Reports:");
        println!("[1] Load the data");
        println!("[2] Generate Reports");
        println!("[3] Refresh data");
        println!("[4] Select data type ({})", state.selected_data_type);
        println!("[5] Exit\n");
        match read_choice().as_str() {
            "1" => {
                state = handle_load(&service, state);
            }
            "2" => {
                println!();
                handle_generate_reports(&service, &state);
            }
            "3" => {
                service.clear_cache();
                state = handle_load(&service, state);
            }
            "4" => {
                state = handle_select_data_type(state);
            }
            "5" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1-5.\n");
            }
        }
    }
}
