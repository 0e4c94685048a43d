use crate::types::RawRow;
use crate::util::{is_date_header, parse_coord, parse_count};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub skipped_rows: usize,
}

/// Where the interesting columns live in a given header line.
#[derive(Debug, Default)]
struct ColumnLayout {
    width: usize,
    country: Vec<usize>,
    province: Vec<usize>,
    lat: Option<usize>,
    lng: Option<usize>,
    dates: Vec<(usize, String)>,
}

impl ColumnLayout {
    fn from_headers(headers: &[String]) -> Self {
        let mut layout = ColumnLayout {
            width: headers.len(),
            ..Default::default()
        };
        let mut country_alias = None;
        let mut province_alias = None;
        for (idx, header) in headers.iter().enumerate() {
            match header.as_str() {
                "Country/Region" => layout.country.push(idx),
                "Country" => country_alias = Some(idx),
                "Province/State" => layout.province.push(idx),
                "Province" => province_alias = Some(idx),
                "Lat" => layout.lat = Some(idx),
                "Long" => layout.lng = Some(idx),
                h if is_date_header(h) => layout.dates.push((idx, h.to_string())),
                _ => {}
            }
        }
        // The long header wins; the short alias is only a fallback.
        layout.country.extend(country_alias);
        layout.province.extend(province_alias);
        layout
    }

    fn row(&self, fields: &[String]) -> RawRow {
        let get = |idx: usize| fields.get(idx).map(String::as_str);
        let region_name = first_non_empty(fields, &self.country).unwrap_or_default();
        let sub_region = first_non_empty(fields, &self.province);
        let lat = self.lat.and_then(get).map(parse_coord).unwrap_or(0.0);
        let lng = self.lng.and_then(get).map(parse_coord).unwrap_or(0.0);
        let daily_values = self
            .dates
            .iter()
            .map(|(idx, header)| (header.clone(), get(*idx).map(parse_count).unwrap_or(0)))
            .collect();
        RawRow {
            region_name,
            sub_region,
            lat,
            lng,
            daily_values,
        }
    }
}

fn first_non_empty(fields: &[String], candidates: &[usize]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|idx| fields.get(*idx))
        .find(|v| !v.is_empty())
        .cloned()
}

/// Header fields: plain comma split, trimmed, quotes removed.
fn split_header(line: &str) -> Vec<String> {
    line.split(',')
        .map(|h| h.trim().replace('"', ""))
        .collect()
}

/// Split one data line on commas outside quotes.
///
/// Every `"` flips the in-quotes state and is dropped from the output, so a
/// quote never spans more than the line it sits on.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse a CSV time-series table into rows.
pub fn parse(text: &str) -> Vec<RawRow> {
    parse_with_report(text).0
}

/// Parse a CSV time-series table, also reporting how many lines were dropped.
///
/// The text is split into lines first; the first line is the header. A line
/// whose field count differs from the header's is skipped, never an error,
/// and unreadable numbers become `0`. Every line after the header counts
/// toward `total_rows`, blank ones included.
pub fn parse_with_report(text: &str) -> (Vec<RawRow>, ParseReport) {
    let mut lines = text.trim().split('\n').map(|l| l.trim_end_matches('\r'));
    let Some(header_line) = lines.next().filter(|l| !l.trim().is_empty()) else {
        return (Vec::new(), ParseReport::default());
    };
    let headers = split_header(header_line);
    let layout = ColumnLayout::from_headers(&headers);

    let mut rows = Vec::new();
    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    for line in lines {
        total_rows += 1;
        let fields = split_line(line);
        if fields.len() != layout.width {
            debug!(
                "skipping CSV line {}: {} fields, header has {}",
                total_rows + 1,
                fields.len(),
                layout.width
            );
            skipped_rows += 1;
            continue;
        }
        rows.push(layout.row(&fields));
    }

    let report = ParseReport {
        total_rows,
        parsed_rows: rows.len(),
        skipped_rows,
    };
    (rows, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n\
        ,Afghanistan,33.93911,67.709953,0,1\n\
        Australian Capital Territory,Australia,-35.4735,149.0124,2,3\n\
        ,\"Korea, South\",35.907757,127.766922,1,oops\n";

    #[test]
    fn parses_rows_in_order() {
        let rows = parse(SAMPLE);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].region_name, "Afghanistan");
        assert_eq!(rows[0].sub_region, None);
        assert_eq!(
            rows[0].daily_values,
            vec![("1/22/20".to_string(), 0), ("1/23/20".to_string(), 1)]
        );
        assert_eq!(rows[1].sub_region.as_deref(), Some("Australian Capital Territory"));
        assert!((rows[1].lat + 35.4735).abs() < 1e-9);
    }

    #[test]
    fn quoted_commas_stay_in_field_and_bad_numbers_are_zero() {
        let rows = parse(SAMPLE);
        assert_eq!(rows[2].region_name, "Korea, South");
        assert_eq!(rows[2].daily_values[1], ("1/23/20".to_string(), 0));
    }

    #[test]
    fn mismatched_lines_are_skipped_and_counted() {
        let text = "Country/Region,Province/State,1/1/21,1/2/21\n\
            US,,10,10\n\
            US,,10\n\
            US,,10,12,99\n\
            US,,10,12\n";
        let (rows, report) = parse_with_report(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            report,
            ParseReport {
                total_rows: 4,
                parsed_rows: 2,
                skipped_rows: 2
            }
        );
    }

    #[test]
    fn short_aliases_are_accepted() {
        let text = "Province,Country,Lat,Long,2/1/21\nOntario,Canada,51.2,-85.3,5\n";
        let rows = parse(text);
        assert_eq!(rows[0].region_name, "Canada");
        assert_eq!(rows[0].sub_region.as_deref(), Some("Ontario"));
        assert!((rows[0].lng + 85.3).abs() < 1e-9);
    }

    #[test]
    fn unbalanced_quote_only_costs_its_own_line() {
        let text = "Province/State,Country/Region,Lat,Long,1/22/20\n\
            ,A,1,1,1\n\
            ,\"Bad,1,1,2\n\
            ,C,1,1,3\n\
            ,D,1,1,4\n";
        let (rows, report) = parse_with_report(text);
        let names: Vec<_> = rows.iter().map(|r| r.region_name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "D"]);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(rows[2].daily_values[0].1, 4);
    }

    #[test]
    fn quoted_field_after_whitespace_keeps_its_comma() {
        let text = "Province/State,Country/Region,Lat,Long,1/22/20\n\
            , \"Korea, South\",1,1,5\n";
        let rows = parse(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].region_name, "Korea, South");
        assert_eq!(rows[0].daily_values[0].1, 5);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let text = "Province/State,Country/Region,Lat,Long,1/22/20\r\n,Chad,1,1,7\r\n";
        let rows = parse(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].daily_values[0].1, 7);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let (rows, report) = parse_with_report("");
        assert!(rows.is_empty());
        assert_eq!(report.total_rows, 0);
    }
}
