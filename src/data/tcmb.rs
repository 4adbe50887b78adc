//! TCMB consumer-prices client
//!
//! Scrapes the year-over-year CPI table published by the Central Bank of the
//! Republic of Türkiye and turns it into a monthly [`Series`].

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use super::{Series, TimeSeriesPoint};

/// Consumer prices page of the TCMB statistics section
pub const TCMB_CPI_URL: &str = "https://www.tcmb.gov.tr/wps/wcm/connect/EN/TCMB+EN/Main+Menu/Statistics/Inflation+Data/Consumer+Prices";

/// `summary` attribute carried by the CPI table
const TABLE_SUMMARY: &str = "Consumer Price Index (2003=100) (TURKSTAT)";

static SUMMARY_TABLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&format!("table[summary=\"{}\"]", TABLE_SUMMARY)).expect("valid selector")
});
static HEADER_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));

/// Header text used to locate the table when the summary attribute changes
const YOY_HEADER: &str = "CPI (Year to Year % Changes)";

/// Browser user agent; the TCMB site rejects some default client agents
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Errors that can occur when fetching the CPI series
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    /// The page did not contain a recognizable CPI table
    #[error("Could not locate the CPI data table on the page")]
    TableNotFound,
}

/// Anything that can produce the monthly CPI series
///
/// Implementations return an empty series when the upstream answered but held no rows;
/// transport and parsing failures are reported as [`SourceError`].
pub trait CpiSource {
    fn fetch(&self) -> impl Future<Output = Result<Series, SourceError>>;
}

/// Client for the TCMB consumer-prices page
#[derive(Debug, Clone)]
pub struct TcmbClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Page URL (allows override for testing or mirrors)
    url: String,
}

impl TcmbClient {
    /// Creates a client for `url` with the given request timeout
    ///
    /// Fails if the HTTP client cannot be built with the timeout and user agent.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CpiSource for TcmbClient {
    async fn fetch(&self) -> Result<Series, SourceError> {
        tracing::debug!(url = %self.url, "fetching CPI page");
        let response = self.http_client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.text().await?;
        let series = parse_cpi_table(&body)?;
        tracing::info!(rows = series.len(), "parsed CPI table");
        Ok(series)
    }
}

/// Extracts the YoY CPI series from the TCMB page HTML.
///
/// Rows need at least two cells: an `MM-YYYY` date and a decimal value. Rows that do
/// not parse (blank cells, footnotes, sub-headers) are skipped.
pub fn parse_cpi_table(html: &str) -> Result<Series, SourceError> {
    let document = Html::parse_document(html);
    let table = find_cpi_table(&document).ok_or(SourceError::TableNotFound)?;

    let mut points = Vec::new();
    for row in table.select(&ROW) {
        let cells: Vec<ElementRef> = row.select(&CELL).collect();
        if cells.len() < 2 {
            continue;
        }

        let date_text = cell_text(&cells[0]);
        let value_text = cell_text(&cells[1]);
        if date_text.is_empty() || value_text.is_empty() {
            continue;
        }

        if let (Some(date), Ok(value)) = (parse_month(&date_text), value_text.parse::<f64>()) {
            points.push(TimeSeriesPoint::new(date, value));
        }
    }

    Ok(Series::from_unordered(points))
}

fn find_cpi_table<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
    if let Some(table) = document.select(&SUMMARY_TABLE).next() {
        return Some(table);
    }

    document
        .select(&HEADER_CELL)
        .find(|th| th.text().collect::<String>().contains(YOY_HEADER))
        .and_then(|th| {
            th.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "table")
        })
}

/// Parses TCMB's `MM-YYYY` month labels
fn parse_month(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01-{}", text), "%d-%m-%Y").ok()
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    const SUMMARY_PAGE: &str = r#"
        <html><body>
          <table summary="Something else"><tr><td>01-2024</td><td>1.0</td></tr></table>
          <table summary="Consumer Price Index (2003=100) (TURKSTAT)">
            <tr><th>Date</th><th>CPI (Year to Year % Changes)</th><th>CPI (Monthly % Changes)</th></tr>
            <tr><td>03-2024</td><td>68.50</td><td>3.16</td></tr>
            <tr><td>02-2024</td><td>67.07</td><td>4.53</td></tr>
            <tr><td>01-2024</td><td>64.86</td><td>6.70</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_finds_table_by_summary() {
        let series = parse_cpi_table(SUMMARY_PAGE).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.first().unwrap().date, date(2024, 1));
        assert_eq!(series.last().unwrap().date, date(2024, 3));
        assert_eq!(series.values(), vec![64.86, 67.07, 68.50]);
    }

    #[test]
    fn test_parse_falls_back_to_header_text() {
        let html = r#"
            <table class="renamed">
              <thead><tr><th>Month</th><th> CPI (Year to Year % Changes) </th></tr></thead>
              <tbody>
                <tr><td>12-2023</td><td>64.77</td></tr>
                <tr><td>11-2023</td><td>61.98</td></tr>
              </tbody>
            </table>
        "#;

        let series = parse_cpi_table(html).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().date, date(2023, 12));
    }

    #[test]
    fn test_parse_skips_malformed_rows() {
        let html = r#"
            <table summary="Consumer Price Index (2003=100) (TURKSTAT)">
              <tr><td>05-2024</td><td>75.45</td></tr>
              <tr><td></td><td>12.0</td></tr>
              <tr><td>2024/04</td><td>69.80</td></tr>
              <tr><td>04-2024</td><td>n/a</td></tr>
              <tr><td>only one cell</td></tr>
              <tr><td>03-2024</td><td>68.50</td></tr>
            </table>
        "#;

        let series = parse_cpi_table(html).unwrap();
        assert_eq!(series.values(), vec![68.50, 75.45]);
    }

    #[test]
    fn test_parse_missing_table_is_error() {
        let html = "<html><body><p>Maintenance</p></body></html>";
        assert!(matches!(
            parse_cpi_table(html),
            Err(SourceError::TableNotFound)
        ));
    }

    #[test]
    fn test_parse_table_without_rows_is_empty_series() {
        let html = r#"<table summary="Consumer Price Index (2003=100) (TURKSTAT)"><tr><th>Date</th></tr></table>"#;
        let series = parse_cpi_table(html).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_parse_month_formats() {
        assert_eq!(parse_month("07-2021"), Some(date(2021, 7)));
        assert_eq!(parse_month("13-2021"), None);
        assert_eq!(parse_month("July 2021"), None);
    }

    #[test]
    fn test_client_builds_with_timeout() {
        let client = TcmbClient::new(TCMB_CPI_URL, Duration::from_secs(1))
            .expect("Client with timeout and user agent should build");
        assert_eq!(client.url(), TCMB_CPI_URL);
    }
}
