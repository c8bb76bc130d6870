use crate::ingest::provider::MarketDataProvider;
use crate::ingest::returns::nearest_return;
use crate::ingest::types::Fundamentals;
use crate::time::DateWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const NA: &str = "N/A";
const NOTES_LINE: &str = "Notes: add transcript summary and quarterly highlights here.";
const PAGE_BREAK: &str = "\u{000C}";
const PAGE_WIDTH: usize = 90;
const METRIC_COLUMN_WIDTH: usize = 28;

/// Everything a renderer needs to lay out a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub title: String,
    pub subtitle: String,
    pub tickers: Vec<String>,
    pub benchmark: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportRequest {
    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerPage {
    pub ticker: String,
    pub metrics: Vec<MetricRow>,
}

/// A report with all market data resolved; rendering is pure layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub request: ReportRequest,
    pub pages: Vec<TickerPage>,
}

pub trait ReportRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    fn render(&self, report: &Report) -> anyhow::Result<Vec<u8>>;
}

/// One metrics page per ticker in the request, in request order.
pub async fn build_report(provider: &dyn MarketDataProvider, request: ReportRequest) -> Report {
    let window = request.window();

    let mut pages = Vec::with_capacity(request.tickers.len());
    for ticker in &request.tickers {
        pages.push(TickerPage {
            ticker: ticker.clone(),
            metrics: compute_metrics_table(provider, ticker, &request.benchmark, window).await,
        });
    }

    Report { request, pages }
}

/// The per-ticker metrics table: period return, benchmark return, outperformance, then
/// fundamentals. Anything unavailable reads `N/A`.
pub async fn compute_metrics_table(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    benchmark: &str,
    window: DateWindow,
) -> Vec<MetricRow> {
    let ret = nearest_return(provider, ticker, window).await;
    let benchmark_return = nearest_return(provider, benchmark, window).await;
    let fundamentals = fetch_fundamentals_or_default(provider, ticker).await;
    metrics_rows(ret, benchmark_return, &fundamentals)
}

async fn fetch_fundamentals_or_default(
    provider: &dyn MarketDataProvider,
    ticker: &str,
) -> Fundamentals {
    match provider.fetch_fundamentals(ticker).await {
        Ok(f) => f,
        Err(err) => {
            tracing::warn!(%ticker, error = %err, "fundamentals fetch failed; reporting N/A");
            Fundamentals::default()
        }
    }
}

pub fn metrics_rows(
    ret: Option<f64>,
    benchmark_return: Option<f64>,
    f: &Fundamentals,
) -> Vec<MetricRow> {
    let outperformance = match (ret, benchmark_return) {
        (Some(r), Some(b)) => Some(r - b),
        _ => None,
    };

    let row = |metric: &str, value: String| MetricRow {
        metric: metric.to_string(),
        value,
    };

    vec![
        row("Period return", fmt_pct(ret)),
        row("Benchmark return", fmt_pct(benchmark_return)),
        row("Outperformance vs benchmark", fmt_pct(outperformance)),
        row("Market cap", fmt_thousands(f.market_cap)),
        row("Trailing P/E", fmt_float(f.trailing_pe)),
        row("Forward P/E", fmt_float(f.forward_pe)),
        row("PEG ratio", fmt_float(f.peg_ratio)),
        row("Price to book", fmt_float(f.price_to_book)),
        row("Dividend yield", fmt_pct(f.dividend_yield)),
        row(
            "52w range",
            format!(
                "{} to {}",
                fmt_float(f.fifty_two_week_low),
                fmt_float(f.fifty_two_week_high)
            ),
        ),
    ]
}

fn fmt_pct(v: Option<f64>) -> String {
    match v.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => NA.to_string(),
    }
}

fn fmt_float(v: Option<f64>) -> String {
    match v.filter(|v| v.is_finite()) {
        Some(v) => format!("{v:.2}"),
        None => NA.to_string(),
    }
}

fn fmt_thousands(v: Option<f64>) -> String {
    let Some(v) = v.filter(|v| v.is_finite()) else {
        return NA.to_string();
    };

    let rounded = format!("{:.0}", v.abs());
    let mut out = String::with_capacity(rounded.len() + rounded.len() / 3 + 1);
    if v < 0.0 && rounded != "0" {
        out.push('-');
    }
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Paginated plain text: a cover page, then one page per ticker, separated by form feeds.
#[derive(Debug, Clone, Default)]
pub struct TextReportRenderer;

impl ReportRenderer for TextReportRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, report: &Report) -> anyhow::Result<Vec<u8>> {
        let req = &report.request;
        let mut pages = Vec::with_capacity(report.pages.len() + 1);

        let mut cover = String::new();
        push_wrapped(&mut cover, &req.title);
        cover.push_str(&"=".repeat(req.title.chars().count().min(PAGE_WIDTH)));
        cover.push('\n');
        push_wrapped(&mut cover, &req.subtitle);
        cover.push('\n');
        push_wrapped(
            &mut cover,
            &format!(
                "Benchmark {}   Period {} to {}",
                req.benchmark, req.start_date, req.end_date
            ),
        );
        pages.push(cover);

        for page in &report.pages {
            let mut body = String::new();
            push_wrapped(&mut body, &format!("Ticker {}", page.ticker));
            body.push('\n');
            for row in &page.metrics {
                writeln!(
                    body,
                    "{:<width$}{}",
                    row.metric,
                    row.value,
                    width = METRIC_COLUMN_WIDTH
                )?;
            }
            body.push('\n');
            push_wrapped(&mut body, NOTES_LINE);
            pages.push(body);
        }

        Ok(pages.join(PAGE_BREAK).into_bytes())
    }
}

fn push_wrapped(out: &mut String, text: &str) {
    for line in wrap(text, PAGE_WIDTH) {
        out.push_str(&line);
        out.push('\n');
    }
}

/// Greedy word wrap. A single word longer than `width` gets a line of its own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::returns::testing::FakeProvider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn request(tickers: &[&str]) -> ReportRequest {
        ReportRequest {
            title: "India Pharma outperformers vs ^NSEI".to_string(),
            subtitle: "Window 2023-10-01 to 2023-12-31".to_string(),
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            benchmark: "^NSEI".to_string(),
            start_date: d(2023, 10, 1),
            end_date: d(2023, 12, 31),
        }
    }

    fn value<'a>(rows: &'a [MetricRow], metric: &str) -> &'a str {
        rows.iter()
            .find(|r| r.metric == metric)
            .map(|r| r.value.as_str())
            .unwrap()
    }

    #[test]
    fn formats_metrics_like_a_finance_table() {
        let f = Fundamentals {
            market_cap: Some(2_934_567_890_123.4),
            trailing_pe: Some(31.234),
            forward_pe: None,
            peg_ratio: Some(2.0),
            price_to_book: None,
            dividend_yield: Some(0.0055),
            fifty_two_week_low: Some(120.5),
            fifty_two_week_high: None,
        };
        let rows = metrics_rows(Some(0.125), Some(0.05), &f);
        assert_eq!(rows.len(), 10);
        assert_eq!(value(&rows, "Period return"), "12.50%");
        assert_eq!(value(&rows, "Benchmark return"), "5.00%");
        assert_eq!(value(&rows, "Outperformance vs benchmark"), "7.50%");
        assert_eq!(value(&rows, "Market cap"), "2,934,567,890,123");
        assert_eq!(value(&rows, "Trailing P/E"), "31.23");
        assert_eq!(value(&rows, "Forward P/E"), "N/A");
        assert_eq!(value(&rows, "PEG ratio"), "2.00");
        assert_eq!(value(&rows, "Dividend yield"), "0.55%");
        assert_eq!(value(&rows, "52w range"), "120.50 to N/A");
    }

    #[test]
    fn outperformance_needs_both_returns() {
        let rows = metrics_rows(Some(0.1), None, &Fundamentals::default());
        assert_eq!(value(&rows, "Benchmark return"), "N/A");
        assert_eq!(value(&rows, "Outperformance vs benchmark"), "N/A");
        assert_eq!(value(&rows, "52w range"), "N/A to N/A");
    }

    #[test]
    fn thousands_separator_edges() {
        assert_eq!(fmt_thousands(Some(999.4)), "999");
        assert_eq!(fmt_thousands(Some(1000.0)), "1,000");
        assert_eq!(fmt_thousands(Some(-1234567.0)), "-1,234,567");
        assert_eq!(fmt_thousands(Some(f64::NAN)), "N/A");
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("supercalifragilistic x", 5), vec!["supercalifragilistic", "x"]);
    }

    #[tokio::test]
    async fn builds_and_renders_one_page_per_ticker() {
        let req = request(&["SUNPHARMA.NS", "CIPLA.NS"]);
        let window = req.window();
        let provider = FakeProvider::default()
            .with_move("^NSEI", window, 100.0, 110.0)
            .with_move("SUNPHARMA.NS", window, 100.0, 120.0)
            .with_failure("CIPLA.NS");

        let report = build_report(&provider, req).await;
        assert_eq!(report.pages.len(), 2);
        assert_eq!(value(&report.pages[0].metrics, "Period return"), "20.00%");
        assert_eq!(value(&report.pages[0].metrics, "Outperformance vs benchmark"), "10.00%");
        assert_eq!(value(&report.pages[1].metrics, "Period return"), "N/A");
        assert_eq!(value(&report.pages[1].metrics, "Market cap"), "N/A");

        let bytes = TextReportRenderer.render(&report).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let pages: Vec<&str> = text.split(PAGE_BREAK).collect();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].starts_with("India Pharma outperformers vs ^NSEI\n"));
        assert!(pages[0].contains("Benchmark ^NSEI   Period 2023-10-01 to 2023-12-31"));
        assert!(pages[1].starts_with("Ticker SUNPHARMA.NS\n"));
        assert!(pages[1].contains("Period return               20.00%"));
        assert!(pages[2].contains(NOTES_LINE));
    }

    #[tokio::test]
    async fn metrics_table_for_single_ticker() {
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        let provider = FakeProvider::default()
            .with_move("AAPL", window, 100.0, 90.0)
            .with_move("^GSPC", window, 100.0, 110.0);
        let rows = compute_metrics_table(&provider, "AAPL", "^GSPC", window).await;
        assert_eq!(value(&rows, "Period return"), "-10.00%");
        assert_eq!(value(&rows, "Outperformance vs benchmark"), "-20.00%");
    }
}
