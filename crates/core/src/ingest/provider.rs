use crate::config::{env_parse, Settings};
use crate::ingest::types::{Fundamentals, PriceBar, PriceSeries};
use crate::time::DateWindow;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CLIENT_USER_AGENT: &str = "Mozilla/5.0 (compatible; stockpick/0.1)";
const FUNDAMENTALS_MODULES: &str = "price,summaryDetail,defaultKeyStatistics";

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily bars covering `window` (inclusive). A symbol with nothing in range may come back
    /// as an empty series or as an error; callers treat both as "no data".
    async fn fetch_daily_prices(&self, ticker: &str, window: DateWindow) -> Result<PriceSeries>;

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals>;
}

/// Price history through `yahoo_finance_api`; fundamentals from the quoteSummary endpoint,
/// which the crate does not cover.
pub struct YahooFinanceProvider {
    connector: yahoo::YahooConnector,
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl YahooFinanceProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = Duration::from_secs(env_parse("MARKET_DATA_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS));

        let connector =
            yahoo::YahooConnector::new().context("failed to build yahoo finance connector")?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            connector,
            http,
            base_url,
            timeout,
        })
    }

    fn quote_summary_url(&self, ticker: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid market data base url {:?}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("market data base url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["v10", "finance", "quoteSummary"])
            .push(ticker.trim());
        url.query_pairs_mut()
            .append_pair("modules", FUNDAMENTALS_MODULES);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_daily_prices(&self, ticker: &str, window: DateWindow) -> Result<PriceSeries> {
        let (start, end) = history_bounds(window)?;

        let response = tokio::time::timeout(
            self.timeout,
            self.connector.get_quote_history(ticker, start, end),
        )
        .await
        .with_context(|| format!("price history for {ticker} timed out"))?
        .with_context(|| format!("price history request failed for {ticker}"))?;

        let quotes = response
            .quotes()
            .with_context(|| format!("no price history for {ticker}"))?;

        let bars = quotes
            .iter()
            .filter_map(|q| {
                session_bar(
                    q.timestamp as i64,
                    [q.open, q.high, q.low, q.close],
                    q.adjclose,
                    q.volume,
                )
            })
            .collect();

        Ok(PriceSeries::new(ticker, bars))
    }

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        let res = self
            .http
            .get(self.quote_summary_url(ticker)?)
            .send()
            .await
            .context("fundamentals request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read fundamentals response")?;
        anyhow::ensure!(
            status.is_success(),
            "fundamentals HTTP {status} for {ticker}: {text}"
        );

        let raw = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("fundamentals response is not valid JSON: {text}"))?;
        parse_quote_summary(&raw)
    }
}

/// Start of the first day and start of the day after the last; the history end is exclusive.
fn history_bounds(window: DateWindow) -> Result<(OffsetDateTime, OffsetDateTime)> {
    let at_midnight = |d: NaiveDate| -> Result<OffsetDateTime> {
        let ts = d.and_time(NaiveTime::MIN).and_utc().timestamp();
        OffsetDateTime::from_unix_timestamp(ts).with_context(|| format!("date out of range: {d}"))
    };
    Ok((
        at_midnight(window.start)?,
        at_midnight(window.end + ChronoDuration::days(1))?,
    ))
}

/// Daily bars are stamped at the session open, whose UTC date is the trading date for the
/// Indian and US exchanges served here. A bar without a usable adjusted close is skipped.
fn session_bar(
    timestamp: i64,
    [open, high, low, close]: [f64; 4],
    adj_close: f64,
    volume: u64,
) -> Option<PriceBar> {
    if !adj_close.is_finite() {
        return None;
    }
    let finite = |v: f64| v.is_finite().then_some(v);

    Some(PriceBar {
        date: DateTime::from_timestamp(timestamp, 0)?.date_naive(),
        open: finite(open),
        high: finite(high),
        low: finite(low),
        close: finite(close),
        adj_close,
        volume: Some(volume),
    })
}

pub(crate) fn parse_quote_summary(raw: &Value) -> Result<Fundamentals> {
    let result = raw
        .pointer("/quoteSummary/result/0")
        .context("quoteSummary response has no result")?;

    // Fields are {"raw": n, "fmt": "..."} objects spread across modules.
    let field = |module: &str, key: &str| -> Option<f64> {
        let v = result.get(module)?.get(key)?;
        v.get("raw").unwrap_or(v).as_f64()
    };

    Ok(Fundamentals {
        market_cap: field("price", "marketCap").or_else(|| field("summaryDetail", "marketCap")),
        trailing_pe: field("summaryDetail", "trailingPE"),
        forward_pe: field("summaryDetail", "forwardPE")
            .or_else(|| field("defaultKeyStatistics", "forwardPE")),
        peg_ratio: field("defaultKeyStatistics", "pegRatio"),
        price_to_book: field("defaultKeyStatistics", "priceToBook"),
        dividend_yield: field("summaryDetail", "dividendYield"),
        fifty_two_week_low: field("summaryDetail", "fiftyTwoWeekLow"),
        fifty_two_week_high: field("summaryDetail", "fiftyTwoWeekHigh"),
    })
}
