use crate::config::env_parse;
use crate::domain::query::StructuredQuery;
use crate::domain::ranking::{RankedResult, TickerReturn};
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::returns::nearest_return;
use crate::time;
use chrono::NaiveDate;
use futures::StreamExt;
use std::cmp::Ordering;
use std::fmt;

const DEFAULT_FETCH_CONCURRENCY: usize = 4;
// Outperformance is a difference of two computed returns; a ticker exactly at the threshold
// can land a few ulps under it.
const THRESHOLD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct RankOptions {
    /// Maximum in-flight per-ticker fetches.
    pub concurrency: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl RankOptions {
    pub fn from_env() -> Self {
        Self {
            concurrency: env_parse("FETCH_CONCURRENCY", DEFAULT_FETCH_CONCURRENCY).max(1),
        }
    }
}

/// Every ticker in the universe came back without data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    NoData { universe_size: usize },
}

impl fmt::Display for RankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankError::NoData { universe_size } => write!(
                f,
                "no data available for any of the {universe_size} tickers in the universe"
            ),
        }
    }
}

impl std::error::Error for RankError {}

/// Resolves the query window, fetches the benchmark and every ticker, and returns the top
/// `query.count` rows. A ticker without data is dropped; if every ticker is dropped the
/// result is [`RankError::NoData`].
pub async fn rank(
    provider: &dyn MarketDataProvider,
    query: &StructuredQuery,
    tickers: &[String],
    today: NaiveDate,
    opts: &RankOptions,
) -> Result<RankedResult, RankError> {
    let window = time::resolve(query.period, today);

    let ticker_returns = futures::stream::iter(tickers.iter().cloned())
        .map(|ticker| async move {
            let r = nearest_return(provider, &ticker, window).await;
            (ticker, r)
        })
        .buffered(opts.concurrency.max(1))
        .collect::<Vec<_>>();

    let (benchmark_return, fetched) = tokio::join!(
        nearest_return(provider, &query.benchmark, window),
        ticker_returns
    );

    let available: Vec<(String, f64)> = fetched
        .into_iter()
        .filter_map(|(ticker, r)| r.map(|r| (ticker, r)))
        .collect();

    tracing::info!(
        universe = %query.universe_id,
        period = %query.period,
        start = %window.start,
        end = %window.end,
        requested = tickers.len(),
        available = available.len(),
        benchmark = %query.benchmark,
        benchmark_available = benchmark_return.is_some(),
        "ranking inputs fetched"
    );

    if available.is_empty() {
        return Err(RankError::NoData {
            universe_size: tickers.len(),
        });
    }

    Ok(RankedResult {
        window,
        benchmark_return,
        items: order_results(available, benchmark_return, query),
    })
}

/// Filter, sort and truncate already-fetched returns.
///
/// With a benchmark: outperformance descending, `min_outperformance` applied inclusively.
/// Without one: raw return *ascending*. The two directions differ on purpose; the
/// no-benchmark branch has always sorted this way and is kept until someone decides
/// otherwise. Equal keys are ordered by ticker symbol.
pub fn order_results(
    returns: Vec<(String, f64)>,
    benchmark_return: Option<f64>,
    query: &StructuredQuery,
) -> Vec<TickerReturn> {
    let mut rows: Vec<TickerReturn> = returns
        .into_iter()
        .map(|(ticker, ret)| TickerReturn {
            ticker,
            ret,
            outperformance: benchmark_return.map(|b| ret - b),
        })
        .collect();

    match benchmark_return {
        Some(_) => {
            if let Some(min) = query.min_outperformance {
                rows.retain(|r| r.outperformance.is_some_and(|o| o >= min - THRESHOLD_EPSILON));
            }
            rows.sort_by(|a, b| {
                cmp_f64(b.outperformance, a.outperformance).then_with(|| a.ticker.cmp(&b.ticker))
            });
        }
        None => {
            rows.sort_by(|a, b| {
                a.ret
                    .total_cmp(&b.ret)
                    .then_with(|| a.ticker.cmp(&b.ticker))
            });
        }
    }

    rows.truncate(query.count.get());
    rows
}

fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}
