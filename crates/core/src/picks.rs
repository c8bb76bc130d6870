use crate::domain::query::{PeriodPhrase, StructuredQuery};
use crate::domain::ranking::RankedResult;
use crate::ingest::provider::MarketDataProvider;
use crate::query;
use crate::rank::{rank, RankError, RankOptions};
use crate::report::ReportRequest;
use crate::time;
use crate::universe::UniverseCatalog;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PicksOutcome {
    pub query: StructuredQuery,
    pub universe: String,
    pub headline: String,
    pub ranked: RankedResult,
    pub report: ReportRequest,
}

/// Free text in, ranked picks plus the matching report request out.
pub async fn run_picks(
    provider: &dyn MarketDataProvider,
    catalog: &UniverseCatalog,
    text: &str,
    today: NaiveDate,
    opts: &RankOptions,
) -> Result<PicksOutcome, RankError> {
    let query = query::parse(text);
    let universe = catalog.get(query.universe_id);

    tracing::info!(
        count = query.count.get(),
        universe = %universe.name,
        benchmark = %query.benchmark,
        period = %query.period,
        min_outperformance = ?query.min_outperformance,
        "interpreted picks request"
    );

    let ranked = rank(provider, &query, &universe.tickers, today, opts).await?;

    let headline = format!(
        "Top {} in {} for {}",
        ranked.items.len(),
        universe.name,
        query.period
    );
    let report = ReportRequest {
        title: format!("{} outperformers vs {}", universe.name, query.benchmark),
        subtitle: format!("Window {} to {}", ranked.window.start, ranked.window.end),
        tickers: ranked.tickers(),
        benchmark: query.benchmark.clone(),
        start_date: ranked.window.start,
        end_date: ranked.window.end,
    };

    Ok(PicksOutcome {
        universe: universe.name.clone(),
        query,
        headline,
        ranked,
        report,
    })
}

/// Report request for a single ticker against a chosen benchmark.
pub fn ticker_report_request(
    ticker: &str,
    period: PeriodPhrase,
    benchmark: &str,
    today: NaiveDate,
) -> ReportRequest {
    let window = time::resolve(period, today);
    ReportRequest {
        title: format!("Report for {ticker}"),
        subtitle: format!("Window {} to {} vs {benchmark}", window.start, window.end),
        tickers: vec![ticker.to_string()],
        benchmark: benchmark.to_string(),
        start_date: window.start,
        end_date: window.end,
    }
}
