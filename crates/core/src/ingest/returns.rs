use crate::ingest::provider::MarketDataProvider;
use crate::ingest::types::{PriceBar, PriceSeries};
use crate::time::DateWindow;
use chrono::NaiveDate;

/// Calendar days fetched on each side of the window so a boundary that falls on a weekend
/// or holiday still has a neighbouring trading day.
pub const BOUNDARY_PADDING_DAYS: i64 = 7;

/// Index of the bar whose date is closest to `target`. On an exact tie between the bar
/// before and the bar after, the earlier bar wins.
pub fn nearest_index(bars: &[PriceBar], target: NaiveDate) -> Option<usize> {
    if bars.is_empty() {
        return None;
    }

    let after = bars.partition_point(|b| b.date < target);
    if after == 0 {
        return Some(0);
    }
    if after == bars.len() {
        return Some(bars.len() - 1);
    }

    let before = after - 1;
    let gap_before = (target - bars[before].date).num_days();
    let gap_after = (bars[after].date - target).num_days();
    if gap_after < gap_before {
        Some(after)
    } else {
        Some(before)
    }
}

/// `P1/P0 - 1` on adjusted closes of the trading days nearest the window boundaries.
pub fn period_return(series: &PriceSeries, window: DateWindow) -> Option<f64> {
    let p0 = series.bars.get(nearest_index(&series.bars, window.start)?)?.adj_close;
    let p1 = series.bars.get(nearest_index(&series.bars, window.end)?)?.adj_close;

    if !(p0.is_finite() && p1.is_finite()) || p0 <= 0.0 {
        return None;
    }
    Some(p1 / p0 - 1.0)
}

/// Total return of `ticker` over `window`. Missing data and provider failures both come back
/// as `None`; the caller skips the ticker.
pub async fn nearest_return(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    window: DateWindow,
) -> Option<f64> {
    let series = match provider
        .fetch_daily_prices(ticker, window.padded(BOUNDARY_PADDING_DAYS))
        .await
    {
        Ok(series) => series,
        Err(err) => {
            tracing::warn!(
                %ticker,
                provider = provider.provider_name(),
                error = %err,
                "price fetch failed; treating ticker as unavailable"
            );
            return None;
        }
    };

    if series.is_empty() {
        tracing::debug!(%ticker, "no price data in range");
        return None;
    }

    period_return(&series, window)
}
