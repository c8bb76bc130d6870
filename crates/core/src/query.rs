//! Free-text request → [`StructuredQuery`].
//!
//! This is a fixed keyword grammar, not a language parser. Anything it does not recognise
//! falls back to the defaults (3 results, India Pharma against `^NSEI`, last quarter, no
//! threshold) instead of failing; phrasing like "top five" or "beat the index by a tenth" is
//! simply not understood.

use crate::domain::query::{PeriodPhrase, StructuredQuery, UniverseId, DEFAULT_COUNT};
use regex::Regex;
use std::num::NonZeroUsize;

// At most two words between the number and the noun ("5 us tech stocks"); a year such as
// "2024" is never a count.
const COUNT_PATTERN: &str = r"\b(\d{1,3})\s+(?:[a-z-]+\s+){0,2}?(?:stocks|companies)\b";
const THRESHOLD_PATTERN: &str = r"\bby\s+(\d+(?:\.\d+)?)\s*%?";

pub fn parse(text: &str) -> StructuredQuery {
    let lower = text.to_lowercase();
    let universe_id = parse_universe(&lower);

    StructuredQuery {
        count: parse_count(&lower).unwrap_or(DEFAULT_COUNT),
        universe_id,
        benchmark: universe_id.default_benchmark().to_string(),
        period: PeriodPhrase::from_phrase(&lower),
        min_outperformance: parse_min_outperformance(&lower),
    }
}

fn parse_count(lower: &str) -> Option<NonZeroUsize> {
    let re = Regex::new(COUNT_PATTERN).ok()?;
    let digits = re.captures(lower)?.get(1)?.as_str();
    // "0 stocks" is not a usable count.
    NonZeroUsize::new(digits.parse::<usize>().ok()?)
}

fn parse_universe(lower: &str) -> UniverseId {
    if lower.contains("pharma") || lower.contains("pharmaceutical") {
        UniverseId::IndiaPharma
    } else if lower.contains("us tech") || lower.contains("tech") {
        UniverseId::UsTech
    } else {
        UniverseId::IndiaPharma
    }
}

fn parse_min_outperformance(lower: &str) -> Option<f64> {
    let re = Regex::new(THRESHOLD_PATTERN).ok()?;
    let pct = re.captures(lower)?.get(1)?.as_str().parse::<f64>().ok()?;
    Some(pct / 100.0)
}
