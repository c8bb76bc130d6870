use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

pub const DEFAULT_COUNT: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

/// Relative time window named in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPhrase {
    #[default]
    LastQuarter,
    #[serde(rename = "last_3_months")]
    Last3Months,
    LastMonth,
    Ytd,
}

impl PeriodPhrase {
    pub const ALL: [PeriodPhrase; 4] = [
        PeriodPhrase::LastQuarter,
        PeriodPhrase::Last3Months,
        PeriodPhrase::LastMonth,
        PeriodPhrase::Ytd,
    ];

    /// Keyword match over free-form text. The 3-month phrases are checked before the 1-month
    /// phrase; anything unrecognized is `LastQuarter`.
    pub fn from_phrase(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("last 3 months")
            || lower.contains("last three months")
            || lower.contains("last_3_months")
        {
            PeriodPhrase::Last3Months
        } else if lower.contains("last month") || lower.contains("last_month") {
            PeriodPhrase::LastMonth
        } else if lower.contains("ytd") || lower.contains("year to date") {
            PeriodPhrase::Ytd
        } else {
            PeriodPhrase::LastQuarter
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PeriodPhrase::LastQuarter => "last quarter",
            PeriodPhrase::Last3Months => "last 3 months",
            PeriodPhrase::LastMonth => "last month",
            PeriodPhrase::Ytd => "ytd",
        }
    }
}

impl fmt::Display for PeriodPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseId {
    IndiaPharma,
    UsTech,
}

impl UniverseId {
    pub const ALL: [UniverseId; 2] = [UniverseId::IndiaPharma, UniverseId::UsTech];

    pub fn display_name(self) -> &'static str {
        match self {
            UniverseId::IndiaPharma => "India Pharma",
            UniverseId::UsTech => "US Tech",
        }
    }

    pub fn default_benchmark(self) -> &'static str {
        match self {
            UniverseId::IndiaPharma => "^NSEI",
            UniverseId::UsTech => "^GSPC",
        }
    }

    /// File stem of the universe table under `UNIVERSE_DIR`.
    pub fn table_stem(self) -> &'static str {
        match self {
            UniverseId::IndiaPharma => "sectors_india_pharma",
            UniverseId::UsTech => "sectors_us_tech",
        }
    }
}

impl fmt::Display for UniverseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub count: NonZeroUsize,
    pub universe_id: UniverseId,
    pub benchmark: String,
    pub period: PeriodPhrase,
    /// Fraction, e.g. 0.05 for "5%". Only applied when a benchmark return is available.
    pub min_outperformance: Option<f64>,
}

impl StructuredQuery {
    pub fn for_universe(universe_id: UniverseId) -> Self {
        Self {
            count: DEFAULT_COUNT,
            universe_id,
            benchmark: universe_id.default_benchmark().to_string(),
            period: PeriodPhrase::default(),
            min_outperformance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_from_phrase_prefers_three_months() {
        assert_eq!(
            PeriodPhrase::from_phrase("Last 3 months"),
            PeriodPhrase::Last3Months
        );
        assert_eq!(
            PeriodPhrase::from_phrase("over the last three months"),
            PeriodPhrase::Last3Months
        );
        assert_eq!(PeriodPhrase::from_phrase("last month"), PeriodPhrase::LastMonth);
        assert_eq!(PeriodPhrase::from_phrase("YTD"), PeriodPhrase::Ytd);
        assert_eq!(PeriodPhrase::from_phrase("year to date"), PeriodPhrase::Ytd);
    }

    #[test]
    fn period_from_phrase_falls_back_to_last_quarter() {
        assert_eq!(PeriodPhrase::from_phrase("since forever"), PeriodPhrase::LastQuarter);
        assert_eq!(PeriodPhrase::from_phrase(""), PeriodPhrase::LastQuarter);
    }

    #[test]
    fn period_serializes_with_wire_names() {
        let v = serde_json::to_value(PeriodPhrase::Last3Months).unwrap();
        assert_eq!(v, serde_json::json!("last_3_months"));
        let p: PeriodPhrase = serde_json::from_value(serde_json::json!("ytd")).unwrap();
        assert_eq!(p, PeriodPhrase::Ytd);
    }

    #[test]
    fn universe_defaults() {
        let q = StructuredQuery::for_universe(UniverseId::UsTech);
        assert_eq!(q.count.get(), 3);
        assert_eq!(q.benchmark, "^GSPC");
        assert_eq!(q.period, PeriodPhrase::LastQuarter);
        assert!(q.min_outperformance.is_none());
    }
}
