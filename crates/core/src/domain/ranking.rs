use crate::time::DateWindow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerReturn {
    pub ticker: String,
    #[serde(rename = "return")]
    pub ret: f64,
    pub outperformance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub window: DateWindow,
    /// Benchmark return over the same window, if the benchmark had data.
    pub benchmark_return: Option<f64>,
    pub items: Vec<TickerReturn>,
}

impl RankedResult {
    pub fn tickers(&self) -> Vec<String> {
        self.items.iter().map(|i| i.ticker.clone()).collect()
    }
}
