use crate::config::Settings;
use crate::domain::query::UniverseId;
use anyhow::Context;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

const TICKER_COLUMN: &str = "Ticker";

const INDIA_PHARMA_TICKERS: &[&str] = &[
    "SUNPHARMA.NS",
    "DRREDDY.NS",
    "CIPLA.NS",
    "DIVISLAB.NS",
    "LUPIN.NS",
    "AUROPHARMA.NS",
    "TORNTPHARM.NS",
    "ZYDUSLIFE.NS",
    "ALKEM.NS",
    "BIOCON.NS",
    "GLENMARK.NS",
    "IPCALAB.NS",
];

const US_TECH_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "GOOGL", "META", "AMZN", "AVGO", "ORCL", "CRM", "ADBE", "AMD",
    "INTC", "CSCO", "QCOM",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub id: UniverseId,
    pub name: String,
    pub benchmark: String,
    pub tickers: Vec<String>,
}

impl Universe {
    fn builtin(id: UniverseId) -> Self {
        let tickers = match id {
            UniverseId::IndiaPharma => INDIA_PHARMA_TICKERS,
            UniverseId::UsTech => US_TECH_TICKERS,
        };
        Self::with_tickers(id, tickers.iter().map(|t| t.to_string()).collect())
    }

    fn with_tickers(id: UniverseId, tickers: Vec<String>) -> Self {
        Self {
            id,
            name: id.display_name().to_string(),
            benchmark: id.default_benchmark().to_string(),
            tickers,
        }
    }
}

/// Every configured universe. Built once per process and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseCatalog {
    india_pharma: Universe,
    us_tech: Universe,
}

impl Default for UniverseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl UniverseCatalog {
    pub fn builtin() -> Self {
        Self {
            india_pharma: Universe::builtin(UniverseId::IndiaPharma),
            us_tech: Universe::builtin(UniverseId::UsTech),
        }
    }

    /// Reads `UNIVERSE_DIR` tables when configured, built-in lists otherwise.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        match settings.universe_dir.as_deref() {
            Some(dir) => Self::from_dir(Path::new(dir)),
            None => Ok(Self::builtin()),
        }
    }

    /// Loads `<table_stem>.csv` for each universe from `dir`. A universe without a file keeps
    /// its built-in list; a file that exists but cannot be read is an error.
    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut catalog = Self::builtin();
        for id in UniverseId::ALL {
            let path = dir.join(format!("{}.csv", id.table_stem()));
            if !path.exists() {
                tracing::warn!(universe = %id, path = %path.display(), "universe table missing; using built-in tickers");
                continue;
            }

            let file = std::fs::File::open(&path)
                .with_context(|| format!("failed to open universe table {}", path.display()))?;
            let tickers = read_ticker_table(file)
                .with_context(|| format!("failed to read universe table {}", path.display()))?;
            anyhow::ensure!(
                !tickers.is_empty(),
                "universe table {} has no tickers",
                path.display()
            );

            tracing::info!(universe = %id, tickers = tickers.len(), "loaded universe table");
            *catalog.get_mut(id) = Universe::with_tickers(id, tickers);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: UniverseId) -> &Universe {
        match id {
            UniverseId::IndiaPharma => &self.india_pharma,
            UniverseId::UsTech => &self.us_tech,
        }
    }

    fn get_mut(&mut self, id: UniverseId) -> &mut Universe {
        match id {
            UniverseId::IndiaPharma => &mut self.india_pharma,
            UniverseId::UsTech => &mut self.us_tech,
        }
    }
}

/// The `Ticker` column of a CSV table: blanks dropped, duplicates dropped, first-seen order.
pub fn read_ticker_table<R: Read>(reader: R) -> anyhow::Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("failed to read CSV header")?.clone();
    let col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(TICKER_COLUMN))
        .with_context(|| format!("CSV has no {TICKER_COLUMN} column (headers: {headers:?})"))?;

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.context("malformed CSV record")?;
        let Some(ticker) = record.get(col).map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        if seen.insert(ticker.to_string()) {
            out.push(ticker.to_string());
        }
    }
    Ok(out)
}
