use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockpick_core::domain::query::PeriodPhrase;
use stockpick_core::domain::ranking::RankedResult;
use stockpick_core::ingest::provider::YahooFinanceProvider;
use stockpick_core::llm::Summarizer;
use stockpick_core::picks::{run_picks, ticker_report_request};
use stockpick_core::rank::RankOptions;
use stockpick_core::report::{build_report, ReportRenderer, ReportRequest, TextReportRenderer};
use stockpick_core::time::as_of::resolve_today;
use stockpick_core::universe::UniverseCatalog;

#[derive(Debug, Parser)]
#[command(name = "stockpick")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rank a universe from a free-text request, e.g. "3 pharma stocks that beat NIFTY".
    Picks {
        query: String,

        /// Anchor date for the window (YYYY-MM-DD). Defaults to today's local date.
        #[arg(long)]
        as_of_date: Option<String>,

        /// Also write the report for the picked tickers here.
        #[arg(long)]
        report_out: Option<PathBuf>,
    },

    /// Write a one-ticker report against a benchmark.
    Report {
        #[arg(long)]
        ticker: String,

        /// last quarter | last 3 months | last month | ytd
        #[arg(long, default_value = "last quarter")]
        period: String,

        #[arg(long, default_value = "^NSEI")]
        benchmark: String,

        #[arg(long)]
        as_of_date: Option<String>,

        #[arg(long)]
        out: PathBuf,
    },

    /// Summarize an earnings-call transcript from a file or stdin.
    Summarize {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockpick_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(args.command, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "stockpick run failed");
    }
    result
}

async fn run(command: Command, settings: &stockpick_core::config::Settings) -> anyhow::Result<()> {
    match command {
        Command::Picks {
            query,
            as_of_date,
            report_out,
        } => {
            let today = resolve_today(as_of_date.as_deref(), chrono::Local::now())?;
            let catalog = UniverseCatalog::from_settings(settings)?;
            let provider = YahooFinanceProvider::from_settings(settings)?;

            let outcome = run_picks(
                &provider,
                &catalog,
                &query,
                today,
                &RankOptions::from_env(),
            )
            .await
            .context("Could not fetch data. Try again later.")?;

            println!("{}", outcome.headline);
            print!("{}", picks_table(&outcome.ranked));

            if let Some(path) = report_out {
                write_report(&provider, outcome.report, &path).await?;
            }
        }
        Command::Report {
            ticker,
            period,
            benchmark,
            as_of_date,
            out,
        } => {
            let ticker = ticker.trim();
            anyhow::ensure!(!ticker.is_empty(), "--ticker must be non-empty");

            let today = resolve_today(as_of_date.as_deref(), chrono::Local::now())?;
            let provider = YahooFinanceProvider::from_settings(settings)?;
            let request =
                ticker_report_request(ticker, PeriodPhrase::from_phrase(&period), &benchmark, today);
            write_report(&provider, request, &out).await?;
        }
        Command::Summarize { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read transcript from stdin")?;
                    buf
                }
            };
            anyhow::ensure!(!text.trim().is_empty(), "Please paste text or upload a file.");

            let summarizer = Summarizer::from_settings(settings);
            tracing::info!(?summarizer, chars = text.chars().count(), "summarizing transcript");
            println!("{}", summarizer.summarize(&text).await);
        }
    }

    Ok(())
}

async fn write_report(
    provider: &YahooFinanceProvider,
    request: ReportRequest,
    path: &Path,
) -> anyhow::Result<()> {
    let renderer = TextReportRenderer;
    let report = build_report(provider, request).await;
    let bytes = renderer.render(&report)?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), pages = report.pages.len() + 1, "report written");
    Ok(())
}

fn picks_table(ranked: &RankedResult) -> String {
    let mut out = String::new();
    match ranked.benchmark_return {
        Some(b) => out.push_str(&format!("Benchmark return {}\n", pct(b))),
        None => out.push_str("Benchmark return N/A\n"),
    }
    out.push_str(&format!("{:<16}{:>10}{:>16}\n", "Ticker", "Return", "Outperformance"));
    for item in &ranked.items {
        out.push_str(&format!(
            "{:<16}{:>10}{:>16}\n",
            item.ticker,
            pct(item.ret),
            item.outperformance.map(pct).unwrap_or_else(|| "N/A".to_string())
        ));
    }
    out
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn init_sentry(settings: &stockpick_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stockpick_core::domain::ranking::TickerReturn;
    use stockpick_core::time::DateWindow;

    #[test]
    fn parses_picks_subcommand() {
        let args = Args::try_parse_from([
            "stockpick",
            "picks",
            "3 pharma stocks that beat NIFTY",
            "--as-of-date",
            "2024-02-15",
        ])
        .unwrap();
        match args.command {
            Command::Picks {
                query,
                as_of_date,
                report_out,
            } => {
                assert_eq!(query, "3 pharma stocks that beat NIFTY");
                assert_eq!(as_of_date.as_deref(), Some("2024-02-15"));
                assert!(report_out.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn report_requires_out_and_defaults_period() {
        assert!(Args::try_parse_from(["stockpick", "report", "--ticker", "CIPLA.NS"]).is_err());

        let args = Args::try_parse_from([
            "stockpick", "report", "--ticker", "CIPLA.NS", "--out", "r.txt",
        ])
        .unwrap();
        match args.command {
            Command::Report {
                period, benchmark, ..
            } => {
                assert_eq!(PeriodPhrase::from_phrase(&period), PeriodPhrase::LastQuarter);
                assert_eq!(benchmark, "^NSEI");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn formats_picks_table() {
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2023, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
        .unwrap();
        let ranked = RankedResult {
            window,
            benchmark_return: Some(0.05),
            items: vec![TickerReturn {
                ticker: "LUPIN.NS".to_string(),
                ret: 0.4,
                outperformance: Some(0.35),
            }],
        };
        let table = picks_table(&ranked);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Benchmark return 5.00%");
        assert!(lines[2].starts_with("LUPIN.NS"));
        assert!(lines[2].ends_with("40.00%          35.00%"));
    }
}
