use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockpick_core::domain::query::PeriodPhrase;
use stockpick_core::ingest::provider::{MarketDataProvider, YahooFinanceProvider};
use stockpick_core::llm::Summarizer;
use stockpick_core::picks::{run_picks, ticker_report_request, PicksOutcome};
use stockpick_core::rank::{RankError, RankOptions};
use stockpick_core::report::{build_report, ReportRenderer, ReportRequest, TextReportRenderer};
use stockpick_core::time::as_of::resolve_today;
use stockpick_core::universe::UniverseCatalog;

const DEFAULT_SINGLE_TICKER_BENCHMARK: &str = "^NSEI";
const EMPTY_TRANSCRIPT_MESSAGE: &str = "Please paste text or upload a file.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockpick_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let catalog = UniverseCatalog::from_settings(&settings).inspect_err(|e| {
        sentry_anyhow::capture_anyhow(e);
    })?;
    let provider = YahooFinanceProvider::from_settings(&settings)?;
    let summarizer = Summarizer::from_settings(&settings);
    tracing::info!(?summarizer, provider = provider.provider_name(), "collaborators configured");

    let state = AppState {
        provider: Arc::new(provider),
        catalog: Arc::new(catalog),
        summarizer: Arc::new(summarizer),
        renderer: Arc::new(TextReportRenderer),
        rank_opts: RankOptions::from_env(),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/picks", post(post_picks))
        .route("/picks/report", post(post_picks_report))
        .route("/tickers/:ticker/report", get(get_ticker_report))
        .route("/summaries", post(post_summary))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn MarketDataProvider>,
    catalog: Arc<UniverseCatalog>,
    summarizer: Arc<Summarizer>,
    renderer: Arc<dyn ReportRenderer>,
    rank_opts: RankOptions,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl From<RankError> for ApiError {
    fn from(err: RankError) -> Self {
        match err {
            RankError::NoData { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not fetch data: no data available. Try again later.",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct PicksBody {
    query: String,
    #[serde(default)]
    as_of_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerReportParams {
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    benchmark: Option<String>,
    #[serde(default)]
    as_of_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    text: String,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    summary: String,
}

fn today(as_of_date: Option<&str>) -> Result<chrono::NaiveDate, ApiError> {
    resolve_today(as_of_date, chrono::Local::now())
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("{e:#}")))
}

async fn picks(state: &AppState, body: &PicksBody) -> Result<PicksOutcome, ApiError> {
    let today = today(body.as_of_date.as_deref())?;
    Ok(run_picks(
        state.provider.as_ref(),
        &state.catalog,
        &body.query,
        today,
        &state.rank_opts,
    )
    .await?)
}

async fn post_picks(
    State(state): State<AppState>,
    Json(body): Json<PicksBody>,
) -> Result<Json<PicksOutcome>, ApiError> {
    Ok(Json(picks(&state, &body).await?))
}

async fn post_picks_report(
    State(state): State<AppState>,
    Json(body): Json<PicksBody>,
) -> Result<Response, ApiError> {
    let outcome = picks(&state, &body).await?;
    render_attachment(&state, outcome.report, "stock_report").await
}

async fn get_ticker_report(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<TickerReportParams>,
) -> Result<Response, ApiError> {
    let ticker = ticker.trim().to_string();
    if ticker.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "ticker must be non-empty"));
    }

    let today = today(params.as_of_date.as_deref())?;
    let period = params
        .period
        .as_deref()
        .map(PeriodPhrase::from_phrase)
        .unwrap_or_default();
    let benchmark = params
        .benchmark
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_SINGLE_TICKER_BENCHMARK);

    let request = ticker_report_request(&ticker, period, benchmark, today);
    let file_stem = format!("{ticker}_report");
    render_attachment(&state, request, &file_stem).await
}

async fn render_attachment(
    state: &AppState,
    request: ReportRequest,
    file_stem: &str,
) -> Result<Response, ApiError> {
    let report = build_report(state.provider.as_ref(), request).await;
    let bytes = state.renderer.render(&report).map_err(ApiError::internal)?;

    let disposition = format!(
        "attachment; filename=\"{}.{}\"",
        file_stem.replace('"', ""),
        state.renderer.file_extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, state.renderer.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn post_summary(
    State(state): State<AppState>,
    Json(body): Json<SummaryBody>,
) -> Result<Json<SummaryResponse>, ApiError> {
    if body.text.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, EMPTY_TRANSCRIPT_MESSAGE));
    }

    let summary = state.summarizer.summarize(&body.text).await;
    Ok(Json(SummaryResponse { summary }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
