use std::time::{Duration, Instant};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigError};
use crate::models::{artifact_name, ChartImage, DateWindow, FetchStats, PriceTable, PublishedArtifact};
use crate::services::chart_service::{self, RenderError};
use crate::services::fetch_service::{self, DailyHistorySource};
use crate::services::publish_service::{self, BlobStore};
use crate::utils::clean_error;

/// Failures with no local recovery; caught at the top of the run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Window(String),
    #[error("Chart rendering failed: {0}")]
    Render(#[from] RenderError),
}

/// Turns the fetched table into an encoded chart
pub type Renderer = fn(&PriceTable) -> Result<ChartImage, RenderError>;

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Required settings missing; nothing was fetched
    ConfigInvalid(String),
    /// No symbol produced data; nothing was rendered or uploaded
    NoData { stats: FetchStats },
    Published {
        artifact: PublishedArtifact,
        stats: FetchStats,
    },
    /// Chart rendered but the upload failed
    PublishFailed { error: String, stats: FetchStats },
    /// Unexpected error anywhere in the run
    Failed(String),
}

impl RunOutcome {
    /// Process exit status.
    ///
    /// 0 all symbols published, 3 published with some symbols missing,
    /// 2 no data, 1 any failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Published { stats, .. } if stats.is_partial() => 3,
            RunOutcome::Published { .. } => 0,
            RunOutcome::NoData { .. } => 2,
            RunOutcome::ConfigInvalid(_)
            | RunOutcome::PublishFailed { .. }
            | RunOutcome::Failed(_) => 1,
        }
    }
}

/// Fetch every symbol in order, pausing `delay` after each request.
///
/// A failing symbol is logged and skipped; it never stops the batch.
pub async fn fetch_all<S>(
    source: &S,
    symbols: &[&str],
    window: &DateWindow,
    delay: Duration,
) -> (PriceTable, FetchStats)
where
    S: DailyHistorySource + ?Sized,
{
    let started = Instant::now();
    let mut table = PriceTable::new();
    let mut stats = FetchStats::new();

    for (idx, symbol) in symbols.iter().enumerate() {
        stats.total += 1;
        tracing::debug!(
            symbol = %symbol,
            progress = format!("{}/{}", idx + 1, symbols.len()),
            "Fetching"
        );

        match fetch_service::fetch_series(source, symbol, window).await {
            Ok(series) if !series.is_empty() => {
                let points = series.len();
                match table.insert(series) {
                    Ok(()) => {
                        stats.success += 1;
                        stats.total_points += points;
                        info!(symbol = %symbol, points, "Fetched data");
                    }
                    Err(e) => warn!(symbol = %symbol, "{}", e),
                }
            }
            Ok(_) => {
                stats.empty += 1;
                warn!(symbol = %symbol, "No data in window");
            }
            Err(e) => {
                stats.errors += 1;
                error!(symbol = %symbol, error = %clean_error(&e.to_string()), "Error fetching data");
            }
        }

        // provider request-rate ceiling
        tokio::time::sleep(delay).await;
    }

    stats.elapsed = started.elapsed();
    (table, stats)
}

/// One run over fixed symbols: fetch, decide, render, publish
pub struct Pipeline<'a, S: ?Sized, B: ?Sized> {
    pub config: &'a Config,
    pub source: &'a S,
    pub store: &'a B,
    pub render: Renderer,
}

impl<'a, S, B> Pipeline<'a, S, B>
where
    S: DailyHistorySource + ?Sized,
    B: BlobStore + ?Sized,
{
    pub fn new(config: &'a Config, source: &'a S, store: &'a B) -> Self {
        Self {
            config,
            source,
            store,
            render: chart_service::render_chart,
        }
    }

    /// Swap the chart renderer
    pub fn with_renderer(mut self, render: Renderer) -> Self {
        self.render = render;
        self
    }

    pub async fn run(&self, symbols: &[&str], today: NaiveDate) -> Result<RunOutcome, PipelineError> {
        let window = DateWindow::trailing_year(today).map_err(PipelineError::Window)?;
        info!(
            symbols = symbols.len(),
            start = %window.start(),
            end = %window.end(),
            "Fetching closing prices"
        );

        let (table, stats) =
            fetch_all(self.source, symbols, &window, self.config.request_delay()).await;
        stats.log_summary();

        if table.is_empty() {
            warn!("No data to plot or upload.");
            return Ok(RunOutcome::NoData { stats });
        }

        let image = (self.render)(&table)?;
        info!(
            series = table.len(),
            symbols = ?table.symbols(),
            bytes = image.len(),
            "Rendered chart"
        );

        let name = artifact_name(window.end());
        match publish_service::publish_chart(self.store, &self.config.bucket, image, &name).await {
            Ok(artifact) => {
                info!(name = %artifact.name, bucket = %artifact.container, "Plot uploaded to S3");
                Ok(RunOutcome::Published { artifact, stats })
            }
            Err(e) => {
                error!(name = %name, error = %e, "Failed to upload to S3");
                Ok(RunOutcome::PublishFailed {
                    error: e.to_string(),
                    stats,
                })
            }
        }
    }
}

/// Validate configuration, connect, and run once.
///
/// `load` runs before `connect`, so a configuration error means no client is
/// built and no request is sent.
pub async fn run_with<L, C, S, B>(load: L, connect: C, symbols: &[&str], today: NaiveDate) -> RunOutcome
where
    L: FnOnce() -> Result<Config, ConfigError>,
    C: FnOnce(&Config) -> (S, B),
    S: DailyHistorySource,
    B: BlobStore,
{
    let config = match load() {
        Ok(config) => config,
        Err(e) => {
            error!("Environment validation error: {}", e);
            return RunOutcome::ConfigInvalid(e.to_string());
        }
    };

    let (source, store) = connect(&config);

    match Pipeline::new(&config, &source, &store).run(symbols, today).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Unexpected error: {}", e);
            RunOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::alphavantage::ApiError;
    use crate::config::{ENV_ACCESS_KEY_ID, ENV_API_KEY, ENV_BUCKET, ENV_SECRET_ACCESS_KEY};
    use crate::services::fetch_service::tests::{points_ending, FakeSource};
    use crate::services::publish_service::tests::MemoryStore;
    use crate::services::publish_service::StoreError;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
    }

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            ENV_API_KEY => Some("demo".to_string()),
            ENV_ACCESS_KEY_ID => Some("AKIA".to_string()),
            ENV_SECRET_ACCESS_KEY => Some("secret".to_string()),
            ENV_BUCKET => Some("charts".to_string()),
            "REQUEST_DELAY_SECS" => Some("0".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_all_isolates_failures() {
        let window = DateWindow::trailing_year(today()).unwrap();
        let source = FakeSource::default()
            .with("AAA", Ok(points_ending(today(), 5)))
            .with("BBB", Err(ApiError::RequestError("connection reset".to_string())))
            .with("CCC", Ok(points_ending(today(), 3)));

        let (table, stats) =
            fetch_all(&source, &["AAA", "BBB", "CCC"], &window, Duration::ZERO).await;

        assert_eq!(table.symbols(), vec!["AAA", "CCC"]);
        assert_eq!(source.calls(), vec!["AAA", "BBB", "CCC"]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_points, 8);
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_one_series_and_one_line() {
        let window = DateWindow::trailing_year(today()).unwrap();
        let source = FakeSource::default()
            .with("AAA", Ok(points_ending(today(), 5)))
            .with("BBB", Err(ApiError::InvalidSymbol("unknown".to_string())));

        let (table, _) = fetch_all(&source, &["AAA", "BBB"], &window, Duration::ZERO).await;
        let plan = chart_service::plan_chart(&table).unwrap();

        assert_eq!(table.symbols(), vec!["AAA"]);
        assert_eq!(plan.series.len(), 1);
        assert_eq!(plan.series[0].points.len(), 5);
        assert_eq!(plan.series[0].annotation.label, "100.00");
    }

    #[tokio::test]
    async fn test_fetch_all_counts_out_of_window_as_empty() {
        let window = DateWindow::trailing_year(today()).unwrap();
        let stale_end = today() - chrono::Duration::days(800);
        let source = FakeSource::default().with("OLD", Ok(points_ending(stale_end, 10)));

        let (table, stats) = fetch_all(&source, &["OLD"], &window, Duration::ZERO).await;

        assert!(table.is_empty());
        assert_eq!(stats.empty, 1);
    }

    #[tokio::test]
    async fn test_all_symbols_fail_skips_render_and_publish() {
        let config = config();
        let source = FakeSource::default()
            .with("AAA", Err(ApiError::InvalidSymbol("bad".to_string())))
            .with("BBB", Err(ApiError::RateLimited("slow".to_string())));
        let store = MemoryStore::default();

        let outcome = Pipeline::new(&config, &source, &store)
            .run(&["AAA", "BBB"], today())
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::NoData { .. }));
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_table_never_reaches_renderer() {
        // render_chart would reject the empty table; the pipeline must stop first
        let config = config();
        let source = FakeSource::default();
        let store = MemoryStore::default();

        let outcome = Pipeline::new(&config, &source, &store)
            .run(&[], today())
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::NoData { .. }));
    }

    #[tokio::test]
    async fn test_missing_credentials_abort_before_fetch() {
        let source_calls = std::sync::Arc::new(std::sync::Mutex::new(0usize));
        let connected = source_calls.clone();

        let outcome = run_with(
            || Config::from_lookup(|key| (key == ENV_API_KEY).then(|| "demo".to_string())),
            move |_| {
                *connected.lock().unwrap() += 1;
                (FakeSource::default(), MemoryStore::default())
            },
            &["AAA"],
            today(),
        )
        .await;

        assert_eq!(*source_calls.lock().unwrap(), 0);
        match &outcome {
            RunOutcome::ConfigInvalid(msg) => {
                assert!(msg.contains("AWS_ACCESS_KEY_ID"));
                assert!(msg.contains("AWS_SECRET_ACCESS_KEY"));
                assert!(msg.contains("S3_BUCKET_NAME"));
            }
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes_distinguish_partial_runs() {
        let artifact = PublishedArtifact {
            container: "charts".to_string(),
            name: "stock_prices_2024-06-14.png".to_string(),
            size: ChartImage::from_png(vec![0; 10]).len(),
        };
        let full = FetchStats {
            total: 2,
            success: 2,
            ..FetchStats::default()
        };
        let partial = FetchStats {
            total: 2,
            success: 1,
            errors: 1,
            ..FetchStats::default()
        };

        let ok = RunOutcome::Published {
            artifact: artifact.clone(),
            stats: full,
        };
        let some_missing = RunOutcome::Published {
            artifact,
            stats: partial.clone(),
        };
        let upload_failed = RunOutcome::PublishFailed {
            error: StoreError::Network("timeout".to_string()).to_string(),
            stats: partial,
        };

        assert_eq!(ok.exit_code(), 0);
        assert_eq!(some_missing.exit_code(), 3);
        assert_eq!(upload_failed.exit_code(), 1);
        assert_eq!(RunOutcome::Failed("boom".to_string()).exit_code(), 1);
    }

    /// Stands in for the raster step: plans the chart, then stores the
    /// plotted symbols as the image bytes.
    fn plan_only_renderer(table: &PriceTable) -> Result<ChartImage, RenderError> {
        let plan = chart_service::plan_chart(table)?;
        let symbols: Vec<_> = plan.series.iter().map(|s| s.symbol.as_str()).collect();
        Ok(ChartImage::from_png(symbols.join(",").into_bytes()))
    }

    fn broken_renderer(_: &PriceTable) -> Result<ChartImage, RenderError> {
        Err(RenderError::Encode("out of memory".to_string()))
    }

    #[tokio::test]
    async fn test_partial_failure_publishes_one_series_chart() {
        let config = config();
        let source = FakeSource::default()
            .with("AAA", Ok(points_ending(today(), 5)))
            .with("BBB", Err(ApiError::InvalidSymbol("unknown".to_string())));
        let store = MemoryStore::default();

        let outcome = Pipeline::new(&config, &source, &store)
            .with_renderer(plan_only_renderer)
            .run(&["AAA", "BBB"], today())
            .await
            .unwrap();

        match &outcome {
            RunOutcome::Published { artifact, stats } => {
                assert_eq!(artifact.name, "stock_prices_2024-06-14.png");
                assert_eq!(artifact.container, "charts");
                assert_eq!(stats.success, 1);
            }
            other => panic!("expected Published, got {:?}", other),
        }
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(store.put_count(), 1);
        let objects = store.objects.lock().unwrap();
        assert_eq!(
            objects.get(&("charts".to_string(), "stock_prices_2024-06-14.png".to_string())),
            Some(&b"AAA".to_vec())
        );
    }

    #[tokio::test]
    async fn test_all_symbols_published_exits_zero() {
        let config = config();
        let source = FakeSource::default()
            .with("AAA", Ok(points_ending(today(), 5)))
            .with("BBB", Ok(points_ending(today(), 2)));
        let store = MemoryStore::default();

        let outcome = Pipeline::new(&config, &source, &store)
            .with_renderer(plan_only_renderer)
            .run(&["AAA", "BBB"], today())
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Published { .. }));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(store.object_names(), vec!["stock_prices_2024-06-14.png"]);
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported_not_raised() {
        let config = config();
        let source = FakeSource::default().with("AAA", Ok(points_ending(today(), 5)));
        let store = MemoryStore::failing(StoreError::Rejected("NoSuchBucket".to_string()));

        let outcome = Pipeline::new(&config, &source, &store)
            .with_renderer(plan_only_renderer)
            .run(&["AAA"], today())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code(), 1);
        match outcome {
            RunOutcome::PublishFailed { error, .. } => {
                assert!(error.contains("stock_prices_2024-06-14.png"));
                assert!(error.contains("charts"));
            }
            other => panic!("expected PublishFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_render_error_is_caught_and_nothing_uploaded() {
        let config = config();
        let source = FakeSource::default().with("AAA", Ok(points_ending(today(), 5)));
        let store = MemoryStore::default();

        let result = Pipeline::new(&config, &source, &store)
            .with_renderer(broken_renderer)
            .run(&["AAA"], today())
            .await;

        assert!(matches!(result, Err(PipelineError::Render(RenderError::Encode(_)))));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_non_finite_price_fails_run_without_drawing() {
        let mut points = points_ending(today(), 5);
        points[0].close = f64::INFINITY;

        let outcome = run_with(
            || Ok(config()),
            move |_| {
                (
                    FakeSource::default().with("AAA", Ok(points)),
                    MemoryStore::default(),
                )
            },
            &["AAA"],
            today(),
        )
        .await;

        match &outcome {
            RunOutcome::Failed(msg) => assert!(msg.contains("non-finite")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(outcome.exit_code(), 1);
    }
}
