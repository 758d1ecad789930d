//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Initializing storage and the run record
//! - Seeding the request queue
//! - Dispatching fetches concurrently within the scheduler's limits
//! - Retrying failed requests and recording every request's final state

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchResult};
use crate::crawler::request::CrawlRequest;
use crate::crawler::routes::{route, CrawlContext};
use crate::crawler::scheduler::{RequestQueue, ScheduledRequest, Scheduler};
use crate::dedup::DedupTracker;
use crate::extract::SiteSelectors;
use crate::images::ImageFetcher;
use crate::state::RequestState;
use crate::storage::{SqliteStorage, Storage};
use crate::url::parse_http_url;
use crate::{HarvestError, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::{Id, JoinError, JoinSet};

/// Summary of a finished crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub run_id: i64,
    /// Requests whose handler completed
    pub handled: u64,
    /// Requests given up after their retries
    pub failed: u64,
    /// Requests left in the queue when the request ceiling was reached
    pub skipped: u64,
}

/// What happened to one dispatched request
#[derive(Debug)]
struct RequestReport {
    request: CrawlRequest,
    failure: Option<Failure>,
}

#[derive(Debug)]
struct Failure {
    message: String,
    retryable: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    client: Client,
    scheduler: Scheduler,
    max_retries: u32,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the database, creates a new run and seeds the queue with the
    /// configured start URLs.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to initialize
    pub fn new(config: &Config, config_hash: &str) -> Result<Self> {
        let storage_path = Path::new(&config.output.database_path);
        let mut storage = SqliteStorage::new(storage_path)?;
        let run_id = storage.create_run(config_hash)?;
        tracing::info!("Starting crawl run {}", run_id);

        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;

        let queue = RequestQueue::new();
        for start_url in &config.crawler.start_urls {
            let url = parse_http_url(start_url)?;
            queue.add_request(CrawlRequest::new(url));
        }
        tracing::info!("Seeded queue with {} start URLs", queue.pending_count());

        let ctx = CrawlContext {
            run_id,
            origin: parse_http_url(&config.site.origin)?,
            selectors: SiteSelectors::compile(&config.selectors)?,
            images_dir: PathBuf::from(&config.output.images_dir),
            image_fetcher: ImageFetcher::new(client.clone()),
            queue: queue.clone(),
            dedup: Arc::new(DedupTracker::new()),
            storage: Arc::new(Mutex::new(storage)),
        };

        let scheduler = Scheduler::new(
            queue,
            config.crawler.max_concurrency,
            config.crawler.max_requests_per_crawl,
        );

        Ok(Self {
            ctx: Arc::new(ctx),
            client,
            scheduler,
            max_retries: config.crawler.max_request_retries,
        })
    }

    /// ID of the run this coordinator records into
    pub fn run_id(&self) -> i64 {
        self.ctx.run_id
    }

    /// Runs the main crawl loop
    ///
    /// The loop refills in-flight tasks while the scheduler allows, then
    /// waits for one to finish. It ends once nothing is in flight and the
    /// scheduler has nothing more to hand out: either the queue is empty or
    /// the request ceiling was reached.
    pub async fn run(&mut self) -> Result<CrawlOutcome> {
        let start_time = Instant::now();
        let mut tasks: JoinSet<RequestReport> = JoinSet::new();
        let mut running: HashMap<Id, CrawlRequest> = HashMap::new();
        let mut handled = 0u64;
        let mut failed = 0u64;

        loop {
            while let Some(scheduled) = self.scheduler.next_request() {
                self.dispatch(&mut tasks, &mut running, scheduled)?;
            }

            let report = match tasks.join_next_with_id().await {
                Some(Ok((id, report))) => {
                    running.remove(&id);
                    report
                }
                Some(Err(e)) => {
                    failed += 1;
                    self.record_task_error(&mut running, e)?;
                    continue;
                }
                None => break,
            };

            match report.failure {
                None => {
                    handled += 1;
                    self.record(&report.request, RequestState::Handled, None)?;
                }
                Some(failure)
                    if failure.retryable && report.request.retry_count < self.max_retries =>
                {
                    let mut request = report.request;
                    request.retry_count += 1;
                    tracing::warn!(
                        "Retrying {} ({}/{}): {}",
                        request.url,
                        request.retry_count,
                        self.max_retries,
                        failure.message
                    );
                    self.scheduler.queue().reclaim(request);
                    continue;
                }
                Some(failure) => {
                    failed += 1;
                    tracing::error!(
                        "Request {} failed: {}",
                        report.request.url,
                        failure.message
                    );
                    self.record(
                        &report.request,
                        RequestState::Failed,
                        Some(&failure.message),
                    )?;
                }
            }

            let processed = handled + failed;
            if processed % 10 == 0 {
                tracing::info!(
                    "Progress: {} handled, {} failed, {} queued, {:.2} requests/sec",
                    handled,
                    failed,
                    self.scheduler.queue().pending_count(),
                    processed as f64 / start_time.elapsed().as_secs_f64()
                );
            }
        }

        let leftover = self.scheduler.queue().drain();
        if !leftover.is_empty() {
            tracing::info!(
                "Request limit of {} reached, skipping {} queued requests",
                self.scheduler.dispatched(),
                leftover.len()
            );
        }
        for request in &leftover {
            self.record(request, RequestState::Skipped, None)?;
        }

        self.ctx.with_storage(|storage| storage.complete_run(self.ctx.run_id))?;

        tracing::info!(
            "Crawl completed: {} handled, {} failed in {:?}",
            handled,
            failed,
            start_time.elapsed()
        );

        Ok(CrawlOutcome {
            run_id: self.ctx.run_id,
            handled,
            failed,
            skipped: leftover.len() as u64,
        })
    }

    fn dispatch(
        &self,
        tasks: &mut JoinSet<RequestReport>,
        running: &mut HashMap<Id, CrawlRequest>,
        scheduled: ScheduledRequest,
    ) -> Result<()> {
        let ScheduledRequest { request, permit } = scheduled;
        tracing::debug!("Processing URL: {}", request.url);
        self.record(&request, RequestState::InProgress, None)?;

        let ctx = Arc::clone(&self.ctx);
        let client = self.client.clone();
        let task_request = request.clone();
        let handle = tasks.spawn(async move {
            let failure = process_request(&ctx, &client, &task_request).await;
            drop(permit);
            RequestReport {
                request: task_request,
                failure,
            }
        });
        running.insert(handle.id(), request);

        Ok(())
    }

    /// Marks the request of a panicked or cancelled task as failed
    fn record_task_error(
        &self,
        running: &mut HashMap<Id, CrawlRequest>,
        error: JoinError,
    ) -> Result<()> {
        let Some(request) = running.remove(&error.id()) else {
            tracing::error!("Request task failed: {}", error);
            return Ok(());
        };

        let message = format!("Request task failed: {}", error);
        tracing::error!("{} ({})", message, request.url);
        self.record(&request, RequestState::Failed, Some(&message))
    }

    fn record(
        &self,
        request: &CrawlRequest,
        state: RequestState,
        error_message: Option<&str>,
    ) -> Result<()> {
        let record = request.to_record(state, error_message);
        self.ctx
            .with_storage(|storage| storage.record_request(self.ctx.run_id, &record))
    }
}

/// Fetches one request and hands the page to its handler
async fn process_request(
    ctx: &CrawlContext,
    client: &Client,
    request: &CrawlRequest,
) -> Option<Failure> {
    let body = match fetch_page(client, request.url.as_str()).await {
        FetchResult::Success {
            final_url, body, ..
        } => {
            if final_url != request.url.as_str() {
                tracing::debug!("{} redirected to {}", request.url, final_url);
            }
            body
        }
        failed => {
            let (message, retryable) = failed.failure().unwrap_or_default();
            return Some(Failure { message, retryable });
        }
    };

    match route(ctx, request, &body).await {
        Ok(()) => {
            tracing::debug!("Handled {}", request.url);
            None
        }
        Err(e) => Some(Failure {
            retryable: is_retryable_handler_error(&e),
            message: e.to_string(),
        }),
    }
}

fn is_retryable_handler_error(error: &HarvestError) -> bool {
    matches!(
        error,
        HarvestError::StorageError(_) | HarvestError::Database(_)
    )
}

/// Runs the main crawl operation
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - Crawl completed; the run is marked completed
/// * `Err(HarvestError)` - Crawl failed with an error
///
/// # Example
///
/// ```no_run
/// use irbis_harvest::config::load_config_with_hash;
/// use irbis_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let outcome = run_crawl(&config, &hash).await?;
/// println!("run {} handled {} pages", outcome.run_id, outcome.handled);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, config_hash: &str) -> Result<CrawlOutcome> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run().await
}
