//! Scrape orchestrator - main run logic
//!
//! This module drives a scrape run:
//! - Enumerating listing pages (bounded, or in waves until the listing ends)
//! - Fetching every page of a wave concurrently
//! - Parsing fetched pages concurrently
//! - Gating products through the dedup cache in page order
//! - Downloading images for new or changed products concurrently
//! - Merging all pages into one ordered batch with a run report

use crate::config::Config;
use crate::output::{PageFailure, ScrapeReport};
use crate::pipeline::assets::AssetFetcher;
use crate::pipeline::fetcher::{build_http_client, fetch_page, FetchError, RetryPolicy};
use crate::pipeline::parser::{parse_page, ParsedPage};
use crate::pipeline::{RawPage, Record, ScrapeRequest, ScrapeResult};
use crate::state::{DedupCache, PageOutcome};
use crate::ScrapeError;
use reqwest::Client;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Everything one page contributed to the run
#[derive(Debug)]
struct PageResult {
    page_number: u32,
    outcome: PageOutcome,
    records: Vec<Record>,
    failure: Option<String>,
    candidates: u64,
    skipped: u64,
    unchanged: u64,
    asset_failures: u64,
}

impl PageResult {
    fn failed(err: FetchError) -> Self {
        let outcome = if err.is_not_found() {
            PageOutcome::NotFound
        } else {
            PageOutcome::FetchFailed
        };
        Self {
            page_number: err.page(),
            outcome,
            records: Vec::new(),
            failure: Some(err.to_string()),
            candidates: 0,
            skipped: 0,
            unchanged: 0,
            asset_failures: 0,
        }
    }
}

/// Image still to download for a record of a gated page
#[derive(Debug)]
struct PendingAsset {
    record: usize,
    url: String,
}

/// Main scrape coordinator
///
/// The orchestrator owns the dedup cache; every run started from the same
/// orchestrator shares it, so a product already reported at its current price
/// is not reported (or downloaded) again.
pub struct Orchestrator {
    config: Arc<Config>,
    cache: Arc<DedupCache>,
}

impl Orchestrator {
    /// Creates an orchestrator with an empty dedup cache
    pub fn new(config: Config) -> Self {
        Self::with_cache(config, Arc::new(DedupCache::new()))
    }

    /// Creates an orchestrator around an existing dedup cache
    pub fn with_cache(config: Config, cache: Arc<DedupCache>) -> Self {
        Self {
            config: Arc::new(config),
            cache,
        }
    }

    /// The dedup cache shared by all runs
    pub fn cache(&self) -> &Arc<DedupCache> {
        &self.cache
    }

    /// Runs one scrape
    ///
    /// # Enumeration
    ///
    /// - `max_pages = Some(n)`: pages `1..=n` are fetched once each, all in one wave
    /// - `max_pages = None`: pages are fetched in waves of `pages-per-wave`;
    ///   no further wave starts once a wave contains an empty or missing page,
    ///   or once `page-ceiling` pages have been issued
    ///
    /// Within a wave, products pass the dedup cache in page order, then in
    /// order on the page, so a title listed on several pages is always
    /// attributed to the first of them.
    ///
    /// # Failure Policy
    ///
    /// A page that cannot be fetched contributes no records and is listed in the
    /// report. Dropped items and failed images are counted but never abort the
    /// run. Only an unusable dedup cache, an assets directory that cannot be
    /// created, an invalid proxy, or a crashed task fail the run. The assets
    /// directory is prepared before the first page is requested, so a run
    /// failing on it leaves the dedup cache untouched.
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeResult)` - Records ordered by page, then position on the page
    /// * `Err(ScrapeError)` - Run failed
    pub async fn run(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        if request.max_pages == Some(0) {
            return Err(ScrapeError::InvalidRequest(
                "max_pages must be at least 1".to_string(),
            ));
        }

        let scraper = &self.config.scraper;
        let client = build_http_client(scraper, request.proxy.as_deref())?;

        let assets = if self.config.assets.enabled {
            let assets = AssetFetcher::new(client.clone(), &self.config.assets);
            assets.ensure_directory().await?;
            Some(assets)
        } else {
            None
        };

        let mut report = ScrapeReport::new();
        let mut pages: Vec<PageResult> = Vec::new();

        tracing::info!(
            "Starting scrape of {} ({})",
            scraper.base_url,
            match request.max_pages {
                Some(n) => format!("{} page(s)", n),
                None => format!("until listing ends, at most {} pages", scraper.page_ceiling),
            }
        );

        match request.max_pages {
            Some(max_pages) => {
                let wave = self.run_wave(&client, assets.as_ref(), 1..=max_pages).await?;
                pages.extend(wave);
            }
            None => {
                let per_wave = scraper.pages_per_wave.max(1);
                let ceiling = scraper.page_ceiling.max(1);
                let mut next = 1u32;

                loop {
                    let last = next.saturating_add(per_wave - 1).min(ceiling);
                    let wave = self.run_wave(&client, assets.as_ref(), next..=last).await?;
                    let listing_ended = wave.iter().any(|p| p.outcome.is_end_of_listing());
                    pages.extend(wave);

                    if listing_ended {
                        tracing::debug!("Listing ended within pages {}..={}", next, last);
                        break;
                    }
                    if last >= ceiling {
                        tracing::warn!(
                            "Reached page ceiling ({}) before the listing ended",
                            ceiling
                        );
                        report.stopped_early = true;
                        break;
                    }
                    next = last + 1;
                }
            }
        }

        // past-the-end pages of an open-ended listing answer 404
        let unbounded = request.max_pages.is_none();
        let mut records = Vec::new();
        for page in pages {
            report.pages_requested += 1;
            report.candidates_found += page.candidates;
            report.items_skipped += page.skipped;
            report.records_unchanged += page.unchanged;
            report.asset_failures += page.asset_failures;

            match page.failure {
                Some(_) if unbounded && page.outcome == PageOutcome::NotFound => {
                    report.record_outcome(page.outcome)
                }
                Some(reason) => report.record_failure(PageFailure {
                    page: page.page_number,
                    outcome: page.outcome,
                    reason,
                }),
                None => report.record_outcome(page.outcome),
            }

            records.extend(page.records);
        }
        report.records_emitted = records.len() as u64;
        report.finish();

        if report.pages_failed() > 0 {
            tracing::warn!("Scrape finished with failures: {}", report.failure_summary());
        }
        tracing::info!(
            "Scrape completed: {} new or changed record(s) from {} page(s), {} unchanged",
            report.records_emitted,
            report.pages_requested,
            report.records_unchanged
        );

        Ok(ScrapeResult { records, report })
    }

    /// Runs one wave of pages through every stage
    ///
    /// Each fan-out is fully drained before the next stage starts. The
    /// returned pages are in ascending page order.
    async fn run_wave(
        &self,
        client: &Client,
        assets: Option<&AssetFetcher>,
        range: RangeInclusive<u32>,
    ) -> Result<Vec<PageResult>, ScrapeError> {
        let scraper = &self.config.scraper;
        let policy = RetryPolicy::from_config(scraper);
        let semaphore = Arc::new(Semaphore::new(scraper.max_concurrent_requests.max(1) as usize));
        let base_url: Arc<str> = Arc::from(scraper.base_url.as_str());

        tracing::debug!("Fetching pages {}..={}", range.start(), range.end());

        // Stage 1: fetch fan-out
        let mut fetches = JoinSet::new();
        for page_number in range {
            let client = client.clone();
            let semaphore = Arc::clone(&semaphore);
            let base_url = Arc::clone(&base_url);
            fetches.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                fetch_page(&client, &base_url, page_number, policy).await
            });
        }

        let mut fetched: Vec<RawPage> = Vec::new();
        let mut results: Vec<PageResult> = Vec::new();
        while let Some(task) = fetches.join_next().await {
            match task? {
                Ok(raw) => fetched.push(raw),
                Err(err) => {
                    tracing::warn!("Giving up on {}", err);
                    results.push(PageResult::failed(err));
                }
            }
        }

        // Stage 2: parse fan-out
        let mut parses = JoinSet::new();
        for raw in fetched {
            let symbol = scraper.currency_symbol.clone();
            parses.spawn_blocking(move || parse_page(&raw, &symbol));
        }

        let mut parsed: Vec<ParsedPage> = Vec::new();
        while let Some(task) = parses.join_next().await {
            parsed.push(task?);
        }
        parsed.sort_by_key(|p| p.page_number);

        // Stage 3: dedup in page order
        let mut downloads: Vec<(usize, PendingAsset)> = Vec::new();
        for page in parsed {
            let (result, pending) = gate_page(page, &self.cache, assets.is_some())?;
            let index = results.len();
            downloads.extend(pending.into_iter().map(|asset| (index, asset)));
            results.push(result);
        }

        // Stage 4: image fan-out
        if let Some(assets) = assets {
            fetch_assets(assets, &semaphore, downloads, &mut results).await?;
        }

        results.sort_by_key(|p| p.page_number);
        Ok(results)
    }
}

/// Downloads the images of gated records and attaches their paths
async fn fetch_assets(
    assets: &AssetFetcher,
    semaphore: &Arc<Semaphore>,
    downloads: Vec<(usize, PendingAsset)>,
    results: &mut [PageResult],
) -> Result<(), ScrapeError> {
    let mut tasks = JoinSet::new();
    for (page, pending) in downloads {
        let assets = assets.clone();
        let semaphore = Arc::clone(semaphore);
        let title = results[page].records[pending.record].title.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = assets.fetch_asset(&pending.url, &title).await;
            (page, pending.record, outcome)
        });
    }

    while let Some(task) = tasks.join_next().await {
        let (page, record, outcome) = task?;
        let result = &mut results[page];
        match outcome {
            Ok(path) => result.records[record].asset_path = Some(path),
            Err(e) => {
                tracing::warn!(
                    "Image for '{}' not stored: {}",
                    result.records[record].title,
                    e
                );
                result.asset_failures += 1;
            }
        }
    }

    Ok(())
}

/// Runs one parsed page's candidates through the dedup cache
///
/// Returns the page's new or changed records, without image paths yet, and
/// the images still to download for them.
fn gate_page(
    parsed: ParsedPage,
    cache: &DedupCache,
    with_assets: bool,
) -> Result<(PageResult, Vec<PendingAsset>), ScrapeError> {
    let page_number = parsed.page_number;

    if !parsed.has_listing {
        tracing::debug!("Page {}: no product listing in markup", page_number);
    } else if parsed.candidates.is_empty() && parsed.faults.is_empty() {
        tracing::debug!("Page {}: product listing has no items", page_number);
    }

    if !parsed.faults.is_empty() {
        tracing::info!(
            "Page {}: skipped {} malformed item(s)",
            page_number,
            parsed.faults.len()
        );
    }

    let mut result = PageResult {
        page_number,
        outcome: if parsed.candidates.is_empty() {
            PageOutcome::Empty
        } else {
            PageOutcome::Scraped
        },
        records: Vec::with_capacity(parsed.candidates.len()),
        failure: None,
        candidates: parsed.candidates.len() as u64,
        skipped: parsed.faults.len() as u64,
        unchanged: 0,
        asset_failures: 0,
    };
    let mut pending = Vec::new();

    for candidate in parsed.candidates {
        if !cache.check_and_update(&candidate.title, candidate.price)? {
            result.unchanged += 1;
            continue;
        }

        if let (true, Some(url)) = (with_assets, candidate.image_url) {
            pending.push(PendingAsset {
                record: result.records.len(),
                url,
            });
        }

        result.records.push(Record {
            title: candidate.title,
            price: candidate.price,
            asset_path: None,
        });
    }

    tracing::debug!(
        "Page {}: {} new or changed, {} unchanged",
        page_number,
        result.records.len(),
        result.unchanged
    );

    Ok((result, pending))
}

/// Runs a single scrape with a fresh dedup cache
///
/// # Example
///
/// ```no_run
/// use shop_scraper::config::load_config;
/// use shop_scraper::pipeline::{run_scrape, ScrapeRequest};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("scraper.toml"))?;
/// let result = run_scrape(config, &ScrapeRequest::with_max_pages(2)).await?;
/// println!("{} records", result.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_scrape(
    config: Config,
    request: &ScrapeRequest,
) -> Result<ScrapeResult, ScrapeError> {
    Orchestrator::new(config).run(request).await
}
