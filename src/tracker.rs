//! Incremental discovery of products published since the previous run.
use crate::config::SeenMode;
use crate::cursor::{self, Cursor};
use crate::dhus::ProductSource;
use crate::error::FetchError;
use crate::state::StateStore;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute and report without touching the stored state.
    pub dry_run: bool,
    /// Overrides the stored cursor.
    pub from: Option<NaiveDate>,
    pub seen_mode: SeenMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub since: String,
    pub fetched: usize,
    pub new_products: Vec<String>,
    pub persisted: bool,
}

pub struct Tracker<S> {
    source: S,
    store: StateStore,
    options: RunOptions,
}

impl<S: ProductSource> Tracker<S> {
    pub fn new(source: S, store: StateStore, options: RunOptions) -> Self {
        Self {
            source,
            store,
            options,
        }
    }

    pub async fn run(&self) -> Result<Report> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<Report> {
        let discovery = self.discover_at(now).await?;
        self.commit(discovery)
    }

    pub async fn discover(&self) -> Result<Discovery> {
        self.discover_at(Utc::now()).await
    }

    /// Fetches and diffs with `now` as the start of the run. Stored state is
    /// only read here; see [`Tracker::commit`].
    pub async fn discover_at(&self, now: DateTime<Utc>) -> Result<Discovery> {
        let since = resolve_since(self.options.from, &self.store, now);
        let next_cursor = Cursor::at(now);

        let fetched = fetch_all_since(&self.source, &since)
            .await
            .context("fetching products")?;
        let seen = self.store.load_seen();
        let new_products = new_products(&fetched, &seen);
        info!("There are {} unprocessed products.", new_products.len());

        Ok(Discovery {
            baseline: next_baseline(self.options.seen_mode, &fetched, &seen),
            next_cursor,
            report: Report {
                since,
                fetched: fetched.len(),
                new_products,
                persisted: false,
            },
        })
    }

    /// Stores the seen-set, then the cursor. The cursor only moves once the
    /// seen-set is on disk. Does nothing on a dry run.
    pub fn commit(&self, discovery: Discovery) -> Result<Report> {
        let mut report = discovery.report;
        if self.options.dry_run {
            debug!("Dry run, stored state left unchanged");
            return Ok(report);
        }
        self.store.store_seen(&discovery.baseline)?;
        self.store.store_cursor(&discovery.next_cursor)?;
        report.persisted = true;
        Ok(report)
    }
}

/// The outcome of a fetch that has not been stored yet.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub report: Report,
    baseline: Vec<String>,
    next_cursor: Cursor,
}

/// The explicit date wins, then a usable stored cursor, then 31 days back.
pub fn resolve_since(from: Option<NaiveDate>, store: &StateStore, now: DateTime<Utc>) -> String {
    if let Some(date) = from {
        return cursor::since_date(date);
    }
    match store.read_cursor() {
        Some(stored) => match stored.since() {
            Some(since) => {
                debug!("Using stored timestamp {since}");
                since
            }
            None => {
                warn!(
                    "Timestamp file exists but is formatted incorrectly: {:?}",
                    stored.as_str()
                );
                cursor::fallback_since(now)
            }
        },
        None => cursor::fallback_since(now),
    }
}

/// Pages through the source until a page comes back more than one row short.
pub async fn fetch_all_since(
    source: &impl ProductSource,
    since: &str,
) -> Result<Vec<String>, FetchError> {
    let mut result: Vec<String> = vec![];
    let mut fetched_count = PAGE_SIZE;

    while fetched_count + 1 >= PAGE_SIZE {
        let page = source.fetch_page(since, result.len(), PAGE_SIZE).await?;
        fetched_count = page.len();
        debug!(skip = result.len(), "Fetched page of {fetched_count} products");
        result.extend(page);
    }
    info!("Fetched {} products.", result.len());
    Ok(result)
}

pub fn new_products(fetched: &[String], seen: &[String]) -> Vec<String> {
    let seen: BTreeSet<&String> = seen.iter().collect();
    fetched
        .iter()
        .filter(|id| !seen.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

fn next_baseline(mode: SeenMode, fetched: &[String], seen: &[String]) -> Vec<String> {
    let baseline: BTreeSet<&String> = match mode {
        SeenMode::Overwrite => fetched.iter().collect(),
        SeenMode::Cumulative => fetched.iter().chain(seen.iter()).collect(),
    };
    baseline.into_iter().cloned().collect()
}
