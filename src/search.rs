use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{AppConfig, SearchSettings};
use crate::models::{Listing, SearchConfig, SearchParameters, missing_fields};
use crate::plugins::{NotifyOutcome, PluginManager};
use crate::scraper::{HttpFetcher, ListingExtractor, PageFetcher, build_search_url};
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchState {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SearchOutcome {
    /// Another search held the runner; this request was dropped
    Skipped,
    /// Required parameters absent; no request was made
    MissingParameters(Vec<String>),
    Completed(Vec<Listing>),
}

/// Result of one search-then-notify pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub search: SearchOutcome,
    /// `None` when there was nothing to notify about
    pub notification: Option<NotifyOutcome>,
}

/// Marks the runner busy for as long as it lives.
pub struct SearchGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Runs searches one at a time: a request arriving while another is in
/// flight is dropped, not queued.
pub struct SearchRunner {
    fetcher: Arc<dyn PageFetcher>,
    extractor: ListingExtractor,
    plugins: PluginManager,
    base_url: String,
    required_fields: Vec<String>,
    config_path: PathBuf,
    running: AtomicBool,
}

impl SearchRunner {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: ListingExtractor,
        plugins: PluginManager,
        settings: &SearchSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            plugins,
            base_url: settings.base_url.clone(),
            required_fields: settings.required_fields.clone(),
            config_path: settings.config_path.clone(),
            running: AtomicBool::new(false),
        }
    }

    /// HTTP fetcher, configured selectors and the email/SMS notifiers.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.scraper)?);
        let extractor = ListingExtractor::new(&config.search.selectors)?;
        let plugins = PluginManager::with_default_notifiers(config).await;
        Ok(Self::new(fetcher, extractor, plugins, &config.search))
    }

    pub fn state(&self) -> SearchState {
        if self.running.load(Ordering::Acquire) {
            SearchState::Running
        } else {
            SearchState::Idle
        }
    }

    /// Claims the runner, or `None` when a search is already running.
    pub fn try_begin(&self) -> Option<SearchGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SearchGuard {
                running: &self.running,
            })
    }

    pub async fn run_search(&self, params: &SearchParameters) -> Result<SearchOutcome> {
        let Some(guard) = self.try_begin() else {
            tracing::info!("Waiting for previous search to finish; request dropped");
            return Ok(SearchOutcome::Skipped);
        };
        self.search_claimed(&guard, params).await
    }

    /// The search itself; callers must already hold the runner.
    async fn search_claimed(
        &self,
        _guard: &SearchGuard<'_>,
        params: &SearchParameters,
    ) -> Result<SearchOutcome> {
        let missing = missing_fields(params, &self.required_fields);
        if !missing.is_empty() {
            tracing::warn!("Missing required search parameters: {}", missing.join(", "));
            return Ok(SearchOutcome::MissingParameters(missing));
        }

        let url = build_search_url(&self.base_url, params)?;
        tracing::info!("Running search: {}", url);

        let html = self.fetcher.fetch(&url).await?;
        let listings = self.extractor.extract(&html)?;

        tracing::info!("Scraped {} listings", listings.len());
        Ok(SearchOutcome::Completed(listings))
    }

    /// Reloads the search config, searches, and notifies about any results.
    /// Every result counts as new; nothing is remembered between runs.
    /// The runner is claimed before the config is read, so an overlapping
    /// cycle is skipped even when the file is unreadable.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let Some(guard) = self.try_begin() else {
            tracing::info!("Waiting for previous search to finish; request dropped");
            return Ok(CycleReport {
                search: SearchOutcome::Skipped,
                notification: None,
            });
        };

        let config = SearchConfig::load(&self.config_path)?;
        let search = self.search_claimed(&guard, &config.search_params).await?;

        let notification = match &search {
            SearchOutcome::Completed(listings) if !listings.is_empty() => {
                Some(self.plugins.notify_listings(&config.notifications, listings).await?)
            }
            SearchOutcome::Completed(_) => {
                tracing::info!("No listings found; nothing to notify");
                None
            }
            _ => None,
        };

        Ok(CycleReport { search, notification })
    }
}
