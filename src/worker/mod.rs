//! Offline worker: a cache-first request handler over one versioned cache.
//!
//! The worker pre-caches a fixed manifest on [`install`](OfflineWorker::install),
//! drops older cache generations on [`activate`](OfflineWorker::activate) and
//! then answers requests from the cache, falling back to the network and
//! storing what it fetched.

pub mod cache;
pub mod fetch;
pub mod push;
pub mod request;

use std::fmt;

use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::{Method, Url};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::stats::{CacheStats, CacheStatsTracker};

pub use cache::{CachePredicate, CacheStore, DiskCache, MemoryCache};
pub use fetch::{Fetcher, HttpFetcher, build_http_client};
pub use push::{ClickAction, LogNotifier, Notification, Notifier, PushEvent};
pub use request::{Request, Response, ResponseKind};

/// Manifest entries fetched at once during install.
pub const DEFAULT_INSTALL_CONCURRENCY: usize = 4;

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed and nothing it fetched was kept.
    Redundant,
}

impl WorkerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callbacks for install progress reporting.
pub trait InstallProgress: Send + Sync {
    /// Called when a manifest entry starts downloading.
    fn on_entry_start(&self, _url: &str) {}

    /// Called when a manifest entry was fetched successfully.
    fn on_entry_complete(&self, _url: &str, _bytes: usize) {}

    /// Called when a manifest entry failed.
    fn on_entry_error(&self, _url: &str, _error: &str) {}
}

/// No-op progress implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl InstallProgress for NoProgress {}

/// Where [`OfflineWorker::handle_fetch`] got its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    /// Fetched live; `stored` says whether a copy went into the cache.
    Network { stored: bool },
}

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: FetchSource,
}

/// One stored response, as listed by [`OfflineWorker::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub key: String,
    pub status: u16,
    pub size: usize,
}

/// Snapshot of the cache substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    /// The worker's current cache name.
    pub cache_name: String,
    /// Every cache present, current one included.
    pub caches: Vec<String>,
    /// Entries in the current cache.
    pub entries: Vec<CachedEntry>,
    /// Manifest URLs absent from the current cache.
    pub missing: Vec<String>,
}

impl CacheStatus {
    /// Total body bytes held by the current cache.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size as u64).sum()
    }
}

/// The offline worker.
pub struct OfflineWorker<C: CacheStore = DiskCache, F: Fetcher = HttpFetcher> {
    cache_name: String,
    origin: Url,
    manifest: Vec<Url>,
    page: String,
    icon: String,
    concurrency: usize,
    state: WorkerState,
    cache: C,
    fetcher: F,
    stats: CacheStatsTracker,
}

impl<C: CacheStore, F: Fetcher> OfflineWorker<C, F> {
    /// Creates a worker in the [`WorkerState::Parsed`] state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the origin or a manifest entry does not parse.
    pub fn new(config: &CacheConfig, cache: C, fetcher: F) -> Result<Self> {
        let origin = request::parse_url(&config.origin)?;
        let manifest = config
            .manifest
            .iter()
            .map(|entry| request::resolve(&origin, entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            cache_name: config.cache_name.clone(),
            origin,
            manifest,
            page: config.page.clone(),
            icon: config.icon.clone(),
            concurrency: DEFAULT_INSTALL_CONCURRENCY,
            state: WorkerState::Parsed,
            cache,
            fetcher,
            stats: CacheStatsTracker::new(),
        })
    }

    /// Sets how many manifest entries are fetched at once.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub const fn state(&self) -> WorkerState {
        self.state
    }

    #[must_use]
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolved manifest URLs.
    #[must_use]
    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    #[must_use]
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Current cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    fn expect_state(&self, expected: WorkerState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::WorkerState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    /// Fetches the whole manifest and stores it in the current cache.
    ///
    /// Nothing is written unless every entry came back with a 2xx status,
    /// and a store that fails partway deletes the current cache again.
    /// Returns the number of entries stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerState`] unless the worker is freshly parsed,
    /// [`Error::Install`] if any entry fails, or a cache error if storing
    /// fails. Any failure leaves the worker [`WorkerState::Redundant`].
    pub async fn install(&mut self, progress: &dyn InstallProgress) -> Result<usize> {
        self.expect_state(WorkerState::Parsed)?;
        self.state = WorkerState::Installing;
        log::info!(
            "Installing {} ({} manifest entries)",
            self.cache_name,
            self.manifest.len()
        );

        match self.install_entries(progress).await {
            Ok(count) => {
                self.state = WorkerState::Installed;
                log::info!("Installed {count} entries into {}", self.cache_name);
                Ok(count)
            }
            Err(e) => {
                self.state = WorkerState::Redundant;
                log::error!("Install of {} failed: {e}", self.cache_name);
                Err(e)
            }
        }
    }

    async fn install_entries(&self, progress: &dyn InstallProgress) -> Result<usize> {
        self.cache.open(&self.cache_name).await?;

        let fetched: Vec<(Request, Response)> = stream::iter(&self.manifest)
            .map(|url| async move {
                let request = Request::get(url.clone());
                progress.on_entry_start(url.as_str());
                let result = match self.fetcher.fetch(&request).await {
                    Ok(response) if response.is_ok() => Ok(response),
                    Ok(response) => Err(Error::Install {
                        url: url.to_string(),
                        reason: format!("HTTP {}", response.status),
                    }),
                    Err(e) => Err(Error::Install {
                        url: url.to_string(),
                        reason: e.to_string(),
                    }),
                };
                match result {
                    Ok(response) => {
                        progress.on_entry_complete(url.as_str(), response.body.len());
                        Ok((request, response))
                    }
                    Err(e) => {
                        progress.on_entry_error(url.as_str(), &e.to_string());
                        Err(e)
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        for (request, response) in &fetched {
            if let Err(e) = self
                .cache
                .put(&self.cache_name, request.cache_key(), response)
                .await
            {
                self.discard_current_cache().await;
                return Err(e);
            }
        }
        Ok(fetched.len())
    }

    /// Drops whatever a failed install managed to write.
    async fn discard_current_cache(&self) {
        let current = self.cache_name.as_str();
        if let Err(e) = self.cache.delete_all(&|name: &str| name == current).await {
            log::warn!("Could not discard partial cache {current}: {e}");
        }
    }

    /// Marks an already populated cache as installed without refetching.
    ///
    /// Returns `true` if every manifest entry was present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerState`] unless the worker is freshly parsed, or
    /// a cache error if the cache cannot be read.
    pub async fn restore(&mut self) -> Result<bool> {
        self.expect_state(WorkerState::Parsed)?;
        let missing = self.missing_entries().await?;
        if missing.is_empty() {
            self.state = WorkerState::Installed;
            log::info!("Restored installed cache {}", self.cache_name);
            Ok(true)
        } else {
            log::debug!("Cannot restore {}: {} entries missing", self.cache_name, missing.len());
            Ok(false)
        }
    }

    /// Deletes every cache other than the current one, returning their names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerState`] unless the worker is installed, or a
    /// cache error if deletion fails.
    pub async fn activate(&mut self) -> Result<Vec<String>> {
        self.expect_state(WorkerState::Installed)?;
        self.state = WorkerState::Activating;

        let current = self.cache_name.clone();
        let deleted = match self.cache.delete_all(&|name: &str| name != current).await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.state = WorkerState::Installed;
                return Err(e);
            }
        };

        for name in &deleted {
            log::info!("Deleted stale cache {name}");
        }
        self.state = WorkerState::Activated;
        log::info!("Activated {}", self.cache_name);
        Ok(deleted)
    }

    /// Answers a request cache-first.
    ///
    /// A cache hit is returned unchanged. On a miss the request goes to the
    /// network; `GET` responses with status 200 from the worker's own origin
    /// are copied into the cache. Failing to store a copy is logged and does
    /// not affect the returned response.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error if the request misses the cache and the
    /// network fails.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
        let cacheable_method = request.method() == Method::GET;

        if cacheable_method {
            match self.cache.get(&self.cache_name, request.cache_key()).await {
                Ok(Some(response)) => {
                    self.stats.record_hit();
                    log::debug!("Cache hit: {}", request.url());
                    return Ok(FetchOutcome {
                        response,
                        source: FetchSource::Cache,
                    });
                }
                Ok(None) => {}
                Err(e) => log::warn!("Cache lookup failed for {}: {e}", request.url()),
            }
        }

        self.stats.record_miss();
        log::debug!("Cache miss: {} {}", request.method(), request.url());
        let response = self.fetcher.fetch(request).await?;

        let mut stored = false;
        if cacheable_method && response.is_cacheable() {
            match self
                .cache
                .put(&self.cache_name, request.cache_key(), &response)
                .await
            {
                Ok(()) => stored = true,
                Err(e) => log::warn!("Skipping cache write for {}: {e}", request.url()),
            }
        }
        if stored {
            self.stats.record_stored();
        } else {
            self.stats.record_passthrough();
        }

        Ok(FetchOutcome {
            response,
            source: FetchSource::Network { stored },
        })
    }

    /// Renders and shows the notification for a push message.
    ///
    /// # Errors
    ///
    /// Returns the notifier's error if the notification cannot be shown.
    pub fn handle_push(&self, event: &PushEvent, notifier: &dyn Notifier) -> Result<Notification> {
        let notification = Notification::render(event, &self.icon, Utc::now());
        notifier.show(&notification)?;
        Ok(notification)
    }

    /// Resolves a click on a notification action.
    #[must_use]
    pub fn handle_notification_click(&self, action: &str) -> ClickAction {
        ClickAction::for_action(action, &self.page)
    }

    async fn missing_entries(&self) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for url in &self.manifest {
            let key = Request::get(url.clone());
            if !self.cache.has(&self.cache_name, key.cache_key()).await {
                missing.push(url.to_string());
            }
        }
        Ok(missing)
    }

    /// Lists caches and the current cache's contents.
    ///
    /// # Errors
    ///
    /// Returns a cache error if the substrate cannot be read.
    pub async fn status(&self) -> Result<CacheStatus> {
        let caches = self.cache.cache_names().await?;
        let mut entries = Vec::new();
        for key in self.cache.keys(&self.cache_name).await? {
            if let Some(response) = self.cache.get(&self.cache_name, &key).await? {
                entries.push(CachedEntry {
                    key,
                    status: response.status,
                    size: response.body.len(),
                });
            }
        }
        Ok(CacheStatus {
            cache_name: self.cache_name.clone(),
            caches,
            entries,
            missing: self.missing_entries().await?,
        })
    }
}
