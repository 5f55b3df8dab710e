//! Shared application state for Axum handlers.
//!
//! Everything a handler touches is explicit process-lifetime state built
//! here and injected through the router: upstream clients, the per-role
//! rate limiters, and the community catalog. Nothing is an ambient global,
//! so tests construct a fresh `AppState` (or the individual pieces) per
//! test.
//!
//! # Structured Concurrency
//!
//! The one background task - a periodic upstream reachability probe - is
//! managed with `tokio_util::task::TaskTracker` and `CancellationToken`.
//! Call `shutdown()` to stop it cleanly before the process exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::fetch::{ResilientClient, RetryPolicy};
use crate::geo::CommunityCatalog;
use crate::ratelimit::RateLimiter;
use crate::services::{CrmClient, MlsClient};

/// The per-role rate limiter registry.
///
/// Each role is a predefined limiter instance keyed by client IP; a role
/// configured to 0 requests per minute carries no limiter and its routes go
/// unthrottled. These are configuration, not separate mechanisms - every
/// role runs the same token bucket.
pub struct RateLimits {
    /// Natural-language search (default: 10/min)
    pub nlp_search: Option<Arc<RateLimiter>>,
    /// Lead submission (default: 5/min)
    pub leads: Option<Arc<RateLimiter>>,
    /// Listing search (default: 60/min)
    pub listing_search: Option<Arc<RateLimiter>>,
    /// Community listing and nearby ranking (default: 30/min)
    pub community_listing: Option<Arc<RateLimiter>>,
}

impl RateLimits {
    /// Build the registry from configured per-minute budgets.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            nlp_search: Self::build(config, config.nlp_search_per_minute)?,
            leads: Self::build(config, config.leads_per_minute)?,
            listing_search: Self::build(config, config.listing_search_per_minute)?,
            community_listing: Self::build(config, config.community_listing_per_minute)?,
        })
    }

    fn build(config: &Config, limit: u32) -> AppResult<Option<Arc<RateLimiter>>> {
        if limit == 0 {
            return Ok(None);
        }

        RateLimiter::new(limit, config.rate_limit_window)
            .map(|limiter| Some(Arc::new(limiter)))
            .map_err(|e| AppError::ConfigError(e.to_string()))
    }
}

/// Shared application state for Axum handlers.
///
/// Cloned per request handler; all internal data is behind `Arc`.
///
/// # Lifecycle
///
/// `new()` spawns the upstream probe task, so it must run inside a tokio
/// runtime. Call `shutdown()` before dropping the last clone:
///
/// ```rust,ignore
/// let state = AppState::new(config, catalog)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// MLS listing-search provider client
    pub mls: MlsClient,
    /// CRM lead-submission client
    pub crm: CrmClient,
    /// Static community catalog
    pub catalog: Arc<CommunityCatalog>,
    /// Per-role rate limiters
    pub limits: Arc<RateLimits>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Timestamp when the application started
    started_at: Instant,
    /// Result of the most recent upstream probe
    upstream_healthy: Arc<AtomicBool>,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create application state and spawn the background probe task.
    pub fn new(config: Config, catalog: CommunityCatalog) -> AppResult<Self> {
        let policy = RetryPolicy::new(
            config.fetch_timeout,
            config.fetch_max_retries,
            config.fetch_retry_base,
        );
        let fetch = ResilientClient::new(policy);

        let mls = MlsClient::new(fetch.clone(), &config.mls_base_url, config.mls_api_key.clone());
        let crm = CrmClient::new(fetch, &config.crm_base_url, config.crm_api_key.clone());
        let limits = Arc::new(RateLimits::from_config(&config)?);

        let state = Self {
            mls,
            crm,
            catalog: Arc::new(catalog),
            limits,
            config: Arc::new(config),
            started_at: Instant::now(),
            upstream_healthy: Arc::new(AtomicBool::new(false)),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_upstream_probe_task();

        Ok(state)
    }

    /// Whether the most recent MLS probe succeeded.
    ///
    /// The flag starts `false` and flips after the first successful probe,
    /// so readiness reflects actual upstream reachability rather than
    /// optimism.
    pub fn is_upstream_healthy(&self) -> bool {
        self.upstream_healthy.load(Ordering::SeqCst)
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Spawn the background upstream reachability probe.
    ///
    /// Only the fields the task needs are cloned in, not the whole state.
    fn spawn_upstream_probe_task(&self) {
        let mls = self.mls.clone();
        let healthy = self.upstream_healthy.clone();
        let probe_interval = self.config.upstream_probe_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            // Initial probe so readiness settles quickly after boot.
            healthy.store(mls.probe().await, Ordering::SeqCst);

            let mut ticker = interval(probe_interval);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased; // Check cancellation first

                    _ = cancel.cancelled() => {
                        debug!("Upstream probe task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let ok = mls.probe().await;
                        let was_ok = healthy.swap(ok, Ordering::SeqCst);
                        if ok && !was_ok {
                            info!("MLS provider is reachable again");
                        } else if !ok && was_ok {
                            warn!("MLS provider probe failed, marking upstream unhealthy");
                        } else {
                            trace!(healthy = ok, "Upstream probe completed");
                        }
                    }
                }
            }

            debug!("Upstream probe task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// Signals cancellation, closes the tracker, and waits for every
    /// spawned task to finish.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }
}
