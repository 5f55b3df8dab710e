//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Upstream Providers
//!
//! - `MLS_BASE_URL`: Base URL of the MLS listing-search provider
//! - `MLS_API_KEY`: Optional bearer token for the MLS provider
//! - `CRM_BASE_URL`: Base URL of the CRM lead-submission endpoint
//! - `CRM_API_KEY`: Optional bearer token for the CRM
//!
//! # Resilience Tuning
//!
//! - `FETCH_TIMEOUT_MS`: Per-attempt deadline for outbound calls (default: 10000)
//! - `FETCH_MAX_RETRIES`: Retries after the first attempt (default: 2)
//! - `FETCH_RETRY_BASE_MS`: Base delay for exponential backoff (default: 500)
//!
//! # Rate Limiting
//!
//! Per-role requests-per-minute budgets, each keyed by client IP.
//! Set any of them to 0 to disable that role's limiter.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Upstream Provider Configuration
    // =========================================================================
    /// Base URL of the MLS listing-search provider
    pub mls_base_url: String,

    /// Optional bearer token for the MLS provider
    pub mls_api_key: Option<String>,

    /// Base URL of the CRM lead-submission service
    pub crm_base_url: String,

    /// Optional bearer token for the CRM
    pub crm_api_key: Option<String>,

    // =========================================================================
    // Resilient Fetch Configuration
    // =========================================================================
    /// Per-attempt deadline for outbound HTTP calls (default: 10 seconds)
    pub fetch_timeout: Duration,

    /// Number of retries after the first attempt (default: 2)
    pub fetch_max_retries: u32,

    /// Base delay for exponential backoff between attempts (default: 500ms)
    pub fetch_retry_base: Duration,

    /// Interval for the background upstream reachability probe
    pub upstream_probe_interval: Duration,

    // =========================================================================
    // Rate Limiting Configuration (requests per minute, per client IP)
    // =========================================================================
    /// Natural-language search budget (default: 10/min)
    pub nlp_search_per_minute: u32,

    /// Lead submission budget (default: 5/min)
    pub leads_per_minute: u32,

    /// Listing search budget (default: 60/min)
    pub listing_search_per_minute: u32,

    /// Community listing budget (default: 30/min)
    pub community_listing_per_minute: u32,

    /// Sliding window over which the budgets above refill (default: 60s)
    pub rate_limit_window: Duration,

    // =========================================================================
    // Request Limits Configuration
    // =========================================================================
    /// Maximum request body size in bytes (default: 1MB)
    /// Prevents denial-of-service via large payloads
    pub max_request_body_size: usize,

    /// Hard cap on the `page_size` search parameter (default: 100)
    pub page_size_cap: u32,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Comma-separated list of allowed CORS origins
    /// Use "*" to allow all origins (not recommended for production)
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Content Configuration
    // =========================================================================
    /// Optional path to a community catalog JSON file.
    /// When unset, the catalog embedded at build time is used.
    pub community_catalog_path: Option<PathBuf>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any required configuration is invalid
    /// (e.g., non-numeric PORT value, backoff exceeding the attempt deadline).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Upstream providers
            mls_base_url: env::var("MLS_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            mls_api_key: env::var("MLS_API_KEY").ok().filter(|k| !k.is_empty()),
            crm_base_url: env::var("CRM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8082".to_string()),
            crm_api_key: env::var("CRM_API_KEY").ok().filter(|k| !k.is_empty()),

            // Resilient fetch
            fetch_timeout: Duration::from_millis(Self::parse_env("FETCH_TIMEOUT_MS", 10_000)?),
            fetch_max_retries: Self::parse_env("FETCH_MAX_RETRIES", 2)?,
            fetch_retry_base: Duration::from_millis(Self::parse_env("FETCH_RETRY_BASE_MS", 500)?),
            upstream_probe_interval: Duration::from_secs(Self::parse_env(
                "UPSTREAM_PROBE_INTERVAL_SECS",
                30,
            )?),

            // Rate limiting
            nlp_search_per_minute: Self::parse_env("RATE_LIMIT_NLP_SEARCH", 10)?,
            leads_per_minute: Self::parse_env("RATE_LIMIT_LEADS", 5)?,
            listing_search_per_minute: Self::parse_env("RATE_LIMIT_LISTING_SEARCH", 60)?,
            community_listing_per_minute: Self::parse_env("RATE_LIMIT_COMMUNITIES", 30)?,
            rate_limit_window: Duration::from_millis(Self::parse_env(
                "RATE_LIMIT_WINDOW_MS",
                60_000,
            )?),

            // Request limits
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 1024 * 1024)?, // 1MB
            page_size_cap: Self::parse_env("PAGE_SIZE_CAP", 100)?,

            // Security
            cors_allowed_origins: Self::parse_cors_origins(),

            // Content
            community_catalog_path: env::var("COMMUNITY_CATALOG_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        // A single backoff sleep longer than the attempt deadline is almost
        // certainly a misconfiguration
        if self.fetch_retry_base > self.fetch_timeout {
            return Err(AppError::ConfigError(format!(
                "FETCH_RETRY_BASE_MS ({:?}) must be <= FETCH_TIMEOUT_MS ({:?})",
                self.fetch_retry_base, self.fetch_timeout
            )));
        }

        if self.fetch_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "FETCH_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_window.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_MS must be greater than 0".to_string(),
            ));
        }

        if self.page_size_cap == 0 {
            return Err(AppError::ConfigError(
                "PAGE_SIZE_CAP must be greater than 0".to_string(),
            ));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Upstream providers
            mls_base_url: "http://localhost:8081".to_string(),
            mls_api_key: None,
            crm_base_url: "http://localhost:8082".to_string(),
            crm_api_key: None,
            // Resilient fetch
            fetch_timeout: Duration::from_secs(10),
            fetch_max_retries: 2,
            fetch_retry_base: Duration::from_millis(500),
            upstream_probe_interval: Duration::from_secs(30),
            // Rate limiting
            nlp_search_per_minute: 10,
            leads_per_minute: 5,
            listing_search_per_minute: 60,
            community_listing_per_minute: 30,
            rate_limit_window: Duration::from_secs(60),
            // Request limits
            max_request_body_size: 1024 * 1024, // 1MB
            page_size_cap: 100,
            // Security
            cors_allowed_origins: vec!["*".to_string()],
            // Content
            community_catalog_path: None,
            // Observability
            log_level: "info".to_string(),
        }
    }
}
