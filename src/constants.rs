//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Provider chain constants
pub mod chain {
    /// Maximum total attempts across all providers
    pub const MAX_TOTAL_ATTEMPTS: usize = 10;

    /// Default maximum retries per provider
    pub const DEFAULT_MAX_RETRIES: u8 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Circuit breaker constants
pub mod circuit_breaker {
    /// Number of failures before opening circuit
    pub const FAILURE_THRESHOLD: u32 = 5;

    /// Duration to wait before attempting recovery (seconds)
    pub const RECOVERY_TIMEOUT_SECS: u64 = 30;

    /// Maximum requests allowed in half-open state
    pub const HALF_OPEN_MAX_REQUESTS: u32 = 3;

    /// Success threshold to close circuit from half-open
    pub const SUCCESS_THRESHOLD: u32 = 2;
}

/// Rate limiting constants (token bucket, per provider)
pub mod rate_limit {
    /// Default requests-per-minute capacity when a mode profile doesn't override it
    pub const DEFAULT_PER_MINUTE: u32 = 60;

    /// Maximum time a caller will wait for a token before failing as rate-limited
    pub const MAX_WAIT_MS: u64 = 2_000;
}

/// Cost model / budget guard constants
pub mod budget {
    /// Conservative fallback price (USD per 1K tokens) for unknown provider/model pairs
    pub const FALLBACK_INPUT_PRICE_PER_1K: f64 = 0.001;
    pub const FALLBACK_OUTPUT_PRICE_PER_1K: f64 = 0.002;

    /// Approximate characters per token used for cost estimation
    pub const CHARS_PER_TOKEN: f64 = 4.0;

    /// Discount applied to cost estimates when cost_optimization is enabled
    pub const COST_OPTIMIZATION_FACTOR: f64 = 0.8;
}

/// Pipeline / coordinator constants
pub mod pipeline {
    /// Default maximum enhancement passes
    pub const DEFAULT_MAX_PASSES: u32 = 5;

    /// Default minimum improvement required to continue past a pass (plateau threshold)
    pub const DEFAULT_IMPROVEMENT_THRESHOLD: f64 = 0.05;

    /// Default quality threshold that ends the loop early on success
    pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.80;

    /// Degradation is flagged when a pass loses more than threshold/2
    pub const DEGRADATION_DIVISOR: f64 = 2.0;
}

/// Result cache constants
pub mod cache {
    /// Default maximum cached results
    pub const DEFAULT_CACHE_SIZE: usize = 500;

    /// Default cache entry time-to-live (seconds)
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
}

/// Version history constants
pub mod history {
    /// Maximum versions retained per document before the oldest are dropped
    pub const MAX_VERSIONS_PER_DOCUMENT: usize = 50;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Maximum retries for network requests
    pub const MAX_NETWORK_RETRIES: u32 = 3;
}
