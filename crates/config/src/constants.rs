//! Centralized constants for the dbt Discovery workspace.
//!
//! This module contains default values used across crates to avoid
//! magic number duplication and improve maintainability.

// =============================================================================
// Endpoints
// =============================================================================

/// Default dbt Cloud Discovery (metadata) GraphQL endpoint.
pub const DEFAULT_DISCOVERY_ENDPOINT: &str = "https://metadata.cloud.getdbt.com/graphql";

/// Default dbt Cloud administrative REST API base URL (v2).
pub const DEFAULT_CLOUD_BASE_URL: &str = "https://cloud.getdbt.com/api/v2";

// =============================================================================
// Connection & Timeout Defaults
// =============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum allowed request timeout in seconds (1 hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Default maximum number of retries for rate-limited requests.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Maximum allowed value for the retry budget.
pub const MAX_MAX_RETRIES: usize = 10;

/// Default maximum number of HTTP redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

// =============================================================================
// Query Logging
// =============================================================================

/// Queries slower than this are logged at WARN level.
pub const SLOW_QUERY_THRESHOLD_MS: u64 = 1000;

/// Number of query characters included in slow-query log lines.
pub const QUERY_LOG_PREVIEW_CHARS: usize = 200;

// =============================================================================
// Discovery Query Defaults
// =============================================================================

/// Page size requested for applied/definition model connections.
pub const DEFAULT_MODEL_PAGE_SIZE: usize = 300;

/// Hard cap on aliased sub-queries in one batched request.
pub const MAX_BATCH_ALIASES: usize = 10;

/// Historical runs fetched per model by the batched runtime lookup.
pub const DEFAULT_HISTORICAL_RUN_COUNT: usize = 5;

/// Historical runs fetched for a single model when no count is given.
pub const DEFAULT_MODEL_HISTORY_LIMIT: usize = 10;

// =============================================================================
// REST API Defaults
// =============================================================================

/// Default number of runs requested from the REST runs listing.
pub const DEFAULT_RUN_LIST_LIMIT: usize = 10;

/// Upper bound accepted by the REST runs listing.
pub const MAX_RUN_LIST_LIMIT: usize = 100;

// =============================================================================
// Fan-out
// =============================================================================

/// Number of independent sub-fetches kept in flight by fan-out operations.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 4;

// =============================================================================
// Files
// =============================================================================

/// Default path of the optional project map file.
pub const DEFAULT_PROJECT_FILE: &str = "config.yml";
