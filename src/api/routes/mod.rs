//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] — Individual download management
//! - [`queue`] — Queue-wide operations
//! - [`history`] — Download history
//! - [`servers`] — Server management
//! - [`config`] — Configuration
//! - [`categories`] — Category management
//! - [`system`] — Health, events, OpenAPI, shutdown
//! - [`rss`] — RSS feed management
//! - [`scheduler`] — Schedule rule management

use serde::{Deserialize, Serialize};

mod categories;
mod config;
mod downloads;
mod history;
mod queue;
mod rss;
mod scheduler;
mod servers;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use categories::*;
pub use config::*;
pub use downloads::*;
pub use history::*;
pub use queue::*;
pub use rss::*;
pub use scheduler::*;
pub use servers::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for DELETE /downloads/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DeleteDownloadQuery {
    /// Whether to delete downloaded files (default: false)
    #[serde(default)]
    pub delete_files: bool,
}

/// Query parameters for GET /history
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HistoryQuery {
    /// Maximum number of items to return (default: 50)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Filter by status: "complete" or "failed"
    pub status: Option<String>,
}

/// Query parameters for DELETE /history
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ClearHistoryQuery {
    /// Clear entries before this timestamp
    pub before: Option<i64>,
    /// Clear only entries with this status: "complete" or "failed"
    pub status: Option<String>,
}

/// Request body for PUT /config/speed-limit
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SetSpeedLimitRequest {
    /// Speed limit in bytes per second. Use null for unlimited.
    pub limit_bps: Option<u64>,
}

/// Request body for POST /queue/edit — the unified queue-editor entry point
/// mirrored over `UsenetDownloader::edit_list`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EditQueueRequest {
    /// Download IDs (as strings), exact names, or (match_mode="regex") a
    /// single regular expression, depending on `match_mode`.
    pub ids: Vec<String>,
    /// How `ids` should be resolved: "id" (default), "name", or "regex".
    #[serde(default = "default_match_mode")]
    pub match_mode: String,
    /// Action discriminant: "pause", "resume", "delete", "delete-dupe",
    /// "delete-final", "delete-park", "set-priority", "set-category",
    /// "set-name", "set-dupe-key", "set-dupe-score", "set-dupe-mode",
    /// "mark-bad", "mark-good".
    pub action: String,
    /// Offset for move-style actions (accepted for contract parity; unused
    /// by every action this crate implements).
    #[serde(default)]
    pub offset: i32,
    /// Opaque per-action payload (new priority/category/name/dupe-key/...).
    #[serde(default)]
    pub text: String,
}

fn default_match_mode() -> String {
    "id".to_string()
}

/// Response for POST /queue/edit
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EditQueueResponse {
    /// Number of rows the action was applied to.
    pub applied: usize,
}

/// Request body for POST /rss and PUT /rss/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AddRssFeedRequest {
    /// Human-readable name for the feed
    pub name: String,
    /// RSS feed configuration
    #[serde(flatten)]
    pub config: crate::config::RssFeedConfig,
}

/// Response for GET /rss - list of RSS feeds with their IDs
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RssFeedResponse {
    /// Feed ID
    pub id: i64,
    /// Feed name
    pub name: String,
    /// Feed configuration
    #[serde(flatten)]
    pub config: crate::config::RssFeedConfig,
}

/// Response for POST /rss/:id/check - number of items queued
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CheckRssFeedResponse {
    /// Number of new items queued for download
    pub queued: usize,
}

/// Response for GET /scheduler - schedule rule with ID
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScheduleRuleResponse {
    /// Rule ID (index in the list)
    pub id: i64,
    /// Schedule rule configuration
    #[serde(flatten)]
    pub rule: crate::config::ScheduleRule,
}
