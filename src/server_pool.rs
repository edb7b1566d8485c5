//! Tiered news-server pool.
//!
//! Wraps one [`nntp_rs::NntpPool`] per configured server and adds the tiering
//! semantics the raw pools don't know about: servers are grouped by `level`
//! (0 = best, escalate only after a burst of failures) and, within a level,
//! by `group` (mutually exclusive alternates — a failed fetch can retry on a
//! different group at the same level before escalating). A server that
//! returns an auth or otherwise fatal error is blocked for a backed-off
//! interval instead of being retried on every scheduling pass.

use crate::config::ServerConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How a borrowed connection was used, reported back via [`ServerPool::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The fetch succeeded; the connection may be reused immediately.
    Ok,
    /// A connect/auth/read timeout or similar recoverable failure.
    TransientError,
    /// An authentication failure or other fatal protocol error.
    AuthOrFatal,
}

/// Initial block-period applied after the first fatal/auth failure.
const INITIAL_BLOCK: Duration = Duration::from_secs(10);
/// Upper bound on the exponentially-growing block period.
const MAX_BLOCK: Duration = Duration::from_secs(10 * 60);
/// Bound on how long a single acquire attempt may wait for a free connection
/// before giving up and letting the scheduler re-poll. Acquire must not block.
const ACQUIRE_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1);

struct PooledServer {
    config: ServerConfig,
    pool: nntp_rs::NntpPool,
    active: AtomicBool,
    blocked_until: Mutex<Option<Instant>>,
    consecutive_fatal: AtomicU32,
    in_use: AtomicUsize,
}

/// A connection borrowed from the pool, tagged with where it came from so it
/// can be returned to the right server slot.
pub struct AcquiredConnection {
    /// Index of the server this connection belongs to, for `release`.
    pub server_index: usize,
    /// The server's tier level.
    pub level: i32,
    /// The server's alternate group within that level.
    pub group: i32,
    /// Human-readable server identity, for logging.
    pub host: String,
    /// The borrowed NNTP connection.
    pub connection: nntp_rs::Connection,
}

/// Owns the set of configured upstream servers and vends connections by
/// required level, implementing the cascading-fallback and block-period
/// policies of the news-server pool contract.
pub struct ServerPool {
    servers: Vec<PooledServer>,
}

impl ServerPool {
    /// Build one underlying connection pool per configured server.
    pub async fn new(configs: &[ServerConfig]) -> crate::error::Result<Self> {
        let mut servers = Vec::with_capacity(configs.len());
        for cfg in configs {
            let pool = nntp_rs::NntpPool::new(cfg.clone().into(), cfg.connections as u32)
                .await
                .map_err(|e| crate::error::Error::Nntp(format!("Failed to create NNTP pool: {}", e)))?;
            servers.push(PooledServer {
                config: cfg.clone(),
                pool,
                active: AtomicBool::new(true),
                blocked_until: Mutex::new(None),
                consecutive_fatal: AtomicU32::new(0),
                in_use: AtomicUsize::new(0),
            });
        }
        Ok(Self { servers })
    }

    /// Number of configured servers.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Sum of per-server connection caps for every currently active server.
    ///
    /// Used by the scheduler as `downloads_limit` (§4.3).
    pub fn total_capacity(&self) -> usize {
        self.servers
            .iter()
            .filter(|s| s.active.load(Ordering::Relaxed))
            .map(|s| s.config.connections)
            .sum()
    }

    /// Atomically toggle a server's participation in scheduling.
    pub fn set_active(&self, server_index: usize, active: bool) {
        if let Some(server) = self.servers.get(server_index) {
            server.active.store(active, Ordering::Relaxed);
        }
    }

    /// Per-server and aggregate in-flight connection counts.
    ///
    /// Returns `(per_server, total)` where `per_server[i]` is the number of
    /// connections currently checked out from server `i`.
    pub fn connection_count(&self) -> (Vec<usize>, usize) {
        let per_server: Vec<usize> = self
            .servers
            .iter()
            .map(|s| s.in_use.load(Ordering::Relaxed))
            .collect();
        let total = per_server.iter().sum();
        (per_server, total)
    }

    /// Non-blocking attempt to borrow a connection from any active,
    /// unblocked server whose `level <= max_level` and whose `group` is not
    /// in `exclude_groups`. Returns the first (lowest level, then
    /// configuration order) eligible server with spare capacity.
    pub async fn acquire(
        &self,
        max_level: i32,
        exclude_groups: &HashSet<i32>,
    ) -> Option<AcquiredConnection> {
        let mut candidates: Vec<usize> = (0..self.servers.len())
            .filter(|&i| {
                let s = &self.servers[i];
                s.config.priority <= max_level
                    && !exclude_groups.contains(&s.config.group)
                    && s.active.load(Ordering::Relaxed)
            })
            .collect();
        candidates.sort_by_key(|&i| (self.servers[i].config.priority, self.servers[i].config.group));

        for index in candidates.drain(..) {
            let server = &self.servers[index];
            if self.is_blocked(server).await {
                continue;
            }
            match tokio::time::timeout(ACQUIRE_ATTEMPT_TIMEOUT, server.pool.get()).await {
                Ok(Ok(connection)) => {
                    server.in_use.fetch_add(1, Ordering::Relaxed);
                    return Some(AcquiredConnection {
                        server_index: index,
                        level: server.config.priority,
                        group: server.config.group,
                        host: server.config.host.clone(),
                        connection,
                    });
                }
                Ok(Err(e)) => {
                    tracing::debug!(server = %server.config.host, error = %e, "acquire failed");
                }
                Err(_) => {
                    // No spare connection within the bounded attempt window; try the next server.
                }
            }
        }
        None
    }

    async fn is_blocked(&self, server: &PooledServer) -> bool {
        let guard = server.blocked_until.lock().await;
        matches!(*guard, Some(until) if Instant::now() < until)
    }

    /// Return a connection, applying block-period backoff on fatal outcomes
    /// and resetting it on first success.
    pub async fn release(&self, acquired_server_index: usize, outcome: ReleaseOutcome) {
        let Some(server) = self.servers.get(acquired_server_index) else {
            return;
        };
        server.in_use.fetch_sub(1, Ordering::Relaxed);
        match outcome {
            ReleaseOutcome::Ok => {
                server.consecutive_fatal.store(0, Ordering::Relaxed);
                let mut guard = server.blocked_until.lock().await;
                *guard = None;
            }
            ReleaseOutcome::TransientError => {
                // Connect/auth/read timeouts count as transient; a server is not
                // removed from rotation after a single error, only after a burst.
            }
            ReleaseOutcome::AuthOrFatal => {
                let failures = server.consecutive_fatal.fetch_add(1, Ordering::Relaxed) + 1;
                let block_for = INITIAL_BLOCK
                    .saturating_mul(1 << failures.min(6))
                    .min(MAX_BLOCK);
                let mut guard = server.blocked_until.lock().await;
                *guard = Some(Instant::now() + block_for);
                tracing::warn!(
                    server = %server.config.host,
                    block_secs = block_for.as_secs(),
                    "server blocked after fatal/auth error"
                );
            }
        }
    }

    /// Configuration of a server by index, for logging/diagnostics.
    pub fn server_config(&self, index: usize) -> Option<&ServerConfig> {
        self.servers.get(index).map(|s| &s.config)
    }

    /// The distinct alternate groups configured at exactly this level, among
    /// active servers. Used to decide when an [`EscalationState`] has
    /// exhausted a level and must move to the next one.
    pub fn groups_at_level(&self, level: i32) -> HashSet<i32> {
        self.servers
            .iter()
            .filter(|s| s.active.load(Ordering::Relaxed) && s.config.priority == level)
            .map(|s| s.config.group)
            .collect()
    }

    /// Highest configured level (tier), or 0 if no servers are configured.
    pub fn max_configured_level(&self) -> i32 {
        self.servers.iter().map(|s| s.config.priority).max().unwrap_or(0)
    }
}

/// Tracks, per in-flight article, which server groups have already failed at
/// its current level so the scheduler can exclude them on the next attempt
/// before finally escalating to the next level.
#[derive(Debug, Clone, Default)]
pub struct EscalationState {
    /// Highest level attempted so far (starts at 0).
    pub level: i32,
    /// Groups already tried and failed at `level`.
    pub failed_groups_at_level: HashSet<i32>,
}

impl EscalationState {
    /// Record a failure at the current level/group, deciding whether to stay
    /// at this level (different group available) or escalate.
    pub fn record_failure(&mut self, group: i32, groups_at_level: &HashSet<i32>) {
        self.failed_groups_at_level.insert(group);
        if groups_at_level.is_subset(&self.failed_groups_at_level) {
            self.level += 1;
            self.failed_groups_at_level.clear();
        }
    }
}

/// Shared, reference-counted handle to a [`ServerPool`].
pub type SharedServerPool = Arc<ServerPool>;
