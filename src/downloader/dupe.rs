//! Dupe-key dominance contest.
//!
//! This is a second, score-based duplicate layer independent of the
//! exact-match `DuplicateMethod` checks in `nzb.rs` (hash/name/job-name).
//! Those reject byte-identical or name-identical re-adds; this one resolves
//! competition between *different* releases of the same logical content that
//! share a user-supplied `dupe_key` (e.g. two posters' copies of the same
//! episode), picking a winner by `dupe_score`.
//!
//! Dominance rule: for a new download with the same `dupe_key` as an
//! existing active download or successful history entry, the new one wins
//! iff its score is strictly higher. Equal scores favor whichever was
//! inserted first (the existing one), so the new arrival loses ties.
//! `DupeMode::All` opts a download out of the contest entirely — it is
//! always kept alongside any same-key competitors. `DupeMode::Force`
//! bypasses the contest as if no `dupe_key` were set at all (handled by the
//! caller, which simply skips calling into this module).

use crate::config::DupeMode;
use crate::types::{DeleteStatus, DownloadId, Status};

use super::UsenetDownloader;
use crate::error::Result;

/// Outcome of evaluating a new download's dupe-key against existing
/// competitors sharing the same key.
pub(crate) enum DominanceOutcome {
    /// The new download is the best (or only) holder of this dupe-key.
    /// Contains the active competitors it displaced, which the caller must
    /// move to history with `delete-status=dupe`.
    NewWins { evicted: Vec<DownloadId> },
    /// An existing active download or a successful history entry already
    /// holds this dupe-key with an equal-or-better score. The caller should
    /// move the new download straight to history with `delete-status=dupe`
    /// without downloading any articles.
    NewLoses,
}

impl UsenetDownloader {
    /// Evaluate the dupe-key dominance contest for `new_id`, which has
    /// already been inserted into the downloads table with `dupe_key` and
    /// `dupe_score` set.
    pub(crate) async fn evaluate_dupe_dominance(
        &self,
        new_id: DownloadId,
        dupe_key: &str,
        dupe_score: i32,
        mode: DupeMode,
    ) -> Result<DominanceOutcome> {
        debug_assert_ne!(mode, DupeMode::Force, "Force bypasses the contest entirely");

        if mode == DupeMode::All {
            return Ok(DominanceOutcome::NewWins { evicted: Vec::new() });
        }

        // A prior success at a higher-or-equal score beats any new arrival,
        // regardless of what's currently active.
        if let Some((_, history_score)) = self
            .db
            .find_best_successful_history_by_dupe_key(dupe_key, Status::Complete.to_i32())
            .await?
            && history_score >= dupe_score
        {
            return Ok(DominanceOutcome::NewLoses);
        }

        let competitors = self.db.find_active_by_dupe_key(dupe_key).await?;
        let mut evicted = Vec::new();
        for competitor in competitors {
            if competitor.id == new_id.0 {
                continue;
            }
            if competitor.dupe_score >= dupe_score {
                // Existing download was inserted first and scores at least
                // as high — it wins the tie.
                return Ok(DominanceOutcome::NewLoses);
            }
            evicted.push(DownloadId(competitor.id));
        }

        Ok(DominanceOutcome::NewWins { evicted })
    }

    /// Apply a `NewWins` outcome: move every evicted competitor to history
    /// with `delete-status=dupe`.
    pub(crate) async fn evict_dupe_losers(&self, evicted: Vec<DownloadId>) -> Result<()> {
        for id in evicted {
            if let Some(download) = self.db.get_download(id).await? {
                self.finalize_to_history(download, DeleteStatus::Dupe)
                    .await?;
            }
        }
        Ok(())
    }
}
