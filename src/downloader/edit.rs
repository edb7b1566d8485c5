//! Unified queue-editing entry point.
//!
//! Generalizes the individual operations in `control.rs` (pause, resume,
//! set-priority, ...) and `dupe.rs` behind a single selector-based call,
//! mirroring how a queue editor exposes one RPC endpoint rather than one
//! method per action.
//!
//! Architecture note: this crate models one NZB add as one flat download
//! row, not a Collection-of-Files tree. Consequently the file-level and
//! collection-composition actions (move/reorder, pause-all-pars,
//! pause-extra-pars, merge, split, sort files) have no equivalent here and
//! are not implemented — there is nothing within a single download to move
//! relative to, merge with, or split out. `return-to-queue` and
//! `redownload` are likewise omitted: history entries in this schema don't
//! retain the original NZB content/path (the download row owning it is
//! deleted on completion), so there is nothing to re-queue from. Callers
//! needing to retry a finished job should re-submit the original NZB.

use crate::config::DupeMode;
use crate::error::{DatabaseError, Error, Result};
use crate::types::{DeleteStatus, DownloadId, Event, Priority};

use super::UsenetDownloader;

/// How `ids` should be resolved to concrete rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMatchMode {
    /// `ids` are literal row IDs (queue download ID or history entry ID,
    /// depending on the action's target table).
    Id,
    /// `ids` are exact names; any name with no match fails the whole call.
    Name,
    /// `ids` holds a single regular expression matched against names;
    /// zero matches is not an error.
    Regex,
}

/// Action discriminant for [`UsenetDownloader::edit_list`].
///
/// `text` carries the action's opaque payload (a priority code, a new
/// category, a dupe-key, ...) the way a real queue-editor RPC passes one
/// string parameter shared across heterogeneous actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Pause matched active downloads.
    Pause,
    /// Resume matched paused downloads.
    Resume,
    /// Move matched downloads to history, keeping any partially unpacked
    /// files parked on disk (delete-status=normal).
    DeleteNormal,
    /// Move matched downloads to history with delete-status=dupe.
    DeleteDupe,
    /// Remove matched downloads without filing a history entry at all.
    DeleteFinal,
    /// Same as `DeleteNormal` but documents intent to keep completed files
    /// (this crate never deletes on-disk output on any delete variant, so
    /// behaviorally identical to `DeleteNormal`).
    DeletePark,
    /// `text` = integer priority code (-1, 0, 1, 2).
    SetPriority,
    /// `text` = new category, or empty string to clear.
    SetCategory,
    /// `text` = new display name.
    SetName,
    /// `text` = new dupe-key, or empty string to clear.
    SetDupeKey,
    /// `text` = integer dupe-score.
    SetDupeScore,
    /// `text` = "score" | "all" | "force".
    SetDupeMode,
    /// History only: exclude a history entry from the dupe-key dominance
    /// pool (it no longer counts as a prior success).
    MarkBad,
    /// History only: undo `MarkBad`.
    MarkGood,
}

impl EditAction {
    fn targets_history(self) -> bool {
        matches!(self, EditAction::MarkBad | EditAction::MarkGood)
    }
}

/// Upper bound for name/regex history lookups. History has no index on
/// name, so these scans are O(n) regardless; this just bounds the query
/// instead of asking SQLite for an unbounded result set.
const HISTORY_SCAN_LIMIT: usize = 100_000;

fn parse_dupe_mode(text: &str) -> Result<DupeMode> {
    match text {
        "score" => Ok(DupeMode::Score),
        "all" => Ok(DupeMode::All),
        "force" => Ok(DupeMode::Force),
        other => Err(Error::Other(format!("invalid dupe-mode '{}'", other))),
    }
}

impl UsenetDownloader {
    /// Apply `action` to every download (or history entry, for the
    /// history-only actions) matched by `ids`/`match_mode`.
    ///
    /// Returns the number of rows the action was applied to. `offset` is
    /// accepted for contract parity with the file/collection-level move
    /// actions this crate doesn't implement; it is unused here.
    pub async fn edit_list(
        &self,
        ids: &[String],
        match_mode: EditMatchMode,
        action: EditAction,
        _offset: i32,
        text: &str,
    ) -> Result<usize> {
        if action.targets_history() {
            let targets = self.resolve_history_targets(ids, match_mode).await?;
            let mut applied = 0usize;
            for id in targets {
                self.apply_history_action(id, action).await?;
                applied += 1;
            }
            return Ok(applied);
        }

        let targets = self.resolve_queue_targets(ids, match_mode).await?;
        let mut applied = 0usize;
        for id in targets {
            if self.apply_queue_action(id, action, text).await? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    async fn resolve_queue_targets(
        &self,
        ids: &[String],
        match_mode: EditMatchMode,
    ) -> Result<Vec<DownloadId>> {
        match match_mode {
            EditMatchMode::Id => {
                let mut out = Vec::with_capacity(ids.len());
                for raw in ids {
                    let parsed: i64 = raw
                        .parse()
                        .map_err(|_| Error::Other(format!("invalid download id '{}'", raw)))?;
                    out.push(DownloadId(parsed));
                }
                Ok(out)
            }
            EditMatchMode::Name => {
                let all = self.db.list_downloads().await?;
                let mut out = Vec::with_capacity(ids.len());
                for name in ids {
                    let found = all.iter().find(|d| &d.name == name).ok_or_else(|| {
                        Error::Database(DatabaseError::NotFound(format!(
                            "no download named '{}'",
                            name
                        )))
                    })?;
                    out.push(DownloadId(found.id));
                }
                Ok(out)
            }
            EditMatchMode::Regex => {
                let pattern = ids
                    .first()
                    .ok_or_else(|| Error::Other("regex match mode requires a pattern".into()))?;
                let re = regex::Regex::new(pattern)
                    .map_err(|e| Error::Other(format!("invalid regex '{}': {}", pattern, e)))?;
                let all = self.db.list_downloads().await?;
                Ok(all
                    .into_iter()
                    .filter(|d| re.is_match(&d.name))
                    .map(|d| DownloadId(d.id))
                    .collect())
            }
        }
    }

    async fn resolve_history_targets(
        &self,
        ids: &[String],
        match_mode: EditMatchMode,
    ) -> Result<Vec<i64>> {
        match match_mode {
            EditMatchMode::Id => ids
                .iter()
                .map(|raw| {
                    raw.parse::<i64>()
                        .map_err(|_| Error::Other(format!("invalid history id '{}'", raw)))
                })
                .collect(),
            EditMatchMode::Name => {
                let page = self.db.query_history(None, HISTORY_SCAN_LIMIT, 0).await?;
                let mut out = Vec::with_capacity(ids.len());
                for name in ids {
                    let found = page.iter().find(|h| &h.name == name).ok_or_else(|| {
                        Error::Database(DatabaseError::NotFound(format!(
                            "no history entry named '{}'",
                            name
                        )))
                    })?;
                    out.push(found.id);
                }
                Ok(out)
            }
            EditMatchMode::Regex => {
                let pattern = ids
                    .first()
                    .ok_or_else(|| Error::Other("regex match mode requires a pattern".into()))?;
                let re = regex::Regex::new(pattern)
                    .map_err(|e| Error::Other(format!("invalid regex '{}': {}", pattern, e)))?;
                let page = self.db.query_history(None, HISTORY_SCAN_LIMIT, 0).await?;
                Ok(page
                    .into_iter()
                    .filter(|h| re.is_match(&h.name))
                    .map(|h| h.id)
                    .collect())
            }
        }
    }

    /// Apply a non-history action to one download. Returns `false` (no-op,
    /// not an error) if the row was not found, per the "any item not found
    /// is ignored" failure semantics for ID/regex mode — exact-name misses
    /// are already rejected in `resolve_queue_targets`.
    async fn apply_queue_action(
        &self,
        id: DownloadId,
        action: EditAction,
        text: &str,
    ) -> Result<bool> {
        let Some(download) = self.db.get_download(id).await? else {
            return Ok(false);
        };

        match action {
            EditAction::Pause => self.pause(id).await?,
            EditAction::Resume => self.resume(id).await?,
            EditAction::DeleteNormal | EditAction::DeletePark => {
                self.finalize_to_history(download, DeleteStatus::Manual)
                    .await?
            }
            EditAction::DeleteDupe => {
                self.finalize_to_history(download, DeleteStatus::Dupe)
                    .await?
            }
            EditAction::DeleteFinal => {
                // Bypass history entirely.
                self.db.delete_download(id).await?;
                self.emit_event(Event::Removed { id });
            }
            EditAction::SetPriority => {
                let code: i32 = text
                    .parse()
                    .map_err(|_| Error::Other(format!("invalid priority '{}'", text)))?;
                self.set_priority(id, Priority::from_i32(code)).await?
            }
            EditAction::SetCategory => {
                let category = if text.is_empty() { None } else { Some(text) };
                self.db.update_category(id, category).await?
            }
            EditAction::SetName => self.db.update_name(id, text).await?,
            EditAction::SetDupeKey => {
                let key = if text.is_empty() { None } else { Some(text) };
                self.db
                    .update_dupe_params(id, key, download.dupe_score, download.dupe_mode)
                    .await?
            }
            EditAction::SetDupeScore => {
                let score: i32 = text
                    .parse()
                    .map_err(|_| Error::Other(format!("invalid dupe-score '{}'", text)))?;
                self.db
                    .update_dupe_params(id, download.dupe_key.as_deref(), score, download.dupe_mode)
                    .await?
            }
            EditAction::SetDupeMode => {
                let mode = parse_dupe_mode(text)?;
                self.db
                    .update_dupe_params(
                        id,
                        download.dupe_key.as_deref(),
                        download.dupe_score,
                        mode.to_i32(),
                    )
                    .await?
            }
            EditAction::MarkBad | EditAction::MarkGood => {
                unreachable!("history-only actions are routed to apply_history_action")
            }
        }

        Ok(true)
    }

    async fn apply_history_action(&self, id: i64, action: EditAction) -> Result<()> {
        let delete_status = match action {
            EditAction::MarkBad => DeleteStatus::Health,
            EditAction::MarkGood => DeleteStatus::None,
            _ => unreachable!("non-history actions are routed to apply_queue_action"),
        };
        self.db
            .set_history_delete_status(id, delete_status.to_i32())
            .await?;

        Ok(())
    }
}
