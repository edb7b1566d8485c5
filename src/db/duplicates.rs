//! Duplicate detection queries.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, Download};

impl Database {
    /// Find a download by NZB hash
    ///
    /// This is the most reliable duplicate detection method as it compares
    /// the actual NZB file content (via SHA-256 hash).
    pub async fn find_by_nzb_hash(&self, nzb_hash: &str) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(
            r#"
            SELECT
                id, name, nzb_path, nzb_meta_name, nzb_hash, job_name,
                category, destination, post_process, priority, status,
                progress, speed_bps, size_bytes, downloaded_bytes,
                dupe_key, dupe_score, dupe_mode, delete_status,
                error_message, created_at, started_at, completed_at,
                direct_unpack_state
            FROM downloads
            WHERE nzb_hash = ?
            LIMIT 1
            "#,
        )
        .bind(nzb_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find download by nzb_hash: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Find a download by exact name match
    ///
    /// This is useful for detecting duplicates when the NZB filename is used
    /// as the download name. Case-sensitive match.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(
            r#"
            SELECT
                id, name, nzb_path, nzb_meta_name, nzb_hash, job_name,
                category, destination, post_process, priority, status,
                progress, speed_bps, size_bytes, downloaded_bytes,
                dupe_key, dupe_score, dupe_mode, delete_status,
                error_message, created_at, started_at, completed_at,
                direct_unpack_state
            FROM downloads
            WHERE name = ?
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find download by name: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Find a download by job name
    ///
    /// This detects duplicates using the deobfuscated job name, which catches
    /// cases where the same content is uploaded with different NZB filenames.
    pub async fn find_by_job_name(&self, job_name: &str) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(
            r#"
            SELECT
                id, name, nzb_path, nzb_meta_name, nzb_hash, job_name,
                category, destination, post_process, priority, status,
                progress, speed_bps, size_bytes, downloaded_bytes,
                dupe_key, dupe_score, dupe_mode, delete_status,
                error_message, created_at, started_at, completed_at,
                direct_unpack_state
            FROM downloads
            WHERE job_name = ?
            LIMIT 1
            "#,
        )
        .bind(job_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find download by job_name: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Find active (non-terminal) downloads sharing a dupe-key, ordered by
    /// insertion so the earliest-inserted row comes first — needed to resolve
    /// ties in the dominance contest in favor of the earlier entry.
    pub async fn find_active_by_dupe_key(&self, dupe_key: &str) -> Result<Vec<Download>> {
        let rows = sqlx::query_as::<_, Download>(
            r#"
            SELECT
                id, name, nzb_path, nzb_meta_name, nzb_hash, job_name,
                category, destination, post_process, priority, status,
                progress, speed_bps, size_bytes, downloaded_bytes,
                dupe_key, dupe_score, dupe_mode, delete_status,
                error_message, created_at, started_at, completed_at,
                direct_unpack_state
            FROM downloads
            WHERE dupe_key = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(dupe_key)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find active downloads by dupe_key: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Find the highest-scoring successful history entry filed under a dupe-key.
    ///
    /// A prior success with a higher score than the newcomer dominates it
    /// regardless of what is currently in the active queue, per the
    /// dupe-reject scenario (history beats a re-add).
    pub async fn find_best_successful_history_by_dupe_key(
        &self,
        dupe_key: &str,
        success_status: i32,
    ) -> Result<Option<(i64, i32)>> {
        let row: Option<(i64, i32)> = sqlx::query_as(
            r#"
            SELECT id, dupe_score
            FROM history
            WHERE dupe_key = ? AND status = ? AND delete_status = 0
            ORDER BY dupe_score DESC, completed_at ASC
            LIMIT 1
            "#,
        )
        .bind(dupe_key)
        .bind(success_status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find best successful history entry by dupe_key: {}",
                e
            )))
        })?;

        Ok(row)
    }
}
