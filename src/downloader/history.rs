//! Moves a terminated download out of the active queue and into history.
//!
//! Used by the health gate, the dupe-key dominance contest, and the queue
//! editor's delete variants — anywhere a download leaves the queue with a
//! `delete-status` other than a normal completion.

use crate::db::{Database, Download, NewHistoryEntry};
use crate::error::Result;
use crate::types::{DeleteStatus, DownloadId, Event, Status};

use super::UsenetDownloader;

impl UsenetDownloader {
    /// File `download` into history under `delete_status`, then remove it
    /// from the active downloads table.
    ///
    /// `park` is handled by the caller: this always deletes the database row
    /// (parking only keeps files on disk, which is a filesystem decision made
    /// before this is called).
    pub(crate) async fn finalize_to_history(
        &self,
        download: Download,
        delete_status: DeleteStatus,
    ) -> Result<()> {
        record_history(&self.db, &download, delete_status).await?;

        self.db.delete_download(DownloadId(download.id)).await?;

        self.event_tx
            .send(Event::Removed {
                id: DownloadId(download.id),
            })
            .ok();

        Ok(())
    }

    /// File `download` into history under `delete_status` without touching
    /// the active downloads table — used by `final` deletes, which bypass
    /// history, and callers that already removed the row themselves.
    pub(crate) async fn record_to_history_only(
        &self,
        download: &Download,
        delete_status: DeleteStatus,
    ) -> Result<()> {
        record_history(&self.db, download, delete_status).await
    }
}

async fn record_history(db: &Database, download: &Download, delete_status: DeleteStatus) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let download_time_secs = match download.started_at {
        Some(started) => (now - started).max(0),
        None => 0,
    };

    let entry = NewHistoryEntry {
        name: download.name.clone(),
        category: download.category.clone(),
        destination: Some(std::path::PathBuf::from(&download.destination)),
        status: Status::from_i32(download.status).to_i32(),
        size_bytes: download.size_bytes as u64,
        download_time_secs,
        completed_at: now,
        dupe_key: download.dupe_key.clone(),
        dupe_score: download.dupe_score,
        delete_status: delete_status.to_i32(),
    };

    db.insert_history(&entry).await?;
    Ok(())
}
