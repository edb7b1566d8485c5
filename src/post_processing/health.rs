//! Health gate — short-circuits unrecoverable downloads before they enter
//! the PAR-check/repair/unpack chain.

use crate::db::Database;
use crate::types::DownloadId;
use crate::Result;

/// Outcome of a health assessment for a completed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthAssessment {
    /// `1000 * downloaded_bytes / size_bytes`, clamped to `[0, 1000]`.
    pub health_permille: u16,
    /// Whether the download shipped with at least one `.par2` file.
    pub has_par_files: bool,
    /// True when the download should be short-circuited instead of entering
    /// post-processing.
    pub critical: bool,
}

/// Per-mille health score for a download.
///
/// A download with no recovery files has no way to repair any byte loss, so
/// it is critical the moment `downloaded_bytes < size_bytes` — this is why
/// `has_par_files = false` callers get a threshold of 1000 regardless of the
/// configured `critical_health_permille`.
fn health_permille(downloaded_bytes: u64, size_bytes: u64) -> u16 {
    if size_bytes == 0 {
        return 1000;
    }
    let permille = (downloaded_bytes.min(size_bytes) as u128 * 1000) / size_bytes as u128;
    permille.min(1000) as u16
}

/// Assess whether `download_id` is healthy enough to enter post-processing.
///
/// `critical_health_permille` is the configured threshold applied only when
/// the download has `.par2` recovery files; a download with no recovery set
/// always uses an effective threshold of 1000 (any loss is critical).
pub async fn assess(
    db: &Database,
    download_id: DownloadId,
    downloaded_bytes: u64,
    size_bytes: u64,
    critical_health_permille: u16,
) -> Result<HealthAssessment> {
    let files = db.get_download_files(download_id).await?;
    let has_par_files = files
        .iter()
        .any(|f| f.filename.to_ascii_lowercase().contains(".par2"));

    let health_permille = health_permille(downloaded_bytes, size_bytes);
    let threshold = if has_par_files {
        critical_health_permille
    } else {
        1000
    };

    Ok(HealthAssessment {
        health_permille,
        has_par_files,
        critical: health_permille < threshold,
    })
}
