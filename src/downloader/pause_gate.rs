//! Reference-counted queue pause gate for post-processing stages.
//!
//! `par-pause-queue` / `unpack-pause-queue` / `script-pause-queue` each hold
//! this gate for the duration of their stage. Holders compose into a single
//! count: the queue is paused the moment the first stage needs it and
//! resumed only once every stage has released it, so two collections
//! post-processing concurrently don't pause-then-resume each other's gate.

use std::sync::atomic::Ordering;

use super::UsenetDownloader;

impl UsenetDownloader {
    /// Acquire the pause gate. Pauses the download queue if no stage was
    /// already holding it.
    pub(crate) async fn acquire_pause_gate(&self) {
        let previous = self
            .queue_state
            .pause_gate_count
            .fetch_add(1, Ordering::SeqCst);
        if previous == 0
            && let Err(e) = self.pause_all().await
        {
            tracing::warn!(error = %e, "failed to pause queue for post-processing pause gate");
        }
    }

    /// Release the pause gate. Resumes the download queue once no stage is
    /// holding it anymore.
    pub(crate) async fn release_pause_gate(&self) {
        let previous = self
            .queue_state
            .pause_gate_count
            .fetch_sub(1, Ordering::SeqCst);
        if previous == 1
            && let Err(e) = self.resume_all().await
        {
            tracing::warn!(error = %e, "failed to resume queue after post-processing pause gate release");
        }
    }
}
