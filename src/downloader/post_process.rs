//! Post-processing pipeline entry point.

use crate::error::{Error, Result};
use crate::types::{DownloadId, Event, Status};
use std::path::PathBuf;

use super::UsenetDownloader;

impl UsenetDownloader {
    /// Start post-processing for a completed download
    ///
    /// This is the entry point to the post-processing pipeline. It coordinates
    /// verification, repair, extraction, moving, and cleanup based on the
    /// configured PostProcess mode.
    ///
    /// # Arguments
    ///
    /// * `download_id` - The download to post-process
    ///
    /// # Returns
    ///
    /// Returns Ok(()) on success, Err on any stage failure
    ///
    /// # Example
    ///
    /// ```no_run
    /// use usenet_dl::{UsenetDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = UsenetDownloader::new(Config::default()).await?;
    ///
    ///     // After download completes, start post-processing
    ///     downloader.start_post_processing(1).await?;
    ///
    ///     Ok(())
    /// }
    /// ```
    pub async fn start_post_processing(&self, download_id: DownloadId) -> Result<()> {
        tracing::info!(download_id = download_id.0, "starting post-processing");

        // Update status to Processing
        self.db
            .update_status(download_id, Status::Processing.to_i32())
            .await?;

        // Get download info from database
        let download = self
            .db
            .get_download(download_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("download {} not found", download_id.0)))?;

        // Determine download path (temp directory)
        let download_path = self
            .config
            .download
            .temp_dir
            .join(format!("download_{}", download_id.0));

        // Determine final destination
        let destination = PathBuf::from(&download.destination);

        // Determine post-processing mode
        let post_process = crate::config::PostProcess::from_i32(download.post_process);

        // Check if DirectUnpack completed successfully with actual extractions — skip verify/repair/extract
        let direct_unpack_state = self
            .db
            .get_direct_unpack_state(download_id)
            .await
            .unwrap_or(super::direct_unpack::direct_unpack_state::NOT_STARTED);
        let direct_unpack_completed =
            direct_unpack_state == super::direct_unpack::direct_unpack_state::COMPLETED;
        let direct_unpack_extracted_count = self
            .db
            .get_direct_unpack_extracted_count(download_id)
            .await
            .unwrap_or(0);

        // Health gate: short-circuit unrecoverable downloads before PAR-check.
        // A download with no .par2 set has no forgiveness for any byte loss;
        // one that shipped recovery blocks gets the configured threshold.
        let health = crate::post_processing::health::assess(
            &self.db,
            download_id,
            download.downloaded_bytes as u64,
            download.size_bytes as u64,
            self.config.processing.health.critical_health_permille,
        )
        .await?;
        if health.critical {
            tracing::warn!(
                download_id = download_id.0,
                health_permille = health.health_permille,
                has_par_files = health.has_par_files,
                "download below critical health, short-circuiting before post-processing"
            );
            return self
                .finalize_to_history(download, crate::types::DeleteStatus::Health)
                .await;
        }

        // Hold the pause gate across the verify/repair/extract/move/cleanup
        // pipeline if either stage is configured to pause the queue while it
        // runs. Per-stage granularity within that pipeline would need the
        // post-processor to report stage boundaries back to the downloader;
        // this coarser version still satisfies the intent (no bandwidth
        // contention between downloading and post-processing). The script
        // stage runs later, in `handle_post_process_success`/`_failure`, and
        // is gated there directly so `script_pause_queue` actually covers
        // script execution instead of this unrelated pipeline call.
        let holds_pause_gate = self.config.processing.pause_gates.par_pause_queue
            || self.config.processing.pause_gates.unpack_pause_queue;
        if holds_pause_gate {
            self.acquire_pause_gate().await;
        }

        // Execute post-processing pipeline
        let pipeline_result = if direct_unpack_completed
            && direct_unpack_extracted_count > 0
            && matches!(
                post_process,
                crate::config::PostProcess::Unpack | crate::config::PostProcess::UnpackAndCleanup
            ) {
            tracing::info!(
                download_id = download_id.0,
                extracted_count = direct_unpack_extracted_count,
                "DirectUnpack extracted {} files — skipping verify/repair/extract, running move+cleanup only",
                direct_unpack_extracted_count
            );
            self.processing
                .post_processor
                .run_move_and_cleanup(download_id, download_path, destination)
                .await
        } else {
            self.processing
                .post_processor
                .start_post_processing(download_id, download_path, post_process, destination)
                .await
        };

        if holds_pause_gate {
            self.release_pause_gate().await;
        }

        match pipeline_result {
            Ok(final_path) => {
                self.handle_post_process_success(download_id, download, final_path)
                    .await
            }
            Err(e) => {
                self.handle_post_process_failure(download_id, download, e)
                    .await
            }
        }
    }

    /// Handle successful post-processing: update status, file into history,
    /// emit events, trigger webhooks/scripts.
    async fn handle_post_process_success(
        &self,
        download_id: DownloadId,
        mut download: crate::db::Download,
        final_path: PathBuf,
    ) -> Result<()> {
        self.db
            .update_status(download_id, Status::Complete.to_i32())
            .await?;

        download.status = Status::Complete.to_i32();
        download.destination = final_path.to_string_lossy().into_owned();
        let name = download.name.clone();
        let category = download.category.clone();
        let size_bytes = download.size_bytes as u64;

        // File a history record without touching the active row — the row
        // stays queryable as Complete until a caller explicitly removes it
        // (edit_list delete, or a future retention sweep), matching the
        // "History Entry is append-only" invariant without making a normal
        // completion disappear from the active table.
        self.record_to_history_only(&download, crate::types::DeleteStatus::None)
            .await?;

        self.event_tx
            .send(Event::Complete {
                id: download_id,
                path: final_path.clone(),
            })
            .ok();

        self.trigger_webhooks(super::webhooks::TriggerWebhooksParams {
            event_type: crate::config::WebhookEvent::OnComplete,
            download_id,
            name: name.clone(),
            category: category.clone(),
            status: "complete".to_string(),
            destination: Some(final_path.clone()),
            error: None,
        });

        let mut script_handles = self.trigger_scripts(super::webhooks::TriggerScriptsParams {
            event_type: crate::config::ScriptEvent::OnPostProcessComplete,
            download_id,
            name: name.clone(),
            category: category.clone(),
            status: "complete".to_string(),
            destination: Some(final_path.clone()),
            error: None,
            size_bytes,
        });
        script_handles.extend(self.trigger_scripts(super::webhooks::TriggerScriptsParams {
            event_type: crate::config::ScriptEvent::OnComplete,
            download_id,
            name,
            category,
            status: "complete".to_string(),
            destination: Some(final_path),
            error: None,
            size_bytes,
        }));
        self.await_scripts_under_pause_gate(script_handles).await;

        tracing::info!(
            download_id = download_id.0,
            "post-processing completed successfully"
        );
        Ok(())
    }

    /// Handle failed post-processing: update status, file into history,
    /// emit events, trigger webhooks/scripts.
    async fn handle_post_process_failure(
        &self,
        download_id: DownloadId,
        mut download: crate::db::Download,
        e: Error,
    ) -> Result<()> {
        let error_message = e.to_string();

        self.db
            .update_status(download_id, Status::Failed.to_i32())
            .await?;
        self.db.set_error(download_id, &error_message).await?;

        download.status = Status::Failed.to_i32();
        let name = download.name.clone();
        let category = download.category.clone();
        let size_bytes = download.size_bytes as u64;

        self.record_to_history_only(&download, crate::types::DeleteStatus::None)
            .await?;

        self.event_tx
            .send(Event::Failed {
                id: download_id,
                stage: crate::types::Stage::Extract, // Default to Extract stage
                error: error_message.clone(),
                files_kept: true, // Default: keep files on failure
            })
            .ok();

        self.trigger_webhooks(super::webhooks::TriggerWebhooksParams {
            event_type: crate::config::WebhookEvent::OnFailed,
            download_id,
            name: name.clone(),
            category: category.clone(),
            status: "failed".to_string(),
            destination: None,
            error: Some(error_message.clone()),
        });

        let script_handles = self.trigger_scripts(super::webhooks::TriggerScriptsParams {
            event_type: crate::config::ScriptEvent::OnFailed,
            download_id,
            name,
            category,
            status: "failed".to_string(),
            destination: None,
            error: Some(error_message),
            size_bytes,
        });
        self.await_scripts_under_pause_gate(script_handles).await;

        tracing::error!(download_id = download_id.0, error = %e, "post-processing failed");
        Err(e)
    }

    /// Hold the pause gate for the duration of the script stage when
    /// `script-pause-queue` is configured, actually waiting for every spawned
    /// script to finish before releasing it. Without `script-pause-queue` the
    /// handles are simply dropped — the scripts keep running detached, same
    /// as any other `trigger_scripts` caller.
    async fn await_scripts_under_pause_gate(&self, handles: Vec<tokio::task::JoinHandle<()>>) {
        if !self.config.processing.pause_gates.script_pause_queue {
            return;
        }
        self.acquire_pause_gate().await;
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "script task panicked");
            }
        }
        self.release_pause_gate().await;
    }
}
