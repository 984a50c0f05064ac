//! Transcode scheduling
//!
//! Jobs run on background tasks, bounded by a semaphore. Each asset has its
//! own lock so two jobs never write the same output directory, and a status
//! entry that the HTTP layer reports.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;

use super::runner::{SegmentSet, TranscodeRunner};
use super::SegmentLayout;
use crate::asset::Asset;
use crate::error::TranscodeError;

/// Lifecycle of an asset's segment set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscodeStatus {
    Queued,
    Running,
    Ready { segments: usize },
    Failed { exit_code: Option<i32> },
    TimedOut,
}

impl TranscodeStatus {
    /// A job is waiting or running
    pub fn is_active(&self) -> bool {
        matches!(self, TranscodeStatus::Queued | TranscodeStatus::Running)
    }

    fn from_result(result: &Result<SegmentSet, TranscodeError>) -> Self {
        match result {
            Ok(set) => TranscodeStatus::Ready {
                segments: set.segments.len(),
            },
            Err(TranscodeError::Timeout { .. }) => TranscodeStatus::TimedOut,
            Err(TranscodeError::Exit { code }) => TranscodeStatus::Failed { exit_code: *code },
            Err(_) => TranscodeStatus::Failed { exit_code: None },
        }
    }
}

pub struct TranscodeQueue {
    runner: TranscodeRunner,
    layout: SegmentLayout,
    permits: Semaphore,
    locks: DashMap<String, Arc<Mutex<()>>>,
    statuses: DashMap<String, TranscodeStatus>,
}

impl TranscodeQueue {
    pub fn new(runner: TranscodeRunner, layout: SegmentLayout, max_concurrent: usize) -> Self {
        Self {
            runner,
            layout,
            permits: Semaphore::new(max_concurrent.max(1)),
            locks: DashMap::new(),
            statuses: DashMap::new(),
        }
    }

    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    pub fn status(&self, asset_id: &str) -> Option<TranscodeStatus> {
        self.statuses.get(asset_id).map(|r| r.clone())
    }

    /// Queue a transcode of `asset` on a background task.
    ///
    /// Fails with [`TranscodeError::InProgress`] if the asset already has a
    /// queued or running job.
    pub fn submit(
        self: &Arc<Self>,
        asset: &Asset,
    ) -> Result<JoinHandle<Result<SegmentSet, TranscodeError>>, TranscodeError> {
        self.reserve(&asset.id)?;

        let queue = Arc::clone(self);
        let id = asset.id.clone();
        let input = asset.storage_path.clone();
        tracing::info!("Queued transcode for asset {}", id);

        Ok(tokio::spawn(async move { queue.execute(id, input).await }))
    }

    /// Transcode `asset` and wait for the result.
    pub async fn run_blocking(&self, asset: &Asset) -> Result<SegmentSet, TranscodeError> {
        self.reserve(&asset.id)?;
        self.execute(asset.id.clone(), asset.storage_path.clone())
            .await
    }

    /// Mark assets whose segment set is already on disk as ready.
    ///
    /// Returns the number of ready assets.
    pub async fn recover(&self, assets: &[Asset]) -> usize {
        let mut ready = 0;
        for asset in assets {
            let dir = self.layout.asset_dir(&asset.id);
            if let Ok(segments) = super::runner::verify_segment_set(&dir).await {
                self.statuses.insert(
                    asset.id.clone(),
                    TranscodeStatus::Ready {
                        segments: segments.len(),
                    },
                );
                ready += 1;
            }
        }
        ready
    }

    fn reserve(&self, asset_id: &str) -> Result<(), TranscodeError> {
        match self.statuses.entry(asset_id.to_string()) {
            Entry::Occupied(entry) if entry.get().is_active() => {
                Err(TranscodeError::InProgress(asset_id.to_string()))
            }
            Entry::Occupied(mut entry) => {
                entry.insert(TranscodeStatus::Queued);
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(TranscodeStatus::Queued);
                Ok(())
            }
        }
    }

    async fn execute(&self, asset_id: String, input: PathBuf) -> Result<SegmentSet, TranscodeError> {
        let lock = self
            .locks
            .entry(asset_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _exclusive = lock.lock().await;

        let result = match self.permits.acquire().await {
            Ok(_permit) => {
                self.statuses
                    .insert(asset_id.clone(), TranscodeStatus::Running);
                tracing::info!("Transcoding asset {}", asset_id);
                self.runner
                    .run(&input, &self.layout.asset_dir(&asset_id))
                    .await
            }
            Err(e) => Err(TranscodeError::Task(e.to_string())),
        };

        let status = TranscodeStatus::from_result(&result);
        match &result {
            Ok(set) => tracing::info!(
                "Transcode finished for asset {}: {} ({} segments)",
                asset_id,
                set.manifest.display(),
                set.segments.len()
            ),
            Err(e) => tracing::error!("Transcode failed for asset {}: {}", asset_id, e),
        }
        self.statuses.insert(asset_id, status);

        result
    }
}
