use anyhow::Result;
use channel_sync_config::{keys, SettingsStore};
use channel_sync_models::TaskStatus;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::merge::is_managed;
use crate::overrides::ScopedOverrides;
use crate::pipeline::{PipelineOutcome, PipelineRequest, TaskPipeline};
use crate::queue::{TaskQueue, SOURCE_LANGUAGE, STATUS, TARGET_LANGUAGE};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub selected: usize,
    pub done: usize,
    pub errors: usize,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline panicked".to_string()
    }
}

/// Runs the pipeline over managed rows that are pending or failed, persisting after each row.
pub struct TaskProcessor<'a> {
    pipeline: &'a dyn TaskPipeline,
    input_root: PathBuf,
    queue_path: PathBuf,
}

impl<'a> TaskProcessor<'a> {
    pub fn new(pipeline: &'a dyn TaskPipeline, input_root: impl Into<PathBuf>, queue_path: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            input_root: input_root.into(),
            queue_path: queue_path.into(),
        }
    }

    /// Row indices that need a (re)run, in queue order.
    pub fn pending_rows(queue: &TaskQueue, managed_prefix: &str) -> Vec<usize> {
        queue
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| is_managed(row.video_file(), managed_prefix))
            .filter(|(_, row)| TaskStatus::needs_processing(row.status()))
            .map(|(index, _)| index)
            .collect()
    }

    fn input_path(&self, video_file: &str) -> PathBuf {
        let path = Path::new(video_file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.input_root.join(path)
        }
    }

    /// Process every pending managed row.
    ///
    /// The row's languages are applied to `settings` for the duration of the
    /// call. Pipeline errors and panics become `Error: Unhandled exception - ...`.
    /// Only a failure to persist the queue is returned as an error.
    pub async fn process(
        &self,
        queue: &mut TaskQueue,
        managed_prefix: &str,
        settings: &mut dyn SettingsStore,
    ) -> Result<ProcessStats> {
        let pending = Self::pending_rows(queue, managed_prefix);
        let mut stats = ProcessStats {
            selected: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            info!("No pending managed tasks");
            return Ok(stats);
        }

        let total = pending.len();
        for (order, index) in pending.into_iter().enumerate() {
            let Some(row) = queue.row(index) else {
                continue;
            };
            let video_file = row.video_file().trim().replace('\\', "/");
            let source_language = row.value(SOURCE_LANGUAGE).map(str::to_string);
            let target_language = row.value(TARGET_LANGUAGE).map(str::to_string);
            info!(task = order + 1, total, video_file = %video_file, "Processing managed task");

            let status = {
                let mut scope = ScopedOverrides::new(&mut *settings);
                let applied = apply_languages(&mut scope, source_language, target_language);
                let status = match applied {
                    Ok(()) => self.run_one(&video_file).await,
                    Err(e) => TaskStatus::unhandled(e.to_string()),
                };
                if let Err(e) = scope.restore() {
                    warn!(error = %e, "Failed to restore language settings");
                }
                status
            };

            match &status {
                TaskStatus::Done => stats.done += 1,
                other => {
                    stats.errors += 1;
                    error!(video_file = %video_file, status = %other.to_cell(), "Task failed");
                }
            }
            if let Some(row) = queue.row_mut(index) {
                row.set(STATUS, status.to_cell());
            }
            queue.save(&self.queue_path)?;
        }

        info!(done = stats.done, errors = stats.errors, "Managed tasks processed");
        Ok(stats)
    }

    async fn run_one(&self, video_file: &str) -> TaskStatus {
        let request = PipelineRequest {
            video_file: video_file.to_string(),
            input_path: self.input_path(video_file),
            dubbing: false,
            is_retry: false,
        };
        match AssertUnwindSafe(self.pipeline.run(&request)).catch_unwind().await {
            Ok(Ok(PipelineOutcome::Success)) => TaskStatus::Done,
            Ok(Ok(PipelineOutcome::Failed { step, message })) => TaskStatus::Error { step, message },
            Ok(Err(e)) => TaskStatus::unhandled(e.to_string()),
            Err(payload) => TaskStatus::unhandled(panic_message(payload.as_ref())),
        }
    }
}

fn apply_languages(
    scope: &mut ScopedOverrides<'_>,
    source_language: Option<String>,
    target_language: Option<String>,
) -> Result<()> {
    if let Some(source) = source_language {
        scope.set(keys::SOURCE_LANGUAGE, toml::Value::String(source))?;
    }
    if let Some(target) = target_language {
        scope.set(keys::TARGET_LANGUAGE, toml::Value::String(target))?;
    }
    Ok(())
}
