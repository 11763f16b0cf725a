pub mod archive;
pub mod breaker;
pub mod channel;
pub mod download;
pub mod merge;
pub mod notify;
pub mod overrides;
pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod resolution;
pub mod scanner;
pub mod sync;

#[cfg(test)]
mod testing;

pub use archive::DownloadArchive;
pub use breaker::{CircuitBreaker, BLOCKED_ATTEMPT_THRESHOLD, CHALLENGE_FORMAT_THRESHOLD};
pub use channel::{channel_slug, scan_channel, ChannelScan, ChannelScanStats};
pub use download::{DownloadAbort, DownloadStats, Downloader};
pub use merge::{merge_task_queue, LanguagePreference, MergeStats};
pub use notify::{CompletionNotifier, Notifier, NotifyOnDrop};
pub use overrides::ScopedOverrides;
pub use pipeline::{CommandPipeline, PipelineOutcome, PipelineRequest, TaskPipeline};
pub use processor::{ProcessStats, TaskProcessor};
pub use queue::{TaskQueue, TaskRow};
pub use resolution::{DateResolution, DateResolver};
pub use scanner::MediaScanner;
pub use sync::{ChannelReport, SyncError, SyncOptions, SyncOrchestrator, SyncReport};
