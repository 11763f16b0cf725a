//! Publish-date resolution, cheapest tier first.
//!
//! 1. Inline listing metadata (`upload_date`, then epoch timestamps).
//! 2. Batched lookups against the metadata service, by video id.
//! 3. Per-item metadata extraction through the platform. Only used when no
//!    metadata service is configured or a tier-2 request failed.

use chrono::NaiveDate;
use channel_sync_sources::{MetadataService, VideoPlatform};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Outcome of resolving one entry's publish date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateResolution {
    Resolved(NaiveDate),
    /// No tier produced a date; the entry is excluded.
    Unknown,
    /// The platform rejected the request (auth or challenge). Counts toward the blocked-attempt breaker.
    Blocked,
}

impl DateResolution {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DateResolution::Resolved(date) => Some(*date),
            _ => None,
        }
    }
}

/// Result of the tier-2 pass.
#[derive(Debug, Default)]
pub struct BatchLookup {
    pub dates: HashMap<String, NaiveDate>,
    /// A request failed and the remaining batches were skipped.
    pub request_failed: bool,
}

pub struct DateResolver<'a> {
    platform: &'a dyn VideoPlatform,
    metadata: Option<&'a dyn MetadataService>,
}

impl<'a> DateResolver<'a> {
    pub fn new(platform: &'a dyn VideoPlatform, metadata: Option<&'a dyn MetadataService>) -> Self {
        Self { platform, metadata }
    }

    pub fn has_metadata_service(&self) -> bool {
        self.metadata.is_some()
    }

    /// Tier 2. Unique ids (first occurrence order) in batches of the service's batch size.
    /// A failing batch stops the pass; dates from earlier batches are kept.
    pub async fn lookup_batched(&self, video_ids: &[String]) -> BatchLookup {
        let mut lookup = BatchLookup::default();
        let Some(service) = self.metadata else {
            return lookup;
        };

        let mut seen = HashSet::new();
        let unique: Vec<String> = video_ids
            .iter()
            .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
            .cloned()
            .collect();
        if unique.is_empty() {
            return lookup;
        }

        let batch_size = service.batch_size().max(1);
        for (index, batch) in unique.chunks(batch_size).enumerate() {
            match service.fetch_publish_dates(batch).await {
                Ok(dates) => {
                    debug!(
                        service = service.service_name(),
                        batch = index + 1,
                        requested = batch.len(),
                        resolved = dates.len(),
                        "Metadata batch complete"
                    );
                    lookup.dates.extend(dates);
                }
                Err(e) => {
                    warn!(
                        service = service.service_name(),
                        batch = index + 1,
                        error = %e,
                        "Metadata lookup failed, skipping remaining batches"
                    );
                    lookup.request_failed = true;
                    break;
                }
            }
        }
        lookup
    }

    /// Whether tier 3 may run after the given tier-2 pass.
    pub fn fallback_enabled(&self, lookup: &BatchLookup) -> bool {
        self.metadata.is_none() || lookup.request_failed
    }

    /// Tier 3. Full metadata fetch for one item.
    pub async fn resolve_by_extraction(&self, watch_url: &str) -> DateResolution {
        match self.platform.fetch_metadata(watch_url).await {
            Ok(metadata) => match metadata.inline_publish_date() {
                Some(date) => DateResolution::Resolved(date),
                None => DateResolution::Unknown,
            },
            Err(e) if e.is_blocked() => {
                debug!(watch_url, error = %e, "Metadata extraction blocked");
                DateResolution::Blocked
            }
            Err(e) => {
                debug!(watch_url, error = %e, "Metadata extraction failed");
                DateResolution::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMetadataService, FakePlatform};

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batches_unique_ids() {
        let platform = FakePlatform::default();
        let service = FakeMetadataService::with_dates(&[("a", "2024-01-02"), ("b", "2024-02-03"), ("c", "2024-03-04")])
            .batch_size(2);
        let resolver = DateResolver::new(&platform, Some(&service));

        let lookup = resolver.lookup_batched(&ids(&["a", "b", "a", "c"])).await;
        assert!(!lookup.request_failed);
        assert_eq!(lookup.dates.len(), 3);
        assert_eq!(service.calls(), vec![ids(&["a", "b"]), ids(&["c"])]);
        assert!(!resolver.fallback_enabled(&lookup));
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_earlier_dates() {
        let platform = FakePlatform::default();
        let service = FakeMetadataService::with_dates(&[("a", "2024-01-02"), ("c", "2024-03-04")])
            .batch_size(1)
            .fail_on_call(2);
        let resolver = DateResolver::new(&platform, Some(&service));

        let lookup = resolver.lookup_batched(&ids(&["a", "b", "c"])).await;
        assert!(lookup.request_failed);
        assert_eq!(lookup.dates.len(), 1);
        assert_eq!(service.calls().len(), 2);
        assert!(resolver.fallback_enabled(&lookup));
    }

    #[tokio::test]
    async fn test_extraction_outcomes() {
        let platform = FakePlatform::default()
            .with_metadata_date("https://www.youtube.com/watch?v=ok", "20240105")
            .with_metadata_error("https://www.youtube.com/watch?v=bot", "Sign in to confirm you're not a bot")
            .with_metadata_error("https://www.youtube.com/watch?v=gone", "Video unavailable");
        let resolver = DateResolver::new(&platform, None);

        assert_eq!(
            resolver.resolve_by_extraction("https://www.youtube.com/watch?v=ok").await,
            DateResolution::Resolved(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert_eq!(
            resolver.resolve_by_extraction("https://www.youtube.com/watch?v=bot").await,
            DateResolution::Blocked
        );
        assert_eq!(
            resolver.resolve_by_extraction("https://www.youtube.com/watch?v=gone").await,
            DateResolution::Unknown
        );
        assert!(resolver.fallback_enabled(&BatchLookup::default()));
    }
}
