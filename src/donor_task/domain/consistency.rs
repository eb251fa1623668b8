//! Drift detection between cached views and a live donor fetch.

use super::{DonorTaskId, DonorTaskView, GtdBucket, RemoteTaskRecord, StatusMappingTable};
use serde::{Serialize, Serializer};
use std::collections::HashSet;

/// State of a cached task in the live donor data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    /// Present live, filed under this bucket.
    Bucket(GtdBucket),
    /// No longer returned by the donor service.
    MissingFromLive,
}

impl LiveState {
    /// Returns the report representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bucket(bucket) => bucket.as_str(),
            Self::MissingFromLive => "missing_from_live",
        }
    }
}

impl Serialize for LiveState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A cached task whose live state no longer matches the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDrift {
    /// Donor identifier of the drifted task.
    pub donor_task_id: DonorTaskId,
    /// Bucket held in the cache.
    pub cached_status: GtdBucket,
    /// Bucket, or absence, in the live data.
    pub live_status: LiveState,
}

/// Compares cached views with live records.
///
/// Reports live tasks whose bucket differs from the cached one (in live
/// order), then cached tasks absent from the live data (in cached order).
/// Live tasks that were never cached are not drift.
#[must_use]
pub fn detect_drift(
    cached: &[DonorTaskView],
    live: &[RemoteTaskRecord],
    table: &StatusMappingTable,
) -> Vec<StatusDrift> {
    let changed = live.iter().filter_map(|record| {
        let cached_view = cached
            .iter()
            .find(|view| view.donor_task_id() == record.id())?;
        let live_bucket = table.bucket_for(record.status());
        (cached_view.bucket() != live_bucket).then(|| StatusDrift {
            donor_task_id: record.id().clone(),
            cached_status: cached_view.bucket(),
            live_status: LiveState::Bucket(live_bucket),
        })
    });

    let live_ids: HashSet<&DonorTaskId> = live.iter().map(RemoteTaskRecord::id).collect();
    let missing = cached
        .iter()
        .filter(|view| !live_ids.contains(view.donor_task_id()))
        .map(|view| StatusDrift {
            donor_task_id: view.donor_task_id().clone(),
            cached_status: view.bucket(),
            live_status: LiveState::MissingFromLive,
        });

    changed.chain(missing).collect()
}

/// Outcome of a consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Whether a cached baseline existed.
    pub cache_populated: bool,
    /// Age of the cached baseline in whole seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_seconds: Option<i64>,
    /// Number of live records compared.
    pub checked_count: usize,
    /// Detected drift.
    pub inconsistencies: Vec<StatusDrift>,
    /// Explanation when no comparison ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Live fetch failure, when the comparison could not run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConsistencyReport {
    /// Report for a cache with nothing to compare against.
    #[must_use]
    pub fn not_populated() -> Self {
        Self {
            cache_populated: false,
            cache_age_seconds: None,
            checked_count: 0,
            inconsistencies: Vec::new(),
            message: Some("Cache not yet populated; no baseline to compare.".to_owned()),
            error: None,
        }
    }

    /// Report for a comparison that ran against `checked_count` live records.
    #[must_use]
    pub const fn checked(
        cache_age_seconds: i64,
        checked_count: usize,
        inconsistencies: Vec<StatusDrift>,
    ) -> Self {
        Self {
            cache_populated: true,
            cache_age_seconds: Some(cache_age_seconds),
            checked_count,
            inconsistencies,
            message: None,
            error: None,
        }
    }

    /// Report for a live fetch that failed.
    #[must_use]
    pub fn fetch_failed(cache_age_seconds: i64, error: impl Into<String>) -> Self {
        Self {
            cache_populated: true,
            cache_age_seconds: Some(cache_age_seconds),
            checked_count: 0,
            inconsistencies: Vec::new(),
            message: None,
            error: Some(error.into()),
        }
    }
}
