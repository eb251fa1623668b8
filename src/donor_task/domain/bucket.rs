//! Local GTD buckets and the donor status mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Local GTD bucket a task is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GtdBucket {
    /// Captured but not yet processed.
    Inbox,
    /// Actionable and ready to be worked on.
    NextAction,
    /// Parked for possible later action.
    SomedayMaybe,
    /// Finished.
    Completed,
    /// Discarded.
    Deleted,
}

impl GtdBucket {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::NextAction => "next_action",
            Self::SomedayMaybe => "someday_maybe",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for GtdBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed mapping from donor status codes to local buckets.
///
/// Lookup is total: codes missing from the table resolve to the default
/// bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMappingTable {
    entries: &'static [(&'static str, GtdBucket)],
    default_bucket: GtdBucket,
}

impl StatusMappingTable {
    /// Creates a table from lowercase status codes and a fallback bucket.
    #[must_use]
    pub const fn new(
        entries: &'static [(&'static str, GtdBucket)],
        default_bucket: GtdBucket,
    ) -> Self {
        Self {
            entries,
            default_bucket,
        }
    }

    /// Resolves a donor status code to a local bucket.
    ///
    /// Codes are trimmed and lowercased before lookup.
    #[must_use]
    pub fn bucket_for(&self, status: &str) -> GtdBucket {
        let normalized = status.trim().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(code, _)| *code == normalized)
            .map_or(self.default_bucket, |(_, bucket)| *bucket)
    }

    /// Returns the bucket used for unmapped codes.
    #[must_use]
    pub const fn default_bucket(&self) -> GtdBucket {
        self.default_bucket
    }
}

impl Default for StatusMappingTable {
    fn default() -> Self {
        DONOR_STATUS_MAPPING
    }
}

/// Status mapping for the Donor Management service.
///
/// `"0"` is a legacy import artifact and files as a next action, like any
/// code the table does not list.
pub const DONOR_STATUS_MAPPING: StatusMappingTable = StatusMappingTable::new(
    &[
        ("pending", GtdBucket::NextAction),
        ("completed", GtdBucket::Completed),
        ("cancelled", GtdBucket::Deleted),
        ("0", GtdBucket::NextAction),
    ],
    GtdBucket::NextAction,
);
