//! Local, read-only view of a donor-sourced task.

use super::{DonorTaskId, GtdBucket, LocalTaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marks where a task view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskProvenance {
    /// Pulled from the Donor Management service.
    DonorDb,
}

impl TaskProvenance {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DonorDb => "donor_db",
        }
    }
}

/// A donor task translated into the local GTD model.
///
/// Views are immutable; a new fetch produces new views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorTaskView {
    pub(super) id: LocalTaskId,
    pub(super) donor_task_id: DonorTaskId,
    pub(super) title: String,
    pub(super) bucket: GtdBucket,
    pub(super) donor_status: String,
    pub(super) source: TaskProvenance,
    pub(super) task_date: Option<String>,
    pub(super) notes: Option<String>,
    pub(super) is_thank: bool,
    pub(super) synced_at: DateTime<Utc>,
}

impl DonorTaskView {
    /// Returns the local identifier.
    #[must_use]
    pub const fn id(&self) -> LocalTaskId {
        self.id
    }

    /// Returns the identifier of the originating donor record.
    #[must_use]
    pub const fn donor_task_id(&self) -> &DonorTaskId {
        &self.donor_task_id
    }

    /// Returns the display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the local bucket.
    #[must_use]
    pub const fn bucket(&self) -> GtdBucket {
        self.bucket
    }

    /// Returns the donor status code the bucket was derived from.
    #[must_use]
    pub fn donor_status(&self) -> &str {
        &self.donor_status
    }

    /// Returns the provenance marker.
    #[must_use]
    pub const fn source(&self) -> TaskProvenance {
        self.source
    }

    /// Returns the scheduled task date.
    #[must_use]
    pub fn task_date(&self) -> Option<&str> {
        self.task_date.as_deref()
    }

    /// Returns the notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Reports whether this is a thank-you task.
    #[must_use]
    pub const fn is_thank(&self) -> bool {
        self.is_thank
    }

    /// Returns when the view was translated.
    #[must_use]
    pub const fn synced_at(&self) -> DateTime<Utc> {
        self.synced_at
    }
}
