//! Donor-owned task records as received from the donor service.

use super::DonorTaskId;
use chrono::{DateTime, Utc};

/// A contact linked to a donor task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorContact {
    id: String,
    file_as: Option<String>,
}

impl DonorContact {
    /// Creates a contact with its donor identifier and optional filing name.
    #[must_use]
    pub fn new(id: impl Into<String>, file_as: Option<String>) -> Self {
        Self {
            id: id.into(),
            file_as,
        }
    }

    /// Returns the donor contact identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the name shown in task titles: the filing name, or the
    /// identifier when the filing name is missing or blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.file_as
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }
}

/// A task record owned by the donor system.
///
/// The status is kept as the raw donor code; translation into a local
/// bucket happens in the mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTaskRecord {
    id: DonorTaskId,
    title: String,
    status: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    task_date: Option<String>,
    notes: Option<String>,
    is_thank: bool,
    contacts: Vec<DonorContact>,
}

impl RemoteTaskRecord {
    /// Creates a record with its required fields.
    #[must_use]
    pub fn new(id: DonorTaskId, title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: status.into(),
            created_at: None,
            updated_at: None,
            task_date: None,
            notes: None,
            is_thank: false,
            contacts: Vec::new(),
        }
    }

    /// Sets the donor-side creation and update timestamps.
    #[must_use]
    pub const fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// Sets the scheduled task date as sent by the donor system.
    #[must_use]
    pub fn with_task_date(mut self, task_date: impl Into<String>) -> Self {
        self.task_date = Some(task_date.into());
        self
    }

    /// Sets free-form notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Marks the task as a thank-you task.
    #[must_use]
    pub const fn with_thank(mut self, is_thank: bool) -> Self {
        self.is_thank = is_thank;
        self
    }

    /// Sets the linked contacts.
    #[must_use]
    pub fn with_contacts(mut self, contacts: impl IntoIterator<Item = DonorContact>) -> Self {
        self.contacts = contacts.into_iter().collect();
        self
    }

    /// Returns the donor identifier.
    #[must_use]
    pub const fn id(&self) -> &DonorTaskId {
        &self.id
    }

    /// Returns the donor title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the raw donor status code, empty when the donor sent none.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the donor-side creation timestamp, if it parsed.
    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the donor-side update timestamp, if it parsed.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
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

    /// Returns the linked contacts.
    #[must_use]
    pub fn contacts(&self) -> &[DonorContact] {
        &self.contacts
    }
}
