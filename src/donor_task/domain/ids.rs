//! Identifier types for donor-sourced tasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque task identifier assigned by the donor system.
///
/// The donor service emits identifiers as JSON strings or integers; both
/// normalise to their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonorTaskId(String);

impl DonorTaskId {
    /// Creates an identifier from its textual form, trimming whitespace.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let raw = value.into();
        Self(raw.trim().to_owned())
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for DonorTaskId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for DonorTaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for DonorTaskId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DonorTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Namespace for local identifiers derived from donor identifiers.
const DONOR_TASK_NAMESPACE: Uuid = Uuid::from_u128(0x6b2f_31c4_9a0e_4d7b_8c15_d0e4_27a9_f3b1);

/// Local identifier of a donor-sourced task view.
///
/// Derived deterministically from the donor identifier, so every re-sync of
/// the same donor task produces the same local identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalTaskId(Uuid);

impl LocalTaskId {
    /// Derives the local identifier for a donor task.
    #[must_use]
    pub fn for_donor_task(donor_task_id: &DonorTaskId) -> Self {
        Self(Uuid::new_v5(
            &DONOR_TASK_NAMESPACE,
            donor_task_id.as_str().as_bytes(),
        ))
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for LocalTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
