//! Translation from donor records to local task views.

use super::{
    DONOR_STATUS_MAPPING, DonorContact, DonorTaskView, LocalTaskId, RemoteTaskRecord,
    StatusMappingTable, TaskProvenance,
};
use mockable::Clock;

/// Translates a donor record using the donor status mapping.
#[must_use]
pub fn translate(record: &RemoteTaskRecord, clock: &impl Clock) -> DonorTaskView {
    translate_with(record, &DONOR_STATUS_MAPPING, clock)
}

/// Translates a donor record using an explicit status mapping.
///
/// Never fails: unknown status codes resolve to the table's default bucket.
/// Apart from `synced_at`, the result depends only on `record` and `table`.
#[must_use]
pub fn translate_with(
    record: &RemoteTaskRecord,
    table: &StatusMappingTable,
    clock: &impl Clock,
) -> DonorTaskView {
    DonorTaskView {
        id: LocalTaskId::for_donor_task(record.id()),
        donor_task_id: record.id().clone(),
        title: build_title(record.title(), record.contacts()),
        bucket: table.bucket_for(record.status()),
        donor_status: record.status().to_owned(),
        source: TaskProvenance::DonorDb,
        task_date: record.task_date().map(ToOwned::to_owned),
        notes: record.notes().map(ToOwned::to_owned),
        is_thank: record.is_thank(),
        synced_at: clock.utc(),
    }
}

/// Builds the display title: the donor title followed by the linked
/// contacts, e.g. `"Lunch - Smith, John & Doe, Jane"`.
#[must_use]
pub fn build_title(title: &str, contacts: &[DonorContact]) -> String {
    if contacts.is_empty() {
        return title.to_owned();
    }
    let names: Vec<&str> = contacts.iter().map(DonorContact::display_name).collect();
    format!("{title} - {}", names.join(" & "))
}
