//! Domain model for donor-sourced tasks.
//!
//! The domain holds the donor's record shape, the local view it becomes,
//! and the pure translation between them. Nothing here performs I/O.

mod bucket;
mod consistency;
mod ids;
mod mapper;
mod record;
mod view;

pub use bucket::{DONOR_STATUS_MAPPING, GtdBucket, StatusMappingTable};
pub use consistency::{ConsistencyReport, LiveState, StatusDrift, detect_drift};
pub use ids::{DonorTaskId, LocalTaskId};
pub use mapper::{build_title, translate, translate_with};
pub use record::{DonorContact, RemoteTaskRecord};
pub use view::{DonorTaskView, TaskProvenance};
