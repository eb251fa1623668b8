//! Application services for reading donor-sourced tasks.

mod retry;
mod sync;

pub use retry::RetryPolicy;
pub use sync::{
    CacheKey, DEFAULT_ENRICHMENT_CONCURRENCY, DonorSnapshot, DonorSyncError, DonorSyncResult,
    DonorTaskService, Freshness, SyncSettings, TaskList,
};
