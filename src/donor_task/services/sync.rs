//! Read facade over the donor gateway: caching, retry and stale fallback.

use crate::{
    cache::{CacheEntry, CacheLoadError, LoadOutcome, TtlCache},
    config::{DEFAULT_CACHE_TTL, DonorConfig},
    donor_task::{
        domain::{
            ConsistencyReport, DONOR_STATUS_MAPPING, DonorTaskId, DonorTaskView,
            RemoteTaskRecord, detect_drift, translate,
        },
        ports::{DonorGatewayError, DonorTaskGateway},
    },
};
use super::RetryPolicy;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use mockable::Clock;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Concurrent detail requests used for contact enrichment.
pub const DEFAULT_ENRICHMENT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(limit) => limit,
    None => NonZeroUsize::MIN,
};

/// Shared, immutable sequence of task views.
pub type TaskList = Arc<[DonorTaskView]>;

/// Identity of a cached donor request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The full donor task list.
    AllTasks,
    /// A single donor task.
    Task(DonorTaskId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTasks => f.write_str("donor:all"),
            Self::Task(id) => write!(f, "donor:task:{id}"),
        }
    }
}

/// Whether served data is within its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Loaded within the TTL.
    Fresh,
    /// Expired data served because a reload failed.
    Stale,
}

/// Donor data together with its freshness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorSnapshot<T> {
    value: T,
    freshness: Freshness,
    fetched_at: DateTime<Utc>,
}

impl<T> DonorSnapshot<T> {
    fn from_entry(entry: CacheEntry<T>, freshness: Freshness) -> Self {
        let fetched_at = entry.created_at();
        Self {
            value: entry.into_value(),
            freshness,
            fetched_at,
        }
    }

    /// Returns the data.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the snapshot, returning the data.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns the freshness marker.
    #[must_use]
    pub const fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// Reports whether the data is past its TTL.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self.freshness, Freshness::Stale)
    }

    /// Returns when the data was loaded from the donor service.
    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Transforms the data, keeping freshness and load time.
    #[must_use]
    pub fn map<U>(self, transform: impl FnOnce(T) -> U) -> DonorSnapshot<U> {
        DonorSnapshot {
            value: transform(self.value),
            freshness: self.freshness,
            fetched_at: self.fetched_at,
        }
    }
}

/// Tunables for [`DonorTaskService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    ttl: Duration,
    retry: RetryPolicy,
    contact_enrichment: Option<NonZeroUsize>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            retry: RetryPolicy::default(),
            contact_enrichment: None,
        }
    }
}

impl SyncSettings {
    /// Derives settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &DonorConfig) -> Self {
        let settings = Self::default()
            .with_ttl(config.cache_ttl())
            .with_retry(RetryPolicy::default().with_max_retries(config.max_retries()));
        if config.enrich_contacts() {
            settings.with_contact_enrichment(DEFAULT_ENRICHMENT_CONCURRENCY)
        } else {
            settings
        }
    }

    /// Sets the cache TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enables contact enrichment with at most `concurrency` detail
    /// requests in flight.
    #[must_use]
    pub const fn with_contact_enrichment(mut self, concurrency: NonZeroUsize) -> Self {
        self.contact_enrichment = Some(concurrency);
        self
    }

    /// Returns the cache TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns the enrichment concurrency, when enrichment is enabled.
    #[must_use]
    pub const fn contact_enrichment(&self) -> Option<NonZeroUsize> {
        self.contact_enrichment
    }
}

/// Errors surfaced by [`DonorTaskService`].
#[derive(Debug, Clone, Error)]
pub enum DonorSyncError {
    /// Loading failed and no earlier value was available.
    #[error("donor tasks unavailable: {0}")]
    CacheLoadFailed(#[from] CacheLoadError<DonorGatewayError>),
}

impl DonorSyncError {
    /// Returns the gateway failure behind this error, if there was one.
    #[must_use]
    pub const fn gateway_error(&self) -> Option<&DonorGatewayError> {
        match self {
            Self::CacheLoadFailed(err) => err.loader_error(),
        }
    }

    /// Reports whether the caller should answer "service unavailable"
    /// rather than treat the failure as a bad request.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.gateway_error()
            .is_none_or(DonorGatewayError::is_transient)
    }
}

/// Result type for donor sync operations.
pub type DonorSyncResult<T> = Result<T, DonorSyncError>;

/// Entry point for donor-sourced tasks.
///
/// Construct one per process and share it; clones share the caches.
pub struct DonorTaskService<G, C>
where
    G: DonorTaskGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    gateway: Arc<G>,
    clock: Arc<C>,
    settings: SyncSettings,
    lists: TtlCache<CacheKey, TaskList, DonorGatewayError, C>,
    details: TtlCache<CacheKey, Option<DonorTaskView>, DonorGatewayError, C>,
}

impl<G, C> Clone for DonorTaskService<G, C>
where
    G: DonorTaskGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            clock: Arc::clone(&self.clock),
            settings: self.settings,
            lists: self.lists.clone(),
            details: self.details.clone(),
        }
    }
}

impl<G, C> fmt::Debug for DonorTaskService<G, C>
where
    G: DonorTaskGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DonorTaskService")
            .field("settings", &self.settings)
            .field("lists", &self.lists)
            .field("details", &self.details)
            .finish_non_exhaustive()
    }
}

impl<G, C> DonorTaskService<G, C>
where
    G: DonorTaskGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a service with empty caches.
    #[must_use]
    pub fn new(gateway: Arc<G>, clock: Arc<C>, settings: SyncSettings) -> Self {
        Self {
            lists: TtlCache::new(Arc::clone(&clock)),
            details: TtlCache::new(Arc::clone(&clock)),
            gateway,
            clock,
            settings,
        }
    }

    /// Returns the settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Returns every donor task as a local view.
    ///
    /// Served from cache while live; otherwise loaded once for all
    /// concurrent callers, retrying transient failures. When the load fails
    /// and an expired list exists, that list is returned marked stale.
    ///
    /// # Errors
    ///
    /// Returns [`DonorSyncError::CacheLoadFailed`] when loading failed and
    /// nothing was cached before.
    pub async fn get_donor_tasks(&self) -> DonorSyncResult<DonorSnapshot<TaskList>> {
        let gateway = Arc::clone(&self.gateway);
        let clock = Arc::clone(&self.clock);
        let settings = self.settings;
        let outcome = self
            .lists
            .get_or_load(CacheKey::AllTasks, settings.ttl, move || {
                load_task_list(gateway, clock, settings)
            })
            .await;
        self.resolve(&self.lists, &CacheKey::AllTasks, outcome)
    }

    /// Returns donor tasks whose raw donor status equals `status_filter`,
    /// or every task when no filter is given.
    ///
    /// Filtering happens on the cached full list, so filtered reads never
    /// replace it with a subset.
    ///
    /// # Errors
    ///
    /// As for [`Self::get_donor_tasks`].
    pub async fn list_tasks(
        &self,
        status_filter: Option<&str>,
    ) -> DonorSyncResult<DonorSnapshot<Vec<DonorTaskView>>> {
        let snapshot = self.get_donor_tasks().await?;
        Ok(snapshot.map(|tasks| {
            tasks
                .iter()
                .filter(|task| status_filter.is_none_or(|status| task.donor_status() == status))
                .cloned()
                .collect()
        }))
    }

    /// Returns one donor task, or `None` when the donor service does not
    /// know it. Cached per task under `donor:task:<id>`.
    ///
    /// # Errors
    ///
    /// As for [`Self::get_donor_tasks`].
    pub async fn get_task(
        &self,
        id: &DonorTaskId,
    ) -> DonorSyncResult<DonorSnapshot<Option<DonorTaskView>>> {
        let key = CacheKey::Task(id.clone());
        let gateway = Arc::clone(&self.gateway);
        let clock = Arc::clone(&self.clock);
        let retry = self.settings.retry;
        let task_id = id.clone();
        let outcome = self
            .details
            .get_or_load(key.clone(), self.settings.ttl, move || async move {
                retry
                    .run("fetch_one", || gateway.fetch_one(&task_id))
                    .await
                    .map(|record| record.map(|found| translate(&found, clock.as_ref())))
            })
            .await;
        self.resolve(&self.details, &key, outcome)
    }

    /// Compares the last cached list, even if expired, with a live fetch.
    ///
    /// The live fetch bypasses the cache and is not retried. A failed
    /// fetch is reported in the result rather than raised.
    pub async fn check_consistency(&self) -> ConsistencyReport {
        let Some(baseline) = self
            .lists
            .last_known(&CacheKey::AllTasks)
            .filter(|entry| !entry.value().is_empty())
        else {
            return ConsistencyReport::not_populated();
        };
        let age_seconds = baseline.age_at(self.clock.utc()).num_seconds();

        let live = self.gateway.fetch_all().await;
        live.map_or_else(
            |err| {
                tracing::warn!(error = %err, "consistency check fetch failed");
                ConsistencyReport::fetch_failed(age_seconds, err.to_string())
            },
            |records| {
                let drift = detect_drift(baseline.value(), &records, &DONOR_STATUS_MAPPING);
                for entry in &drift {
                    tracing::warn!(
                        donor_task_id = %entry.donor_task_id,
                        cached = %entry.cached_status,
                        live = entry.live_status.as_str(),
                        "donor task drifted from cache"
                    );
                }
                tracing::info!(
                    checked = records.len(),
                    inconsistencies = drift.len(),
                    "consistency check complete"
                );
                ConsistencyReport::checked(age_seconds, records.len(), drift)
            },
        )
    }

    /// Drops every cached list and task so the next read reloads.
    pub fn invalidate(&self) {
        self.lists.invalidate_all();
        self.details.invalidate_all();
        tracing::debug!("donor caches invalidated");
    }

    fn resolve<V>(
        &self,
        cache: &TtlCache<CacheKey, V, DonorGatewayError, C>,
        key: &CacheKey,
        outcome: LoadOutcome<V, DonorGatewayError>,
    ) -> DonorSyncResult<DonorSnapshot<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let err = match outcome {
            Ok(entry) => return Ok(DonorSnapshot::from_entry(entry, Freshness::Fresh)),
            Err(err) => err,
        };
        let Some(previous) = cache.last_known(key) else {
            tracing::error!(%key, error = %err, "donor load failed with nothing cached");
            return Err(err.into());
        };
        let now = self.clock.utc();
        if previous.is_live_at(now) {
            return Ok(DonorSnapshot::from_entry(previous, Freshness::Fresh));
        }
        tracing::warn!(
            %key,
            error = %err,
            age_seconds = previous.age_at(now).num_seconds(),
            "serving stale donor data"
        );
        Ok(DonorSnapshot::from_entry(previous, Freshness::Stale))
    }
}

async fn load_task_list<G, C>(
    gateway: Arc<G>,
    clock: Arc<C>,
    settings: SyncSettings,
) -> Result<TaskList, DonorGatewayError>
where
    G: DonorTaskGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    let summaries = settings
        .retry
        .run("fetch_all", || gateway.fetch_all())
        .await?;
    let records = match settings.contact_enrichment {
        Some(concurrency) => enrich_contacts(Arc::clone(&gateway), summaries, concurrency).await,
        None => summaries,
    };
    let tasks: TaskList = records
        .iter()
        .map(|record| translate(record, clock.as_ref()))
        .collect();
    tracing::info!(count = tasks.len(), "loaded donor tasks");
    Ok(tasks)
}

/// Replaces each summary with its detail record, which carries contacts.
/// A summary is kept when its detail cannot be fetched.
async fn enrich_contacts<G>(
    gateway: Arc<G>,
    summaries: Vec<RemoteTaskRecord>,
    concurrency: NonZeroUsize,
) -> Vec<RemoteTaskRecord>
where
    G: DonorTaskGateway + 'static,
{
    stream::iter(summaries)
        .map(move |summary| {
            let detail_gateway = Arc::clone(&gateway);
            async move {
                let fetched = detail_gateway.fetch_one(summary.id()).await;
                match fetched {
                    Ok(Some(detail)) => detail,
                    Ok(None) => summary,
                    Err(err) => {
                        tracing::debug!(
                            donor_task_id = %summary.id(),
                            error = %err,
                            "keeping summary record"
                        );
                        summary
                    }
                }
            }
        })
        .buffered(concurrency.get())
        .collect()
        .await
}
