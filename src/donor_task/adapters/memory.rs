//! Scripted in-memory donor gateway for tests and offline runs.

use crate::donor_task::{
    domain::{DonorTaskId, RemoteTaskRecord},
    ports::{DonorGatewayError, DonorGatewayResult, DonorTaskGateway},
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// In-memory donor gateway with scriptable failures and latency.
///
/// Queued failures are consumed one per call, before the persistent
/// failure (if any) is considered. Calls are counted per endpoint so tests
/// can assert how often the upstream was reached.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDonorGateway {
    state: Arc<RwLock<ScriptedState>>,
    list_calls: Arc<AtomicUsize>,
    detail_calls: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct ScriptedState {
    records: Vec<RemoteTaskRecord>,
    details: HashMap<DonorTaskId, RemoteTaskRecord>,
    queued_failures: VecDeque<DonorGatewayError>,
    persistent_failure: Option<DonorGatewayError>,
    latency: Option<Duration>,
}

fn lock_failure(err: &dyn fmt::Display) -> DonorGatewayError {
    DonorGatewayError::connection(std::io::Error::other(err.to_string()))
}

impl ScriptedDonorGateway {
    /// Creates a gateway serving an empty task list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway serving `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = RemoteTaskRecord>) -> Self {
        let state = ScriptedState {
            records: records.into_iter().collect(),
            ..ScriptedState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            ..Self::default()
        }
    }

    /// Replaces the served records.
    ///
    /// # Errors
    ///
    /// Returns a transient gateway error when lock acquisition fails.
    pub fn set_records(
        &self,
        records: impl IntoIterator<Item = RemoteTaskRecord>,
    ) -> DonorGatewayResult<()> {
        let mut state = self.state.write().map_err(|err| lock_failure(&err))?;
        state.records = records.into_iter().collect();
        Ok(())
    }

    /// Serves `record` from the detail endpoint in place of the list
    /// record with the same identifier.
    ///
    /// # Errors
    ///
    /// Returns a transient gateway error when lock acquisition fails.
    pub fn set_detail(&self, record: RemoteTaskRecord) -> DonorGatewayResult<()> {
        let mut state = self.state.write().map_err(|err| lock_failure(&err))?;
        state.details.insert(record.id().clone(), record);
        Ok(())
    }

    /// Queues a failure for the next call that has not been scripted yet.
    ///
    /// # Errors
    ///
    /// Returns a transient gateway error when lock acquisition fails.
    pub fn push_failure(&self, failure: DonorGatewayError) -> DonorGatewayResult<()> {
        let mut state = self.state.write().map_err(|err| lock_failure(&err))?;
        state.queued_failures.push_back(failure);
        Ok(())
    }

    /// Fails every call with `failure` until [`Self::recover`] is called.
    ///
    /// # Errors
    ///
    /// Returns a transient gateway error when lock acquisition fails.
    pub fn fail_always(&self, failure: DonorGatewayError) -> DonorGatewayResult<()> {
        let mut state = self.state.write().map_err(|err| lock_failure(&err))?;
        state.persistent_failure = Some(failure);
        Ok(())
    }

    /// Clears queued and persistent failures.
    ///
    /// # Errors
    ///
    /// Returns a transient gateway error when lock acquisition fails.
    pub fn recover(&self) -> DonorGatewayResult<()> {
        let mut state = self.state.write().map_err(|err| lock_failure(&err))?;
        state.queued_failures.clear();
        state.persistent_failure = None;
        Ok(())
    }

    /// Delays every call by `latency` before it answers.
    ///
    /// # Errors
    ///
    /// Returns a transient gateway error when lock acquisition fails.
    pub fn set_latency(&self, latency: Duration) -> DonorGatewayResult<()> {
        let mut state = self.state.write().map_err(|err| lock_failure(&err))?;
        state.latency = Some(latency);
        Ok(())
    }

    /// Returns how many times the list endpoint was called.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Returns how many times the detail endpoint was called.
    #[must_use]
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    async fn answer<T>(
        &self,
        respond: impl FnOnce(&ScriptedState) -> T,
    ) -> DonorGatewayResult<T> {
        let latency = self.state.read().map_err(|err| lock_failure(&err))?.latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().map_err(|err| lock_failure(&err))?;
        if let Some(failure) = state.queued_failures.pop_front() {
            return Err(failure);
        }
        if let Some(failure) = state.persistent_failure.clone() {
            return Err(failure);
        }
        Ok(respond(&state))
    }
}

#[async_trait]
impl DonorTaskGateway for ScriptedDonorGateway {
    async fn fetch_all(&self) -> DonorGatewayResult<Vec<RemoteTaskRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(|state| state.records.clone()).await
    }

    async fn fetch_one(&self, id: &DonorTaskId) -> DonorGatewayResult<Option<RemoteTaskRecord>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(|state| {
            state
                .details
                .get(id)
                .or_else(|| state.records.iter().find(|record| record.id() == id))
                .cloned()
        })
        .await
    }
}
