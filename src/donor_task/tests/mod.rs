//! Unit tests for the donor task module.
//!
//! Tests are organised by component: mapping, payload decoding, gateway
//! classification, retry, drift detection and the caching facade.


use crate::donor_task::{
    domain::{DonorTaskId, RemoteTaskRecord},
    ports::{DonorGatewayResult, DonorTaskGateway},
};
use async_trait::async_trait;
use mockall::mock;

mock! {
    pub Gateway {}

    #[async_trait]
    impl DonorTaskGateway for Gateway {
        async fn fetch_all(&self) -> DonorGatewayResult<Vec<RemoteTaskRecord>>;
        async fn fetch_one(&self, id: &DonorTaskId) -> DonorGatewayResult<Option<RemoteTaskRecord>>;
    }
}
