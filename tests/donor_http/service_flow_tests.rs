//! End-to-end reads through the service against the stub donor.

use super::helpers::{Canned, StubDonor, sample_tasks};
use axum::http::StatusCode;
use eyre::{WrapErr, bail};
use futures::future::join_all;
use gtd_donor_bridge::{
    config::DonorConfig,
    donor_task::{
        adapters::HttpDonorGateway,
        domain::{GtdBucket, TaskProvenance},
        services::{DonorTaskService, Freshness, RetryPolicy, SyncSettings},
    },
};
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

type HttpService = DonorTaskService<HttpDonorGateway, DefaultClock>;

fn service_for(config: &DonorConfig) -> eyre::Result<HttpService> {
    let gateway = HttpDonorGateway::new(config).wrap_err("build gateway")?;
    let settings = SyncSettings::from_config(config).with_retry(
        RetryPolicy::default()
            .with_initial_backoff(Duration::from_millis(5))
            .with_max_backoff(Duration::from_millis(20)),
    );
    Ok(DonorTaskService::new(
        Arc::new(gateway),
        Arc::new(DefaultClock),
        settings,
    ))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_reads_hit_the_donor_once() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::json(&sample_tasks()));
    let service = service_for(&stub.config()?)?;

    let first = service.get_donor_tasks().await.wrap_err("first read")?;
    let second = service.get_donor_tasks().await.wrap_err("second read")?;

    assert_eq!(stub.list_hits(), 1);
    assert_eq!(first.freshness(), Freshness::Fresh);
    assert_eq!(second.value().len(), 3);
    let buckets: Vec<GtdBucket> = second.value().iter().map(|task| task.bucket()).collect();
    assert_eq!(
        buckets,
        [GtdBucket::NextAction, GtdBucket::Completed, GtdBucket::Deleted]
    );
    assert!(
        second
            .value()
            .iter()
            .all(|task| task.source() == TaskProvenance::DonorDb)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn outage_without_cache_surfaces_a_transient_error() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::status(StatusCode::SERVICE_UNAVAILABLE));
    let service = service_for(&stub.config()?)?;

    let Err(err) = service.get_donor_tasks().await else {
        bail!("an outage with an empty cache should fail");
    };

    assert!(err.is_transient());
    assert_eq!(stub.list_hits(), 3);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_reads_share_one_request() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::json(&sample_tasks()).delayed(Duration::from_millis(150)));
    let service = service_for(&stub.config()?)?;

    let reads = (0..8).map(|_| service.get_donor_tasks());
    let results = join_all(reads).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(stub.list_hits(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn filtered_listing_uses_the_cached_read() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::json(&sample_tasks()));
    let service = service_for(&stub.config()?)?;

    let pending = service
        .list_tasks(Some("pending"))
        .await
        .wrap_err("list pending")?;
    let everything = service.list_tasks(None).await.wrap_err("list all")?;

    assert_eq!(pending.value().len(), 1);
    assert_eq!(everything.value().len(), 3);
    assert_eq!(stub.list_hits(), 1);
    Ok(())
}
