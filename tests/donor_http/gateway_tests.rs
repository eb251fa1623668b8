//! HTTP gateway tests: request shape and failure classification.

use super::helpers::{Canned, StubDonor, closed_port_url, sample_tasks};
use axum::http::StatusCode;
use eyre::{WrapErr, bail, ensure};
use gtd_donor_bridge::{
    config::{ApiKey, DonorConfig},
    donor_task::{
        adapters::HttpDonorGateway,
        domain::DonorTaskId,
        ports::{DonorGatewayError, DonorTaskGateway, TransientFailure},
    },
};
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

#[rstest]
#[case::bare_host("http://donor.example", "http://donor.example/api/v1/tasks?limit=500")]
#[case::path_prefix("https://example.org/donor/", "https://example.org/donor/api/v1/tasks?limit=500")]
#[case::no_trailing_slash("https://example.org/donor", "https://example.org/donor/api/v1/tasks?limit=500")]
fn list_url_extends_the_base_path(#[case] base: &str, #[case] expected: &str) -> eyre::Result<()> {
    let gateway = HttpDonorGateway::new(&DonorConfig::new(base)?)?;

    assert_eq!(gateway.list_url().as_str(), expected);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fetch_all_sends_credential_and_limit() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::json(&sample_tasks()));
    let config = stub.config()?.with_api_key(ApiKey::new("donor-key")?);
    let gateway = HttpDonorGateway::new(&config)?;

    let records = gateway.fetch_all().await.wrap_err("fetch_all")?;

    assert_eq!(records.len(), 3);
    let statuses: Vec<&str> = records.iter().map(|record| record.status()).collect();
    assert_eq!(statuses, ["pending", "completed", "cancelled"]);
    let requests = stub.requests();
    let Some(request) = requests.first() else {
        bail!("stub saw no request");
    };
    assert_eq!(request.api_key.as_deref(), Some("donor-key"));
    assert_eq!(request.limit.as_deref(), Some("500"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn credential_header_is_omitted_without_a_key() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    let gateway = HttpDonorGateway::new(&stub.config()?)?;

    let records = gateway.fetch_all().await.wrap_err("fetch_all")?;

    ensure!(records.is_empty(), "stub serves no tasks by default");
    assert!(stub.requests().iter().all(|request| request.api_key.is_none()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn enveloped_lists_are_accepted() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::json(&json!({"items": sample_tasks(), "total": 3})));
    let gateway = HttpDonorGateway::new(&stub.config()?)?;

    let records = gateway.fetch_all().await.wrap_err("fetch_all")?;

    assert_eq!(records.len(), 3);
    Ok(())
}

#[rstest]
#[case::internal(StatusCode::INTERNAL_SERVER_ERROR)]
#[case::unavailable(StatusCode::SERVICE_UNAVAILABLE)]
#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_transient(#[case] status: StatusCode) -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::status(status));
    let gateway = HttpDonorGateway::new(&stub.config()?)?;

    let result = gateway.fetch_all().await;

    assert!(matches!(
        result,
        Err(DonorGatewayError::TransientUpstream(TransientFailure::ServerError(code)))
            if code == status.as_u16()
    ));
    Ok(())
}

#[rstest]
#[case::unauthorized(StatusCode::UNAUTHORIZED)]
#[case::forbidden(StatusCode::FORBIDDEN)]
#[case::not_found(StatusCode::NOT_FOUND)]
#[case::unprocessable(StatusCode::UNPROCESSABLE_ENTITY)]
#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_permanent(#[case] status: StatusCode) -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::status(status));
    let gateway = HttpDonorGateway::new(&stub.config()?)?;

    let result = gateway.fetch_all().await;

    assert!(matches!(
        result,
        Err(DonorGatewayError::PermanentUpstream { status: Some(code), .. })
            if code == status.as_u16()
    ));
    Ok(())
}

#[rstest]
#[case::html(StatusCode::OK, "<html>maintenance</html>")]
#[case::wrong_shape(StatusCode::OK, r#"{"message": "ok"}"#)]
#[tokio::test(flavor = "multi_thread")]
async fn unparseable_bodies_are_malformed(
    #[case] status: StatusCode,
    #[case] body: &str,
) -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::raw(status, body));
    let gateway = HttpDonorGateway::new(&stub.config()?)?;

    let result = gateway.fetch_all().await;

    assert!(matches!(result, Err(DonorGatewayError::MalformedResponse(_))));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_answers_time_out_as_transient() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_list(Canned::json(&sample_tasks()).delayed(Duration::from_secs(2)));
    let config = stub.config()?.with_request_timeout(Duration::from_millis(200));
    let gateway = HttpDonorGateway::new(&config)?;

    let result = gateway.fetch_all().await;

    assert!(matches!(
        result,
        Err(DonorGatewayError::TransientUpstream(TransientFailure::Timeout))
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_connections_are_transient() -> eyre::Result<()> {
    let config = DonorConfig::new(&closed_port_url().await?)?;
    let gateway = HttpDonorGateway::new(&config)?;

    let result = gateway.fetch_all().await;

    assert!(matches!(
        result,
        Err(DonorGatewayError::TransientUpstream(TransientFailure::Connection(_)))
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fetch_one_returns_the_task_or_none() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_detail(
        "2",
        Canned::json(&json!({
            "id": 2,
            "description": "Gift processed",
            "status": "completed",
            "contacts": [{"id": 5, "file_as": "Doe, Jane"}]
        })),
    );
    let gateway = HttpDonorGateway::new(&stub.config()?)?;

    let found = gateway
        .fetch_one(&DonorTaskId::from("2"))
        .await
        .wrap_err("fetch existing task")?;
    let missing = gateway
        .fetch_one(&DonorTaskId::from("404"))
        .await
        .wrap_err("fetch missing task")?;

    let Some(record) = found else {
        bail!("task 2 should exist");
    };
    assert_eq!(record.contacts().len(), 1);
    assert!(missing.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_ids_are_sent_as_one_path_segment() -> eyre::Result<()> {
    let stub = StubDonor::start().await?;
    stub.serve_detail("a/b c", Canned::json(&json!({"id": "a/b c", "title": "Odd id"})));
    let gateway = HttpDonorGateway::new(&stub.config()?)?;

    let found = gateway
        .fetch_one(&DonorTaskId::from("a/b c"))
        .await
        .wrap_err("fetch odd id")?;

    assert!(found.is_some());
    let requests = stub.requests();
    assert_eq!(
        requests.first().and_then(|request| request.task_id.as_deref()),
        Some("a/b c")
    );
    Ok(())
}
