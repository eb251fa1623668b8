//! HTTP gateway for the Donor Management tasks API.
//!
//! Every call is one `GET` with a bounded timeout. Failures are classified
//! so the service layer can decide whether a retry is worthwhile:
//! timeouts, dropped connections and 5xx answers are transient; other
//! non-success statuses are permanent; bodies that do not decode are
//! malformed.

mod payload;

use crate::{
    config::{ConfigError, DonorConfig},
    donor_task::{
        domain::{DonorTaskId, RemoteTaskRecord},
        ports::{DonorGatewayError, DonorGatewayResult, DonorTaskGateway, TransientFailure},
    },
};
use async_trait::async_trait;
use reqwest::{
    Client, Response, StatusCode, Url,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue},
};

pub(crate) use payload::{parse_task, parse_task_list};

/// Header carrying the donor service credential.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Page size requested from the list endpoint.
pub const LIST_LIMIT: u32 = 500;

/// Donor gateway backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpDonorGateway {
    client: Client,
    tasks_url: Url,
    list_url: Url,
}

impl HttpDonorGateway {
    /// Builds a gateway for the configured donor service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiKey`] when the key cannot be sent as
    /// a header value, [`ConfigError::InvalidBaseUrl`] when the base URL
    /// cannot carry a path, or [`ConfigError::HttpClient`] when the client
    /// cannot be constructed.
    pub fn new(config: &DonorConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(api_key) = config.api_key() {
            let mut value =
                HeaderValue::from_str(api_key.expose()).map_err(|_| ConfigError::InvalidApiKey)?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        let mut tasks_url = config.base_url().clone();
        tasks_url
            .path_segments_mut()
            .map_err(|()| ConfigError::InvalidBaseUrl {
                value: config.base_url().to_string(),
                reason: "URL cannot carry a path".to_owned(),
            })?
            .pop_if_empty()
            .extend(["api", "v1", "tasks"]);

        let mut list_url = tasks_url.clone();
        list_url
            .query_pairs_mut()
            .append_pair("limit", &LIST_LIMIT.to_string());

        Ok(Self {
            client,
            tasks_url,
            list_url,
        })
    }

    /// Returns the list endpoint, including its query.
    #[must_use]
    pub const fn list_url(&self) -> &Url {
        &self.list_url
    }

    fn task_url(&self, id: &DonorTaskId) -> DonorGatewayResult<Url> {
        let mut url = self.tasks_url.clone();
        url.path_segments_mut()
            .map_err(|()| DonorGatewayError::PermanentUpstream {
                status: None,
                reason: "tasks URL cannot carry a path".to_owned(),
            })?
            .push(id.as_str());
        Ok(url)
    }

    async fn send(&self, url: Url) -> DonorGatewayResult<Response> {
        tracing::debug!(%url, "requesting donor tasks");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport)?;
        tracing::debug!(status = %response.status(), "donor service responded");
        Ok(response)
    }
}

async fn success_body(response: Response) -> DonorGatewayResult<Vec<u8>> {
    if let Some(err) = classify_status(response.status()) {
        return Err(err);
    }
    let body = response.bytes().await.map_err(classify_transport)?;
    Ok(body.to_vec())
}

/// Classifies a non-success status; returns `None` for 2xx.
pub(crate) fn classify_status(status: StatusCode) -> Option<DonorGatewayError> {
    if status.is_success() {
        return None;
    }
    let code = status.as_u16();
    if status.is_server_error() {
        return Some(DonorGatewayError::TransientUpstream(
            TransientFailure::ServerError(code),
        ));
    }
    let reason = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "credential rejected".to_owned(),
        _ => status.canonical_reason().map_or_else(
            || format!("unexpected HTTP status {code}"),
            ToOwned::to_owned,
        ),
    };
    Some(DonorGatewayError::rejected(code, reason))
}

fn classify_transport(err: reqwest::Error) -> DonorGatewayError {
    if err.is_timeout() {
        DonorGatewayError::TransientUpstream(TransientFailure::Timeout)
    } else if err.is_decode() {
        DonorGatewayError::MalformedResponse(err.to_string())
    } else {
        DonorGatewayError::connection(err)
    }
}

#[async_trait]
impl DonorTaskGateway for HttpDonorGateway {
    async fn fetch_all(&self) -> DonorGatewayResult<Vec<RemoteTaskRecord>> {
        let response = self.send(self.list_url.clone()).await?;
        let body = success_body(response).await?;
        let records = parse_task_list(&body)?;
        tracing::debug!(count = records.len(), "decoded donor task list");
        Ok(records)
    }

    async fn fetch_one(&self, id: &DonorTaskId) -> DonorGatewayResult<Option<RemoteTaskRecord>> {
        let response = self.send(self.task_url(id)?).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(donor_task_id = %id, "donor task not found");
            return Ok(None);
        }
        let body = success_body(response).await?;
        parse_task(&body).map(Some)
    }
}
