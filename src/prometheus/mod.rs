//! Bindings for the Prometheus HTTP API v1
//!
//! <https://prometheus.io/docs/prometheus/latest/querying/api/>

mod types;

pub use types::{Metric, QueryResult, Range, Sample, SampleStream, SampleValue, Selection};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use url::Url;

use crate::client::{Config, HttpClient, HttpResponse};
use crate::errors::{ApiErrorKind, Error, Result};

const EP_QUERY: &str = "/api/v1/query";
const EP_QUERY_RANGE: &str = "/api/v1/query_range";
const EP_LABELS: &str = "/api/v1/labels";
const EP_LABEL_VALUES: &str = "/api/v1/label/:name/values";
const EP_SERIES: &str = "/api/v1/series";

/// Status code Prometheus uses to carry structured query errors.
const STATUS_API_ERROR: StatusCode = StatusCode::UNPROCESSABLE_ENTITY;

/// Client for the Prometheus HTTP API v1
///
/// # Example
///
/// ```rust,no_run
/// use monitoring_api::{Config, PrometheusClient};
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::new(Url::parse("http://localhost:9090")?);
///     let client = PrometheusClient::new(config)?;
///
///     let result = client.query("up", None, &CancellationToken::new()).await?;
///     for sample in result.into_vector()? {
///         println!("{:?} = {}", sample.metric, sample.value.1);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PrometheusClient {
    http: HttpClient,
}

impl PrometheusClient {
    /// Create a new Prometheus client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    /// Create a new client with a custom reqwest middleware client
    pub fn with_client(client: ClientWithMiddleware, config: Config) -> Self {
        Self {
            http: HttpClient::with_client(client, config),
        }
    }

    /// Check that the server answers queries
    ///
    /// Issues a trivial instant query and reports the raw status code
    /// without interpreting the response body.
    pub async fn health(&self, cancel: &CancellationToken) -> Result<StatusCode> {
        let url = self.http.endpoint_url(EP_QUERY, &[]);
        let params = [
            ("query", "ALERTS{}".to_string()),
            ("time", rfc3339(Utc::now())),
        ];
        let request = self
            .http
            .request(Method::GET, url)
            .query(&params)
            .build()
            .map_err(Error::BuildRequest)?;

        let response = self.http.execute(request, cancel).await?;
        Ok(response.status)
    }

    /// Evaluate an instant query
    ///
    /// # Arguments
    ///
    /// * `query` - PromQL expression to evaluate
    /// * `at` - Evaluation timestamp; the server uses its current time
    ///   when omitted
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server rejects the
    /// query, or the response cannot be decoded.
    #[instrument(name = "PrometheusClient::query", skip_all, fields(query = query))]
    pub async fn query(
        &self,
        query: &str,
        at: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<QueryResult> {
        let url = self.http.endpoint_url(EP_QUERY, &[]);
        let mut params = vec![("query", query.to_string())];
        if let Some(at) = at {
            params.push(("time", rfc3339(at)));
        }

        self.get_decoded(url, &params, cancel).await
    }

    /// Evaluate an expression query over a range of time
    #[instrument(name = "PrometheusClient::query_range", skip_all, fields(query = query))]
    pub async fn query_range(
        &self,
        query: &str,
        range: Range,
        cancel: &CancellationToken,
    ) -> Result<QueryResult> {
        let url = self.http.endpoint_url(EP_QUERY_RANGE, &[]);
        let params = vec![
            ("query", query.to_string()),
            ("start", rfc3339(range.start)),
            ("end", rfc3339(range.end)),
            ("step", format!("{:.3}", range.step.as_secs_f64())),
        ];

        self.get_decoded(url, &params, cancel).await
    }

    /// List label names known to the server
    pub async fn labels(
        &self,
        selection: &Selection,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let url = self.http.endpoint_url(EP_LABELS, &[]);
        self.get_decoded(url, &selection_params(selection), cancel)
            .await
    }

    /// List known values for a label
    pub async fn label_values(
        &self,
        label: &str,
        selection: &Selection,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let url = self.http.endpoint_url(EP_LABEL_VALUES, &[("name", label)]);
        self.get_decoded(url, &selection_params(selection), cancel)
            .await
    }

    /// Find series by label matchers
    ///
    /// Returns the label sets of all series matching the selection.
    pub async fn series(
        &self,
        selection: &Selection,
        cancel: &CancellationToken,
    ) -> Result<Vec<Metric>> {
        let url = self.http.endpoint_url(EP_SERIES, &[]);
        self.get_decoded(url, &selection_params(selection), cancel)
            .await
    }

    /// Forward an arbitrary request to the server
    ///
    /// Escape hatch for endpoints without a dedicated method; see
    /// [`HttpClient::proxy`].
    pub async fn proxy(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        self.http.proxy(method, path, params, form).await
    }

    async fn get_decoded<T>(
        &self,
        url: Url,
        params: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = self
            .http
            .request(Method::GET, url)
            .query(params)
            .build()
            .map_err(Error::BuildRequest)?;

        let response = self.http.execute(request, cancel).await?;
        let data = unwrap_envelope(response)?;
        serde_json::from_str(data.get()).map_err(Error::Decode)
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum EnvelopeStatus {
    Success,
    Error,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: EnvelopeStatus,
    #[serde(default)]
    data: Option<Box<RawValue>>,
    #[serde(default)]
    error_type: Option<ApiErrorKind>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Interpret the error envelope around an API response
///
/// A 2xx code must carry a success envelope and the soft-error code 422
/// must carry an error envelope; a mismatch in either direction is a
/// `bad_response` error naming the inconsistency. Any other status code
/// is a `bad_response` error outright.
fn unwrap_envelope(response: HttpResponse) -> Result<Box<RawValue>> {
    let soft_error = response.status == STATUS_API_ERROR;

    if !response.status.is_success() && !soft_error {
        return Err(Error::Api {
            kind: ApiErrorKind::BadResponse,
            message: format!("bad response code {}", response.status.as_u16()),
        });
    }

    let envelope: ApiResponse =
        serde_json::from_slice(&response.body).map_err(|err| Error::Api {
            kind: ApiErrorKind::BadResponse,
            message: err.to_string(),
        })?;

    for warning in &envelope.warnings {
        warn!("Prometheus API warning: {warning}");
    }

    if soft_error != (envelope.status == EnvelopeStatus::Error) {
        return Err(Error::Api {
            kind: ApiErrorKind::BadResponse,
            message: "inconsistent body for response code".to_string(),
        });
    }

    if soft_error {
        return Err(Error::Api {
            kind: envelope.error_type.unwrap_or(ApiErrorKind::BadResponse),
            message: envelope.error.unwrap_or_default(),
        });
    }

    envelope.data.ok_or_else(|| Error::Api {
        kind: ApiErrorKind::BadResponse,
        message: "missing data field in success response".to_string(),
    })
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn selection_params(selection: &Selection) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(start) = selection.start {
        params.push(("start", rfc3339(start)));
    }
    if let Some(end) = selection.end {
        params.push(("end", rfc3339(end)));
    }
    for matcher in &selection.matches {
        params.push(("match[]", matcher.clone()));
    }
    params
}
