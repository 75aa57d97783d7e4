//! Bindings for the Alertmanager HTTP API v2
//!
//! <https://prometheus.io/docs/alerting/latest/management_api/>

mod types;

pub use types::{
    Alert, AlertQuery, AlertSeverity, AlertState, AlertStatus, ClusterStatus, ExtendedAlert,
    Matcher, PeerStatus, Receiver, ServerConfig, ServerStatus, Silence, SilenceState,
    SilenceStatus,
};

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::client::{Config, HttpClient};
use crate::errors::{Error, Result};

const EP_STATUS: &str = "/api/v2/status";
const EP_SILENCE: &str = "/api/v2/silence/:id";
const EP_SILENCES: &str = "/api/v2/silences";
const EP_ALERTS: &str = "/api/v2/alerts";

/// Client for the Alertmanager HTTP API v2
///
/// # Example
///
/// ```rust,no_run
/// use monitoring_api::alertmanager::{Alert, AlertSeverity};
/// use monitoring_api::{AlertmanagerClient, Config};
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::new(Url::parse("http://localhost:9093")?);
///     let client = AlertmanagerClient::new(config)?;
///
///     let alert = Alert::new("TestAlert")
///         .with_severity(AlertSeverity::Info)
///         .with_label("service", "my-service");
///
///     client.push_alert(alert, &CancellationToken::new()).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct AlertmanagerClient {
    http: HttpClient,
}

impl AlertmanagerClient {
    /// Create a new Alertmanager client
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

    /// Check that the server is up
    ///
    /// Reports the raw status code of the status endpoint without
    /// interpreting the response body.
    pub async fn health(&self, cancel: &CancellationToken) -> Result<StatusCode> {
        let url = self.http.endpoint_url(EP_STATUS, &[]);
        let request = self
            .request(Method::GET, url)
            .build()
            .map_err(Error::BuildRequest)?;

        let response = self.http.execute(request, cancel).await?;
        Ok(response.status)
    }

    /// Get the server's configuration, version, uptime and cluster information
    pub async fn status(&self, cancel: &CancellationToken) -> Result<ServerStatus> {
        let url = self.http.endpoint_url(EP_STATUS, &[]);
        let request = self
            .request(Method::GET, url)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// List alerts matching the query
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-200 code, or the response cannot be decoded.
    #[instrument(name = "AlertmanagerClient::list_alerts", skip_all)]
    pub async fn list_alerts(
        &self,
        query: &AlertQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExtendedAlert>> {
        let url = self.http.endpoint_url(EP_ALERTS, &[]);

        let mut params: Vec<(&str, String)> = query
            .filters
            .iter()
            .map(|filter| ("filter", filter.clone()))
            .collect();
        params.push(("silenced", query.silenced.to_string()));
        params.push(("inhibited", query.inhibited.to_string()));
        params.push(("active", query.active.to_string()));
        params.push(("unprocessed", query.unprocessed.to_string()));
        if let Some(receiver) = &query.receiver {
            params.push(("receiver", receiver.clone()));
        }

        let request = self
            .request(Method::GET, url)
            .query(&params)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// Push one or more alerts to Alertmanager
    ///
    /// Alertmanager deduplicates alerts by their labels.
    /// Alerts with identical labels are considered the same alert.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails
    /// - Alertmanager returns a non-success status code
    #[instrument(
        name = "AlertmanagerClient::push_alerts",
        skip_all,
        fields(alert_count = alerts.len())
    )]
    pub async fn push_alerts(&self, alerts: Vec<Alert>, cancel: &CancellationToken) -> Result<()> {
        if alerts.is_empty() {
            debug!("No alerts to push");
            return Ok(());
        }

        let url = self.http.endpoint_url(EP_ALERTS, &[]);
        debug!(url = %url, "Pushing alerts to Alertmanager");

        let request = self
            .request(Method::POST, url)
            .json(&alerts)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_checked(request, cancel).await?;

        debug!("Alerts pushed successfully");
        Ok(())
    }

    /// Push a single alert
    ///
    /// Convenience method that wraps `push_alerts` for a single alert.
    pub async fn push_alert(&self, alert: Alert, cancel: &CancellationToken) -> Result<()> {
        self.push_alerts(vec![alert], cancel).await
    }

    /// Get the silence with the given ID
    pub async fn silence(&self, id: &str, cancel: &CancellationToken) -> Result<Silence> {
        let url = self.http.endpoint_url(EP_SILENCE, &[("id", id)]);
        let request = self
            .request(Method::GET, url)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// Create or update a silence and return its ID
    ///
    /// A silence without an ID is created; one carrying the ID of an
    /// existing silence replaces it.
    #[instrument(
        name = "AlertmanagerClient::create_silence",
        skip_all,
        fields(created_by = silence.created_by)
    )]
    pub async fn create_silence(
        &self,
        silence: &Silence,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let url = self.http.endpoint_url(EP_SILENCES, &[]);
        let request = self
            .request(Method::POST, url)
            .json(silence)
            .build()
            .map_err(Error::BuildRequest)?;

        let created: CreatedSilence = self.execute_decoded(request, cancel).await?;
        Ok(created.silence_id)
    }

    /// Expire the silence with the given ID
    pub async fn expire_silence(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let url = self.http.endpoint_url(EP_SILENCE, &[("id", id)]);
        let request = self
            .request(Method::DELETE, url)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_checked(request, cancel).await?;
        Ok(())
    }

    /// List silences matching the given filters
    ///
    /// Filters are label matchers against the silences' own matchers;
    /// no filters list every silence.
    pub async fn list_silences(
        &self,
        filter: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Silence>> {
        let url = self.http.endpoint_url(EP_SILENCES, &[]);

        let params: Vec<(&str, &str)> = filter
            .iter()
            .map(|filter| ("filter", filter.as_str()))
            .collect();

        let request = self
            .request(Method::GET, url)
            .query(&params)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
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

    /// Start a request carrying the JSON content type the API expects
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Execute a request, demanding a 200 response
    ///
    /// Any other status code becomes a [`Error::Status`] carrying the
    /// response body text.
    async fn execute_checked(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let response = self.http.execute(request, cancel).await?;
        if response.status != StatusCode::OK {
            return Err(Error::Status {
                status: response.status.as_u16(),
                message: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        Ok(response.body)
    }

    async fn execute_decoded<T>(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self.execute_checked(request, cancel).await?;
        serde_json::from_slice(&body).map_err(Error::Decode)
    }
}

/// Response to a silence creation
///
/// Alertmanager spells the field `silenceID`; some proxies and older
/// servers answer `silenceId`.
#[derive(Deserialize)]
struct CreatedSilence {
    #[serde(rename = "silenceID", alias = "silenceId")]
    silence_id: String,
}
