use bytes::Bytes;
use reqwest::{Client, Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::errors::{Error, Result};

/// Connect timeout applied to the internally built transport.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a service connection
///
/// Immutable once the client is constructed. Credentials are optional;
/// when both basic auth and a bearer token are set, basic auth is the one
/// attached to requests.
///
/// # Example
///
/// ```rust
/// use monitoring_api::Config;
/// use std::time::Duration;
/// use url::Url;
///
/// let config = Config::new(Url::parse("http://localhost:9090").unwrap())
///     .with_basic_auth("admin", "secret")
///     .with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    address: Url,
    bearer_token: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
}

impl Config {
    /// Create a configuration for the service at the given base address
    pub fn new(address: Url) -> Self {
        Self {
            address,
            bearer_token: None,
            username: None,
            password: None,
            timeout: None,
        }
    }

    /// Authenticate requests with a bearer token
    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    /// Authenticate requests with HTTP basic auth
    ///
    /// Takes precedence over a bearer token when both are configured.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Set a request timeout on the internally built transport
    ///
    /// Has no effect when the client is constructed with a custom transport
    /// via [`HttpClient::with_client`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the configured base address
    pub fn address(&self) -> &Url {
        &self.address
    }
}

/// Status and fully drained body of an executed request
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code of the response
    pub status: StatusCode,
    /// The complete response body
    pub body: Bytes,
}

/// Generic HTTP client shared by all service bindings
///
/// Resolves endpoint templates against the configured base address,
/// attaches authentication, and executes requests cooperating with
/// cancellation. The service wrappers compose it with their own
/// response interpretation; it is safe to share across tasks.
#[derive(Clone)]
pub struct HttpClient {
    client: ClientWithMiddleware,
    config: Config,
}

impl HttpClient {
    /// Create a client with an internally built transport
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(DEFAULT_CONNECT_TIMEOUT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::BuildHttpClient)?;

        let client = ClientBuilder::new(client).build();

        Ok(Self { client, config })
    }

    /// Create a client with a custom reqwest middleware transport
    ///
    /// This allows you to add custom middleware (logging, tracing, etc.)
    /// or tune the transport beyond what [`Config`] exposes.
    pub fn with_client(client: ClientWithMiddleware, config: Config) -> Self {
        Self { client, config }
    }

    /// Get the client configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve an endpoint template against the configured base address
    ///
    /// Each `:name` placeholder in the template is replaced with its value
    /// from `args`. Placeholder names are unique per template, so the order
    /// of substitution does not matter. Unresolved placeholders are left in
    /// the path verbatim and fail at the service as a malformed path.
    pub fn endpoint_url(&self, template: &str, args: &[(&str, &str)]) -> Url {
        let mut path = format!(
            "{}/{}",
            self.config.address.path().trim_end_matches('/'),
            template.trim_start_matches('/'),
        );
        for (name, value) in args {
            path = path.replace(&format!(":{name}"), value);
        }

        let mut url = self.config.address.clone();
        url.set_path(&path);
        url
    }

    /// Start a request with authentication attached
    ///
    /// Exactly one mechanism is applied: basic auth when a username is
    /// configured, otherwise the bearer token when one is configured.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        if let Some(username) = &self.config.username {
            request.basic_auth(username, self.config.password.as_deref())
        } else if let Some(token) = &self.config.bearer_token {
            request.bearer_auth(token)
        } else {
            request
        }
    }

    /// Execute a prepared request and drain its body, cooperating with
    /// cancellation
    ///
    /// The body is drained on a separate task while the caller's token is
    /// watched in parallel. If cancellation fires first, the drain is
    /// aborted (closing the connection) and then awaited, so no read
    /// outlives this call; a body or transport error the drain produced
    /// before the abort landed takes precedence over [`Error::Canceled`].
    /// The connection is closed on every exit path.
    pub async fn execute(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        debug!(method = %request.method(), url = %request.url(), "Dispatching request");

        let response = tokio::select! {
            response = self.client.execute(request) => response.map_err(Error::Request)?,
            () = cancel.cancelled() => return Err(Error::Canceled),
        };

        let status = response.status();

        let mut drain = tokio::spawn(response.bytes());
        let drained = tokio::select! {
            drained = &mut drain => drained,
            () = cancel.cancelled() => {
                drain.abort();
                drain.await
            }
        };

        match drained {
            Ok(Ok(body)) => Ok(HttpResponse { status, body }),
            Ok(Err(err)) => Err(Error::Request(err.into())),
            Err(join_err) if join_err.is_cancelled() => Err(Error::Canceled),
            Err(join_err) => std::panic::resume_unwind(join_err.into_panic()),
        }
    }

    /// Forward an arbitrary request to the configured service
    ///
    /// Escape hatch for endpoints without a dedicated typed method:
    /// `params` become the query string and `form` a URL-encoded body.
    /// Authentication is attached as usual; the response is returned
    /// without draining it, and only the configured transport timeout
    /// bounds the call.
    pub async fn proxy(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let url = self.endpoint_url(path, &[]);
        debug!(method = %method, url = %url, "Proxying request");

        let mut request = self.request(method, url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if !form.is_empty() {
            request = request.form(form);
        }

        request.send().await.map_err(Error::Request)
    }
}
