//! Bindings for the Grafana HTTP API
//!
//! Covers the admin user endpoints, which require basic authentication
//! of a Grafana server admin.
//!
//! <https://grafana.com/docs/grafana/latest/developers/http_api/admin/>

mod types;

pub use types::{PageUsers, StatusMessage, User, UserPassword, UserPermissions};

use reqwest::Method;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::client::{Config, HttpClient};
use crate::errors::{Error, Result};

const EP_ADMIN_USERS: &str = "/api/admin/users";
const EP_ADMIN_USER: &str = "/api/admin/users/:id";
const EP_ADMIN_USER_PASSWORD: &str = "/api/admin/users/:id/password";
const EP_ADMIN_USER_PERMISSIONS: &str = "/api/admin/users/:id/permissions";
const EP_USER_ORG_SWITCH: &str = "/api/users/:userId/using/:orgId";
const EP_USERS_SEARCH: &str = "/api/users/search";

/// Client for the Grafana HTTP API
///
/// # Example
///
/// ```rust,no_run
/// use monitoring_api::grafana::User;
/// use monitoring_api::{Config, GrafanaClient};
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::new(Url::parse("http://localhost:3000")?)
///         .with_basic_auth("admin", "admin");
///     let client = GrafanaClient::new(config)?;
///
///     let user = User::new("jdoe")
///         .with_email("jdoe@example.com")
///         .with_password("hunter2");
///
///     let created = client.create_user(&user, &CancellationToken::new()).await?;
///     println!("created user {:?}", created.id);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct GrafanaClient {
    http: HttpClient,
}

impl GrafanaClient {
    /// Create a new Grafana client
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

    /// Create a new global user
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server rejects the
    /// user, or the response cannot be decoded.
    #[instrument(name = "GrafanaClient::create_user", skip_all, fields(login = user.login))]
    pub async fn create_user(
        &self,
        user: &User,
        cancel: &CancellationToken,
    ) -> Result<StatusMessage> {
        let url = self.http.endpoint_url(EP_ADMIN_USERS, &[]);
        let request = self
            .http
            .request(Method::POST, url)
            .json(user)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// Change the password of the user with the given ID
    pub async fn update_user_password(
        &self,
        id: u64,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<StatusMessage> {
        let id = id.to_string();
        let url = self
            .http
            .endpoint_url(EP_ADMIN_USER_PASSWORD, &[("id", &id)]);
        let body = UserPassword {
            password: password.to_string(),
        };
        let request = self
            .http
            .request(Method::PUT, url)
            .json(&body)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// Change the server admin permissions of the user with the given ID
    pub async fn update_user_permissions(
        &self,
        id: u64,
        permissions: &UserPermissions,
        cancel: &CancellationToken,
    ) -> Result<StatusMessage> {
        let id = id.to_string();
        let url = self
            .http
            .endpoint_url(EP_ADMIN_USER_PERMISSIONS, &[("id", &id)]);
        let request = self
            .http
            .request(Method::PUT, url)
            .json(permissions)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// Switch the user's active organization
    pub async fn switch_user_context(
        &self,
        user_id: u64,
        org_id: u64,
        cancel: &CancellationToken,
    ) -> Result<StatusMessage> {
        let user_id = user_id.to_string();
        let org_id = org_id.to_string();
        let url = self.http.endpoint_url(
            EP_USER_ORG_SWITCH,
            &[("userId", &user_id), ("orgId", &org_id)],
        );
        let request = self
            .http
            .request(Method::POST, url)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// Search users, one page at a time
    ///
    /// `page` starts at 1. The optional `query` matches against login,
    /// email and display name.
    pub async fn search_users(
        &self,
        page: u64,
        per_page: u64,
        query: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PageUsers> {
        let url = self.http.endpoint_url(EP_USERS_SEARCH, &[]);

        let mut params = vec![("page", page.to_string()), ("perpage", per_page.to_string())];
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }

        let request = self
            .http
            .request(Method::GET, url)
            .query(&params)
            .build()
            .map_err(Error::BuildRequest)?;

        self.execute_decoded(request, cancel).await
    }

    /// Delete the user with the given ID
    pub async fn delete_user(&self, id: u64, cancel: &CancellationToken) -> Result<StatusMessage> {
        let id = id.to_string();
        let url = self.http.endpoint_url(EP_ADMIN_USER, &[("id", &id)]);
        let request = self
            .http
            .request(Method::DELETE, url)
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

    /// Execute a request, demanding a success response
    ///
    /// Non-2xx codes become a [`Error::Status`] carrying the response
    /// body text.
    async fn execute_decoded<T>(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.http.execute(request, cancel).await?;
        if !response.status.is_success() {
            return Err(Error::Status {
                status: response.status.as_u16(),
                message: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        serde_json::from_slice(&response.body).map_err(Error::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> GrafanaClient {
        let config = Config::new(Url::parse(uri).unwrap()).with_basic_auth("admin", "admin");
        GrafanaClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_create_user_posts_json() {
        let mock_server = MockServer::start().await;

        // base64("admin:admin")
        Mock::given(method("POST"))
            .and(path("/api/admin/users"))
            .and(header("Authorization", "Basic YWRtaW46YWRtaW4="))
            .and(body_json(json!({
                "id": 0,
                "login": "jdoe",
                "name": "Jane Doe",
                "email": "jdoe@example.com",
                "theme": "",
                "orgId": 0,
                "password": "hunter2",
                "isGrafanaAdmin": false
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 5, "message": "User created"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let user = User::new("jdoe")
            .with_name("Jane Doe")
            .with_email("jdoe@example.com")
            .with_password("hunter2");

        let client = client_for(&mock_server.uri());
        let created = client
            .create_user(&user, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(created.id, Some(5));
        assert_eq!(created.message.as_deref(), Some("User created"));
    }

    #[tokio::test]
    async fn test_create_user_error_carries_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/admin/users"))
            .respond_with(
                ResponseTemplate::new(412).set_body_string("user already exists"),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let err = client
            .create_user(&User::new("jdoe"), &CancellationToken::new())
            .await
            .unwrap_err();

        if let Error::Status { status, message } = err {
            assert_eq!(status, 412);
            assert_eq!(message, "user already exists");
        } else {
            panic!("Expected Status error");
        }
    }

    #[tokio::test]
    async fn test_update_user_password_puts_to_user_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/admin/users/42/password"))
            .and(body_json(json!({"password": "s3cret!"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "User password updated"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let reply = client
            .update_user_password(42, "s3cret!", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.message.as_deref(), Some("User password updated"));
    }

    #[tokio::test]
    async fn test_update_user_permissions_puts_flag() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/admin/users/42/permissions"))
            .and(body_json(json!({"isGrafanaAdmin": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "User permissions updated"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let permissions = UserPermissions {
            is_grafana_admin: true,
        };

        let client = client_for(&mock_server.uri());
        let reply = client
            .update_user_permissions(42, &permissions, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.message.as_deref(), Some("User permissions updated"));
    }

    #[tokio::test]
    async fn test_switch_user_context_builds_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/users/7/using/2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Active organization changed"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let reply = client
            .switch_user_context(7, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            reply.message.as_deref(),
            Some("Active organization changed")
        );
    }

    #[tokio::test]
    async fn test_search_users_encodes_paging() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/search"))
            .and(query_param("page", "2"))
            .and(query_param("perpage", "10"))
            .and(query_param("query", "jdoe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalCount": 11,
                "users": [{"id": 7, "login": "jdoe"}],
                "page": 2,
                "perPage": 10
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let page = client
            .search_users(2, 10, Some("jdoe"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(page.total_count, 11);
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.users[0].login, "jdoe");
    }

    #[tokio::test]
    async fn test_search_users_omits_query_when_unset() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalCount": 0,
                "users": [],
                "page": 1,
                "perPage": 10
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        client
            .search_users(1, 10, None, &CancellationToken::new())
            .await
            .unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0]
            .url
            .query()
            .unwrap_or_default()
            .contains("query"));
    }

    #[tokio::test]
    async fn test_delete_user_issues_delete() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/admin/users/42"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "User deleted"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let reply = client
            .delete_user(42, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.message.as_deref(), Some("User deleted"));
    }
}
