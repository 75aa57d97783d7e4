use serde::{Deserialize, Serialize};

/// A Grafana user account
///
/// Doubles as the creation payload for the admin API and as a row in
/// search results; fields the server fills in (`id`, `org_id`) are left
/// at their defaults when building a new account.
///
/// # Example
///
/// ```rust
/// use monitoring_api::grafana::User;
///
/// let user = User::new("jdoe")
///     .with_name("Jane Doe")
///     .with_email("jdoe@example.com")
///     .with_password("hunter2");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID assigned by the server
    #[serde(default)]
    pub id: u64,
    /// Login name
    #[serde(default)]
    pub login: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// UI theme preference
    #[serde(default)]
    pub theme: String,
    /// Organization the user belongs to
    #[serde(default)]
    pub org_id: u64,
    /// Password; only meaningful when creating the user
    #[serde(default)]
    pub password: String,
    /// Whether the user is a Grafana server admin
    #[serde(default)]
    pub is_grafana_admin: bool,
}

impl User {
    /// Create a user payload with the given login name
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            ..Self::default()
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the email address
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Set the initial password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    /// Set the UI theme (`light` or `dark`)
    pub fn with_theme(mut self, theme: &str) -> Self {
        self.theme = theme.to_string();
        self
    }

    /// Place the user in the given organization
    pub fn with_org_id(mut self, org_id: u64) -> Self {
        self.org_id = org_id;
        self
    }

    /// Grant or revoke server admin rights
    pub fn with_grafana_admin(mut self, is_admin: bool) -> Self {
        self.is_grafana_admin = is_admin;
        self
    }
}

/// Password change payload for the admin API
#[derive(Debug, Clone, Serialize)]
pub struct UserPassword {
    /// The new password
    pub password: String,
}

/// Permission change payload for the admin API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissions {
    /// Whether the user is a Grafana server admin
    pub is_grafana_admin: bool,
}

/// One page of a user search
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUsers {
    /// Total number of users matching the search
    pub total_count: u64,
    /// The users on this page
    #[serde(default)]
    pub users: Vec<User>,
    /// Page number, starting at 1
    pub page: u64,
    /// Page size the search was performed with
    pub per_page: u64,
}

/// Acknowledgement returned by mutating endpoints
///
/// Which fields are present depends on the endpoint: creation returns
/// the new ID, most others only a message.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusMessage {
    /// ID of the affected object, when the endpoint reports one
    #[serde(default)]
    pub id: Option<u64>,
    /// Human-readable outcome
    #[serde(default)]
    pub message: Option<String>,
}
