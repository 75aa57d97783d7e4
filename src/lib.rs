//! # Monitoring API
//!
//! Typed Rust client bindings for the HTTP APIs of three monitoring
//! services: [Prometheus](https://prometheus.io/docs/prometheus/latest/querying/api/),
//! [Alertmanager](https://prometheus.io/docs/alerting/latest/management_api/)
//! and [Grafana](https://grafana.com/docs/grafana/latest/developers/http_api/).
//!
//! ## Features
//!
//! - One strongly-typed async method per documented endpoint
//! - Shared [`Config`] with basic auth or bearer token authentication
//! - Cooperative cancellation of in-flight calls via `CancellationToken`
//! - Service error envelopes unwrapped into a typed [`Error`]
//! - Raw `proxy` escape hatch for endpoints without a dedicated method
//!
//! ## Example
//!
//! ```rust,no_run
//! use monitoring_api::{Config, PrometheusClient};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new(Url::parse("http://localhost:9090")?)
//!         .with_bearer_token("secret-token");
//!     let client = PrometheusClient::new(config)?;
//!
//!     let result = client
//!         .query(r#"up{job="api"}"#, None, &CancellationToken::new())
//!         .await?;
//!     for sample in result.into_vector()? {
//!         println!("{:?} = {}", sample.metric, sample.value.1);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod errors;

pub mod alertmanager;
pub mod grafana;
pub mod prometheus;

pub use alertmanager::AlertmanagerClient;
pub use client::{Config, HttpClient, HttpResponse};
pub use errors::{ApiErrorKind, Error, Result};
pub use grafana::GrafanaClient;
pub use prometheus::PrometheusClient;
