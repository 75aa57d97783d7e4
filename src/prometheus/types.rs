use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::errors::{Error, Result};

/// Labels identifying a single time series
pub type Metric = HashMap<String, String>;

/// Sample value as returned by Prometheus
///
/// Prometheus encodes values as JSON strings so that `NaN`, `+Inf` and
/// `-Inf` survive the trip.
#[derive(Clone, Copy, Debug)]
pub struct SampleValue(pub f64);

impl Display for SampleValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AsRef<f64> for SampleValue {
    fn as_ref(&self) -> &f64 {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SampleValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        s.parse::<f64>()
            .map(SampleValue)
            .map_err(serde::de::Error::custom)
    }
}

/// A single sample from an instant query
#[derive(Clone, Debug, Deserialize)]
pub struct Sample {
    /// Labels of the series the sample belongs to
    pub metric: Metric,
    /// Timestamp (seconds since epoch) and value
    pub value: (f64, SampleValue),
}

/// A series of samples from a range query
#[derive(Clone, Debug, Deserialize)]
pub struct SampleStream {
    /// Labels of the series
    pub metric: Metric,
    /// Timestamp/value pairs, ordered by timestamp
    #[serde(default)]
    pub values: Vec<(f64, SampleValue)>,
}

/// Result of an instant or range query
///
/// The payload shape is selected by the `resultType` discriminator;
/// an unrecognized discriminator fails decoding.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "camelCase")]
pub enum QueryResult {
    /// A single value
    Scalar((f64, SampleValue)),
    /// One sample per matching series
    Vector(Vec<Sample>),
    /// One stream of samples per matching series
    Matrix(Vec<SampleStream>),
}

impl QueryResult {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Vector(_) => "vector",
            Self::Matrix(_) => "matrix",
        }
    }

    /// Extract the scalar value, failing on any other result type
    pub fn into_scalar(self) -> Result<(f64, SampleValue)> {
        match self {
            Self::Scalar(value) => Ok(value),
            other => Err(Error::UnexpectedResultType(other.kind().to_string())),
        }
    }

    /// Extract the vector samples, failing on any other result type
    pub fn into_vector(self) -> Result<Vec<Sample>> {
        match self {
            Self::Vector(samples) => Ok(samples),
            other => Err(Error::UnexpectedResultType(other.kind().to_string())),
        }
    }

    /// Extract the matrix series, failing on any other result type
    pub fn into_matrix(self) -> Result<Vec<SampleStream>> {
        match self {
            Self::Matrix(streams) => Ok(streams),
            other => Err(Error::UnexpectedResultType(other.kind().to_string())),
        }
    }
}

/// Sliced time range for a range query
#[derive(Debug, Clone, Copy)]
pub struct Range {
    /// Start of the range
    pub start: DateTime<Utc>,
    /// End of the range
    pub end: DateTime<Utc>,
    /// Maximum time between two slices within the boundaries
    pub step: Duration,
}

impl Range {
    /// Create a range covering `[start, end]`, sliced every `step`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        Self { start, end, step }
    }
}

/// Time window and series matchers narrowing a metadata query
///
/// An empty selection asks the server for everything it knows.
///
/// # Example
///
/// ```rust
/// use monitoring_api::prometheus::Selection;
///
/// let selection = Selection::new()
///     .with_match(r#"up{job="api"}"#)
///     .with_match("node_load1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Only consider series with samples after this instant
    pub start: Option<DateTime<Utc>>,
    /// Only consider series with samples before this instant
    pub end: Option<DateTime<Utc>>,
    /// Series selectors; repeated selectors are ORed by the server
    pub matches: Vec<String>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the selection to series with samples after `start`
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Restrict the selection to series with samples before `end`
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Add a series selector, e.g. `up{job="api"}`
    pub fn with_match(mut self, selector: &str) -> Self {
        self.matches.push(selector.to_string());
        self
    }
}
