//! Core data types for breach queries.
//!
//! This module defines the query request and its terminal outcome, the
//! dispatcher configuration, and the result containers handed back to callers.

use crate::error::HibpError;
use crate::models::Breach;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://haveibeenpwned.com/api/v2/";

/// Identifying header value sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("hibp-rs/", env!("CARGO_PKG_VERSION"));

/// Upper bound on simultaneous in-flight calls, whatever the caller asks for.
pub const MAX_CONCURRENCY: usize = 100;

/// Which endpoint family a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// All breaches an account appears in
    AccountBreach,
    /// All breaches recorded against a domain
    DomainBreach,
    /// A single breach looked up by its name
    BreachByName,
    /// Every breach in the system
    AllBreaches,
    /// The list of data classes the service knows about
    DataClasses,
}

impl QueryKind {
    /// Stable short name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::AccountBreach => "account_breach",
            QueryKind::DomainBreach => "domain_breach",
            QueryKind::BreachByName => "breach_by_name",
            QueryKind::AllBreaches => "all_breaches",
            QueryKind::DataClasses => "data_classes",
        }
    }

    /// Whether queries of this kind carry a parameter.
    pub fn takes_parameter(&self) -> bool {
        matches!(
            self,
            QueryKind::AccountBreach | QueryKind::DomainBreach | QueryKind::BreachByName
        )
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::AccountBreach => write!(f, "Account"),
            QueryKind::DomainBreach => write!(f, "Domain"),
            QueryKind::BreachByName => write!(f, "Breach"),
            QueryKind::AllBreaches => write!(f, "All breaches"),
            QueryKind::DataClasses => write!(f, "Data classes"),
        }
    }
}

/// Terminal classification of one executed query.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The service returned a record; the parsed body
    Found(serde_json::Value),

    /// Valid negative result: the account or domain has not been pwned
    NotFound,

    /// The service rejected the supplied value (e.g. unknown breach name)
    InvalidParameter(String),

    /// Network, status, parse or deadline failure
    TransportError(HibpError),
}

impl Outcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }

    /// Whether the query was cut off by the batch deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::TransportError(e) if e.is_timeout())
    }

    /// The parsed body, if the query found something.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Outcome::Found(payload) => Some(payload),
            _ => None,
        }
    }

    /// Decode a list-of-breaches payload (account, domain, all-breaches queries).
    ///
    /// `NotFound` decodes as an empty list.
    pub fn breaches(&self) -> Result<Vec<Breach>, HibpError> {
        match self {
            Outcome::Found(payload) => Ok(serde_json::from_value(payload.clone())?),
            Outcome::NotFound => Ok(Vec::new()),
            other => Err(other.to_error()),
        }
    }

    /// Decode a single-breach payload (breach-by-name queries).
    pub fn breach(&self) -> Result<Breach, HibpError> {
        match self {
            Outcome::Found(payload) => Ok(serde_json::from_value(payload.clone())?),
            other => Err(other.to_error()),
        }
    }

    /// Decode a data-classes payload.
    pub fn data_classes(&self) -> Result<Vec<String>, HibpError> {
        match self {
            Outcome::Found(payload) => Ok(serde_json::from_value(payload.clone())?),
            other => Err(other.to_error()),
        }
    }

    /// Short status label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Found(_) => "found",
            Outcome::NotFound => "not_found",
            Outcome::InvalidParameter(_) => "invalid_parameter",
            Outcome::TransportError(_) => "error",
        }
    }

    fn to_error(&self) -> HibpError {
        match self {
            Outcome::TransportError(e) => e.clone(),
            Outcome::InvalidParameter(reason) => HibpError::internal(format!(
                "query was rejected by the service: {}",
                reason
            )),
            Outcome::NotFound => HibpError::internal("query returned no record"),
            Outcome::Found(_) => HibpError::internal("query returned a record"),
        }
    }
}

/// One API call: what to ask, where to ask it, and (after execution) the answer.
///
/// Built by the factories in [`crate::QueryBuilder`]. Kind, parameter and URL
/// are fixed at construction; the outcome is written once by the dispatcher.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    kind: QueryKind,
    parameter: Option<String>,
    url: String,
    outcome: Option<Outcome>,
}

impl QueryRequest {
    pub(crate) fn new(kind: QueryKind, parameter: Option<String>, url: String) -> Self {
        Self {
            kind,
            parameter,
            url,
            outcome: None,
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// The account, domain or breach name this query targets.
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Fully resolved request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `None` until the request has been executed.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Take the outcome out of a finished request.
    pub fn into_outcome(self) -> Option<Outcome> {
        self.outcome
    }

    /// Record the terminal outcome. A request that already has one keeps it.
    pub(crate) fn complete(&mut self, outcome: Outcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }
}

/// Configuration for a [`crate::Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum number of simultaneous in-flight calls.
    /// `None` means one slot per request in the batch; always clamped to 1-100.
    pub concurrency: Option<usize>,

    /// Deadline for a whole `run_all` batch
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Timeout for each individual HTTP call
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// Value of the `User-Agent` header
    pub user_agent: String,

    /// Service root that endpoint paths are joined onto
    pub base_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Set the concurrency cap. Values are clamped to 1-100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency.clamp(1, MAX_CONCURRENCY));
        self
    }

    /// Set the batch deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-call HTTP timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Number of workers to run for a batch of `batch_len` requests.
    pub fn effective_concurrency(&self, batch_len: usize) -> usize {
        self.concurrency
            .unwrap_or(batch_len)
            .clamp(1, MAX_CONCURRENCY)
    }
}

/// Result of an eager batch run.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Every submitted request, in submission order, each with an outcome
    pub requests: Vec<QueryRequest>,

    /// True when every request finished before the batch deadline
    pub all_ok: bool,

    /// Wall-clock time the batch took
    pub elapsed: Duration,
}

impl BatchResult {
    /// Number of requests cut off by the deadline.
    pub fn timed_out(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| r.outcome().is_some_and(Outcome::is_timeout))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryRequest> {
        self.requests.iter()
    }
}

impl IntoIterator for BatchResult {
    type Item = QueryRequest;
    type IntoIter = std::vec::IntoIter<QueryRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.into_iter()
    }
}

/// Serializable summary of a request, for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub kind: QueryKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,

    pub url: String,

    /// One of `found`, `not_found`, `invalid_parameter`, `error`, `pending`
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&QueryRequest> for QueryReport {
    fn from(request: &QueryRequest) -> Self {
        let (status, payload, error) = match request.outcome() {
            None => ("pending", None, None),
            Some(Outcome::Found(payload)) => ("found", Some(payload.clone()), None),
            Some(Outcome::NotFound) => ("not_found", None, None),
            Some(Outcome::InvalidParameter(reason)) => {
                ("invalid_parameter", None, Some(reason.clone()))
            }
            Some(Outcome::TransportError(e)) => ("error", None, Some(e.to_string())),
        };

        Self {
            kind: request.kind(),
            parameter: request.parameter().map(String::from),
            url: request.url().to_string(),
            status,
            payload,
            error,
        }
    }
}
