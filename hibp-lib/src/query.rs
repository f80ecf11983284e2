//! Query construction.
//!
//! Every factory validates its input, resolves the endpoint URL once, and
//! returns a fresh request with no outcome. No I/O happens here.
//!
//! Parameters are percent-encoded as a single path segment, so `?`, `#` and
//! `/` inside an account or breach name never change which endpoint is hit.

use crate::classify::UNKNOWN_BREACH_NAME;
use crate::error::HibpError;
use crate::types::{Outcome, QueryKind, QueryRequest, DEFAULT_BASE_URL};
use crate::utils::{validate_account, validate_domain};
use reqwest::Url;

lazy_static::lazy_static! {
    static ref DEFAULT_BUILDER: QueryBuilder = QueryBuilder::new(DEFAULT_BASE_URL).unwrap();
}

/// Builds [`QueryRequest`]s against a given service root.
///
/// # Example
///
/// ```rust
/// use hibp_lib::{QueryBuilder, QueryKind};
///
/// let builder = QueryBuilder::new("http://127.0.0.1:8080/api/v2").unwrap();
/// let req = builder.for_domain("adobe.com").unwrap();
///
/// assert_eq!(req.kind(), QueryKind::DomainBreach);
/// assert_eq!(req.url(), "http://127.0.0.1:8080/api/v2/breaches?domain=adobe.com");
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: Url,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        DEFAULT_BUILDER.clone()
    }
}

impl QueryBuilder {
    /// Create a builder for the given base URL. A trailing `/` is added if missing.
    ///
    /// # Errors
    ///
    /// `InvalidInput` unless the value is an absolute `http` or `https` URL.
    pub fn new<S: AsRef<str>>(base_url: S) -> Result<Self, HibpError> {
        let raw = base_url.as_ref();
        let invalid = |reason: &str| HibpError::invalid_input("base URL", raw, reason);

        let mut url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("Scheme must be http or https"));
        }
        if !url.path().ends_with('/') {
            url.path_segments_mut()
                .map_err(|_| invalid("URL cannot be a base"))?
                .push("");
        }

        Ok(Self { base_url: url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Breaches an account (email address or username) appears in.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the account is empty or obviously malformed.
    pub fn for_account(&self, account: &str) -> Result<QueryRequest, HibpError> {
        let account = validate_account(account)?;
        Ok(QueryRequest::new(
            QueryKind::AccountBreach,
            Some(account.to_string()),
            self.endpoint(&["breachedaccount", account]).to_string(),
        ))
    }

    /// Breaches recorded against a domain.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the domain does not look like a hostname.
    pub fn for_domain(&self, domain: &str) -> Result<QueryRequest, HibpError> {
        let domain = validate_domain(domain)?;
        let mut url = self.endpoint(&["breaches"]);
        url.query_pairs_mut().append_pair("domain", domain);

        Ok(QueryRequest::new(
            QueryKind::DomainBreach,
            Some(domain.to_string()),
            url.to_string(),
        ))
    }

    /// A single breach by name. Names are opaque, so nothing is validated.
    ///
    /// `.` and `..` cannot be carried in a URL path segment; such a request
    /// comes back already completed as `InvalidParameter` and is never sent.
    pub fn for_breach_name(&self, name: &str) -> QueryRequest {
        let mut request = QueryRequest::new(
            QueryKind::BreachByName,
            Some(name.to_string()),
            self.endpoint(&["breach", name]).to_string(),
        );
        if is_dot_segment(name) {
            request.complete(Outcome::InvalidParameter(UNKNOWN_BREACH_NAME.to_string()));
        }
        request
    }

    /// Every breach in the system.
    pub fn for_all_breaches(&self) -> QueryRequest {
        QueryRequest::new(
            QueryKind::AllBreaches,
            None,
            self.endpoint(&["breaches"]).to_string(),
        )
    }

    /// Every data class the service knows about.
    pub fn for_data_classes(&self) -> QueryRequest {
        QueryRequest::new(
            QueryKind::DataClasses,
            None,
            self.endpoint(&["dataclasses"]).to_string(),
        )
    }

    /// Build a request of any kind from a loose parameter.
    ///
    /// Parameterless kinds ignore `parameter`; the others require it.
    pub fn build(&self, kind: QueryKind, parameter: Option<&str>) -> Result<QueryRequest, HibpError> {
        let required = || {
            parameter.ok_or_else(|| {
                HibpError::invalid_input(kind.as_str(), "", "A parameter is required")
            })
        };

        match kind {
            QueryKind::AccountBreach => self.for_account(required()?),
            QueryKind::DomainBreach => self.for_domain(required()?),
            QueryKind::BreachByName => Ok(self.for_breach_name(required()?)),
            QueryKind::AllBreaches => Ok(self.for_all_breaches()),
            QueryKind::DataClasses => Ok(self.for_data_classes()),
        }
    }

    /// Join `segments` onto the base path, each encoded as one segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` only accepts http(s) URLs, which always have a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn is_dot_segment(value: &str) -> bool {
    matches!(value, "." | "..")
}

impl QueryRequest {
    /// [`QueryBuilder::for_account`] against the public service.
    pub fn for_account(account: &str) -> Result<Self, HibpError> {
        DEFAULT_BUILDER.for_account(account)
    }

    /// [`QueryBuilder::for_domain`] against the public service.
    pub fn for_domain(domain: &str) -> Result<Self, HibpError> {
        DEFAULT_BUILDER.for_domain(domain)
    }

    /// [`QueryBuilder::for_breach_name`] against the public service.
    pub fn for_breach_name(name: &str) -> Self {
        DEFAULT_BUILDER.for_breach_name(name)
    }

    /// [`QueryBuilder::for_all_breaches`] against the public service.
    pub fn for_all_breaches() -> Self {
        DEFAULT_BUILDER.for_all_breaches()
    }

    /// [`QueryBuilder::for_data_classes`] against the public service.
    pub fn for_data_classes() -> Self {
        DEFAULT_BUILDER.for_data_classes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_url() {
        let req = QueryRequest::for_account("test@example.com").unwrap();
        assert_eq!(req.kind(), QueryKind::AccountBreach);
        assert_eq!(req.parameter(), Some("test@example.com"));
        assert_eq!(
            req.url(),
            "https://haveibeenpwned.com/api/v2/breachedaccount/test@example.com"
        );
        assert!(req.outcome().is_none());
    }

    #[test]
    fn test_empty_account_is_rejected() {
        let err = QueryRequest::for_account("").unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_domain_url_ends_with_query() {
        for domain in ["adobe.com", "mail.example.org", "a-b.c-d.io"] {
            let req = QueryRequest::for_domain(domain).unwrap();
            assert!(req.url().ends_with(&format!("?domain={}", domain)));
            assert_eq!(req.parameter(), Some(domain));
        }
    }

    #[test]
    fn test_invalid_domains_are_rejected() {
        for domain in ["", "nodots", "bad_char.com", "trailing.", "a..b"] {
            let err = QueryRequest::for_domain(domain).unwrap_err();
            assert!(err.is_invalid_input(), "{} should be rejected", domain);
        }
    }

    #[test]
    fn test_parameterless_queries() {
        let all = QueryRequest::for_all_breaches();
        assert_eq!(all.kind(), QueryKind::AllBreaches);
        assert_eq!(all.parameter(), None);
        assert!(all.url().ends_with("/api/v2/breaches"));

        let classes = QueryRequest::for_data_classes();
        assert_eq!(classes.kind(), QueryKind::DataClasses);
        assert!(classes.url().ends_with("/api/v2/dataclasses"));
    }

    #[test]
    fn test_factories_are_deterministic() {
        let a = QueryRequest::for_breach_name("adobe");
        let b = QueryRequest::for_breach_name("adobe");
        assert_eq!(a.url(), b.url());
        assert_eq!(a.kind(), b.kind());
        assert_eq!(a.parameter(), b.parameter());
    }

    #[test]
    fn test_builder_normalizes_base_url() {
        let builder = QueryBuilder::new("http://localhost:1234/api/v2").unwrap();
        assert_eq!(builder.base_url(), "http://localhost:1234/api/v2/");
        assert_eq!(
            builder.for_breach_name("adobe").url(),
            "http://localhost:1234/api/v2/breach/adobe"
        );
    }

    #[test]
    fn test_build_dispatches_by_kind() {
        let builder = QueryBuilder::default();

        let req = builder.build(QueryKind::BreachByName, Some("adobe")).unwrap();
        assert_eq!(req.kind(), QueryKind::BreachByName);

        let req = builder.build(QueryKind::DataClasses, Some("ignored")).unwrap();
        assert_eq!(req.parameter(), None);

        assert!(builder.build(QueryKind::AccountBreach, None).is_err());
        assert!(builder.build(QueryKind::DomainBreach, Some("nope")).is_err());
    }

    #[test]
    fn test_builder_rejects_unusable_base_url() {
        for base in ["not a url", "ftp://mirror.test/api/", "mailto:someone@example.com"] {
            let err = QueryBuilder::new(base).unwrap_err();
            assert!(err.is_invalid_input(), "{} should be rejected", base);
        }
    }

    #[test]
    fn test_parameters_stay_inside_their_path_segment() {
        let builder = QueryBuilder::new("http://hibp.test/api/v2/").unwrap();

        let req = builder.for_breach_name("../breaches");
        let url = Url::parse(req.url()).unwrap();
        assert_eq!(url.path(), "/api/v2/breach/..%2Fbreaches");
        assert!(!req.is_complete());

        let req = builder.for_breach_name("a?domain=x");
        let url = Url::parse(req.url()).unwrap();
        assert_eq!(url.path(), "/api/v2/breach/a%3Fdomain=x");
        assert_eq!(url.query(), None);

        let req = builder.for_account("bob?x=1").unwrap();
        let url = Url::parse(req.url()).unwrap();
        assert_eq!(url.path(), "/api/v2/breachedaccount/bob%3Fx=1");
        assert_eq!(url.query(), None);

        let req = builder.for_account("a#b@example.com").unwrap();
        let url = Url::parse(req.url()).unwrap();
        assert_eq!(url.path(), "/api/v2/breachedaccount/a%23b@example.com");
        assert_eq!(url.fragment(), None);
        assert_eq!(req.parameter(), Some("a#b@example.com"));
    }

    #[test]
    fn test_dot_breach_names_are_never_sent() {
        let builder = QueryBuilder::new("http://hibp.test/api/v2/").unwrap();

        for name in [".", ".."] {
            let req = builder.for_breach_name(name);
            match req.outcome() {
                Some(Outcome::InvalidParameter(reason)) => {
                    assert_eq!(reason, UNKNOWN_BREACH_NAME)
                }
                other => panic!("expected InvalidParameter for {:?}, got {:?}", name, other),
            }
        }

        // Dots inside a longer name are ordinary characters
        let req = builder.for_breach_name("...");
        assert!(!req.is_complete());
        assert!(req.url().ends_with("/breach/..."));
    }
}
