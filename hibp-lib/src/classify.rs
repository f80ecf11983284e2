//! Response classification.
//!
//! Turns the raw result of one GET into an [`Outcome`]. The same status means
//! different things per query kind: a 404 is a clean "not pwned" for an
//! account, but a bad input for a named-breach lookup.

use crate::error::HibpError;
use crate::transport::RawResponse;
use crate::types::{Outcome, QueryKind};

/// Reason recorded when a breach-by-name lookup hits a 404.
pub const UNKNOWN_BREACH_NAME: &str = "unknown breach name";

const NOT_FOUND: u16 = 404;

/// Classify the result of executing a query of `kind` against `url`.
///
/// Rules, first match wins:
/// 1. transport failure → `TransportError`
/// 2. 404 on an account query → `NotFound`
/// 3. empty JSON list on a domain query → `NotFound`
/// 4. 404 on a breach-by-name query → `InvalidParameter`
/// 5. any other non-2xx status → `TransportError(HttpStatus)`
/// 6. body parses as JSON → `Found`, otherwise `TransportError(ParseError)`
pub fn classify(kind: QueryKind, url: &str, result: Result<RawResponse, HibpError>) -> Outcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => return Outcome::TransportError(e),
    };

    if response.status == NOT_FOUND && kind == QueryKind::AccountBreach {
        return Outcome::NotFound;
    }

    if kind == QueryKind::DomainBreach && is_empty_list(&response.body) {
        return Outcome::NotFound;
    }

    if response.status == NOT_FOUND && kind == QueryKind::BreachByName {
        return Outcome::InvalidParameter(UNKNOWN_BREACH_NAME.to_string());
    }

    if !response.is_success() {
        return Outcome::TransportError(HibpError::http_status(response.status, url));
    }

    match serde_json::from_str::<serde_json::Value>(&response.body) {
        Ok(payload) => Outcome::Found(payload),
        Err(e) => Outcome::TransportError(e.into()),
    }
}

/// Whether a body is a JSON array with no elements.
fn is_empty_list(body: &str) -> bool {
    let body = body.trim();
    if body == "[]" {
        return true;
    }
    matches!(
        serde_json::from_str::<serde_json::Value>(body),
        Ok(serde_json::Value::Array(items)) if items.is_empty()
    )
}
