//! Terminal output for the hibp CLI.
//!
//! Result lines, JSON rendering and the end-of-run summary. Colors come from
//! the `console` crate and switch off automatically when stdout is not a TTY.

use console::{pad_str, style, Alignment};
use hibp_lib::{Outcome, QueryKind, QueryReport, QueryRequest};
use std::time::Duration;

/// How many names to list inline before collapsing to "and N more".
const MAX_NAMES_SHOWN: usize = 5;

// ── Summary ──────────────────────────────────────────────────────────────────

/// Outcome counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub found: usize,
    pub clean: usize,
    pub invalid: usize,
    pub errors: usize,
    pub timeouts: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: Option<&Outcome>) {
        match outcome {
            Some(Outcome::Found(_)) => self.found += 1,
            Some(Outcome::NotFound) => self.clean += 1,
            Some(Outcome::InvalidParameter(_)) => self.invalid += 1,
            Some(outcome @ Outcome::TransportError(_)) => {
                self.errors += 1;
                if outcome.is_timeout() {
                    self.timeouts += 1;
                }
            }
            None => self.errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.found + self.clean + self.invalid + self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn format(&self, elapsed: Duration) -> String {
        let mut line = format!(
            "Summary: {} found, {} clean, {} invalid, {} errors ({} queries in {:.1}s)",
            self.found,
            self.clean,
            self.invalid,
            self.errors,
            self.total(),
            elapsed.as_secs_f64()
        );
        if self.timeouts > 0 {
            line.push_str(&format!(", {} timed out", self.timeouts));
        }
        line
    }
}

pub fn print_summary(summary: &Summary, elapsed: Duration) {
    println!();
    println!("{}", style(summary.format(elapsed)).bold());
}

// ── Result lines ─────────────────────────────────────────────────────────────

/// Print one finished request.
///
/// `counter` adds a `[3/8]` progress prefix in streaming mode.
pub fn print_result(request: &QueryRequest, counter: Option<(usize, usize)>) {
    let prefix = match counter {
        Some((current, total)) => format!("{} ", style(format!("[{}/{}]", current, total)).dim()),
        None => String::new(),
    };
    let subject_text = subject_of(request);
    let subject = pad_str(&subject_text, 32, Alignment::Left, Some(".."));

    let status = match request.outcome() {
        Some(Outcome::Found(_)) if is_lookup(request.kind()) => style("PWNED").red().bold(),
        Some(Outcome::Found(_)) => style("OK").green().bold(),
        Some(Outcome::NotFound) => style("CLEAN").green().bold(),
        Some(Outcome::InvalidParameter(_)) => style("INVALID").yellow().bold(),
        Some(Outcome::TransportError(_)) | None => style("ERROR").yellow(),
    };

    println!(
        "  {}{}  {}  {}",
        prefix,
        subject,
        status,
        style(describe(request)).dim()
    );
}

/// Render a batch as a pretty-printed JSON array.
pub fn render_json<'a, I>(requests: I) -> serde_json::Result<String>
where
    I: IntoIterator<Item = &'a QueryRequest>,
{
    let reports: Vec<QueryReport> = requests.into_iter().map(QueryReport::from).collect();
    serde_json::to_string_pretty(&reports)
}

/// Render one request as a single JSON line.
pub fn render_json_line(request: &QueryRequest) -> serde_json::Result<String> {
    serde_json::to_string(&QueryReport::from(request))
}

/// What a result line is about: the parameter, or the endpoint for
/// parameterless queries.
fn subject_of(request: &QueryRequest) -> String {
    match request.parameter() {
        Some(parameter) => parameter.to_string(),
        None => request.kind().to_string(),
    }
}

fn is_lookup(kind: QueryKind) -> bool {
    matches!(kind, QueryKind::AccountBreach | QueryKind::DomainBreach)
}

/// One-line detail for a finished request.
pub fn describe(request: &QueryRequest) -> String {
    let outcome = match request.outcome() {
        Some(outcome) => outcome,
        None => return "not executed".to_string(),
    };

    match outcome {
        Outcome::Found(payload) => describe_found(request.kind(), outcome, payload),
        Outcome::NotFound => "no breaches".to_string(),
        Outcome::InvalidParameter(reason) => reason.clone(),
        Outcome::TransportError(e) => e.to_string(),
    }
}

fn describe_found(kind: QueryKind, outcome: &Outcome, payload: &serde_json::Value) -> String {
    match kind {
        QueryKind::BreachByName => match outcome.breach() {
            Ok(breach) => format!(
                "{} ({}), {} accounts",
                breach.title,
                breach.breach_date,
                breach.pwn_count
            ),
            Err(_) => "breach record".to_string(),
        },
        QueryKind::DataClasses => {
            let classes = outcome.data_classes().unwrap_or_default();
            format!("{} data classes", classes.len())
        }
        QueryKind::AllBreaches => format!("{} breaches", payload_names(payload).len()),
        QueryKind::AccountBreach | QueryKind::DomainBreach => {
            let names = payload_names(payload);
            let noun = if names.len() == 1 { "breach" } else { "breaches" };
            format!("{} {}: {}", names.len(), noun, format_name_list(&names))
        }
    }
}

/// Breach names from a list payload. Works on truncated responses that only
/// carry `Name`.
fn payload_names(payload: &serde_json::Value) -> Vec<String> {
    payload
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("Name").and_then(|n| n.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn format_name_list(names: &[String]) -> String {
    if names.len() <= MAX_NAMES_SHOWN {
        names.join(", ")
    } else {
        format!(
            "{}, ... and {} more",
            names[..MAX_NAMES_SHOWN].join(", "),
            names.len() - MAX_NAMES_SHOWN
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hibp_lib::HibpError;
    use serde_json::json;

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.record(Some(&Outcome::Found(json!([]))));
        summary.record(Some(&Outcome::NotFound));
        summary.record(Some(&Outcome::NotFound));
        summary.record(Some(&Outcome::InvalidParameter("nope".to_string())));
        summary.record(Some(&Outcome::TransportError(HibpError::timeout(
            "query batch",
            Duration::from_secs(10),
        ))));

        assert_eq!(
            summary,
            Summary {
                found: 1,
                clean: 2,
                invalid: 1,
                errors: 1,
                timeouts: 1,
            }
        );
        assert_eq!(summary.total(), 5);
        assert!(summary.has_errors());

        let line = summary.format(Duration::from_millis(1500));
        assert!(line.contains("1 found, 2 clean, 1 invalid, 1 errors"));
        assert!(line.contains("5 queries in 1.5s"));
        assert!(line.contains("1 timed out"));
    }

    #[test]
    fn test_payload_names() {
        let payload = json!([{"Name": "Adobe"}, {"Name": "LinkedIn"}, {"Title": "no name"}]);
        assert_eq!(payload_names(&payload), vec!["Adobe", "LinkedIn"]);
        assert!(payload_names(&json!({"Name": "Adobe"})).is_empty());
    }

    #[test]
    fn test_format_name_list_truncates() {
        let names: Vec<String> = (0..8).map(|i| format!("b{}", i)).collect();
        assert_eq!(format_name_list(&names[..2]), "b0, b1");
        assert_eq!(
            format_name_list(&names),
            "b0, b1, b2, b3, b4, ... and 3 more"
        );
    }

    #[test]
    fn test_describe_found_breach_lookup() {
        let outcome = Outcome::Found(json!([{"Name": "Adobe"}]));
        let payload = outcome.payload().unwrap();
        assert_eq!(
            describe_found(QueryKind::AccountBreach, &outcome, payload),
            "1 breach: Adobe"
        );
    }
}
